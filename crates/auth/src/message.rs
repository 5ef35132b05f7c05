/*
 * Copyright 2024 Fluence Labs Limited
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::errors::UnknownMessageStyle;

/// How a prompt should be presented and whether a response is expected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageStyle {
    /// Ask for a secret without echoing it.
    PromptEchoOff,
    PromptEchoOn,
    ErrorMsg,
    TextInfo,
}

impl TryFrom<i32> for MessageStyle {
    type Error = UnknownMessageStyle;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageStyle::PromptEchoOff),
            2 => Ok(MessageStyle::PromptEchoOn),
            3 => Ok(MessageStyle::ErrorMsg),
            4 => Ok(MessageStyle::TextInfo),
            other => Err(UnknownMessageStyle(other)),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Message<'text> {
    pub style: MessageStyle,
    pub text: &'text str,
}

impl<'text> Message<'text> {
    pub fn new(style: MessageStyle, text: &'text str) -> Self {
        Self { style, text }
    }
}

/// Opaque handle passed back to the conversation untouched.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    pub fn new(token: u64) -> Self {
        Self(token)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}
