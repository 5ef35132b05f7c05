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

use thiserror::Error as ThisError;

/// Failure status a conversation callback reports instead of a response.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationStatus(pub i32);

impl ConversationStatus {
    pub const BUFFER_ERROR: ConversationStatus = ConversationStatus(5);
    pub const CONVERSATION_ERROR: ConversationStatus = ConversationStatus(19);
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("conversation got {count} message(s), expected 1..={max}")]
    BadMessageCount { count: usize, max: usize },

    #[error("conversation failed on message {index} with status {}", status.0)]
    Failed {
        index: usize,
        status: ConversationStatus,
    },
}

#[derive(ThisError, Debug, Copy, Clone, PartialEq, Eq)]
#[error("unknown message style {0}")]
pub struct UnknownMessageStyle(pub i32);

impl ConversationError {
    pub(crate) fn failed(index: usize, status: ConversationStatus) -> Self {
        Self::Failed { index, status }
    }
}
