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

use newtype_derive::newtype_fmt;
use serde::Deserialize;
use serde::Serialize;

/// Logical position of a socket in the platform's cache or bandwidth id table.
///
/// It's not the id a backend uses to address the socket, the capability snapshot
/// translates an index into that id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct SocketIndex(u32);

newtype_derive::NewtypeFrom! { () pub struct SocketIndex(u32); }
newtype_derive::NewtypeDisplay! { () pub struct SocketIndex(u32); }

impl SocketIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }
}

impl From<SocketIndex> for usize {
    fn from(value: SocketIndex) -> usize {
        value.0 as usize
    }
}
