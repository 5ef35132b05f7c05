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

pub type ClassIdInner = u32;

/// Identifies a class of service (COS), a hardware slot holding a cache mask
/// and a bandwidth limit per socket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct ClassId(ClassIdInner);

newtype_derive::NewtypeFrom! { () pub struct ClassId(ClassIdInner); }
newtype_derive::NewtypeDisplay! { () pub struct ClassId(ClassIdInner); }

impl ClassId {
    /// Every core and task belongs to this class unless bound elsewhere.
    pub const DEFAULT: ClassId = ClassId(0);

    pub const fn new(class_id: ClassIdInner) -> Self {
        Self(class_id)
    }

    pub const fn get(&self) -> ClassIdInner {
        self.0
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

impl Default for ClassId {
    fn default() -> Self {
        Self::DEFAULT
    }
}
