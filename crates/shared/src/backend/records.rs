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

use bitflags::bitflags;
use serde::Deserialize;
use serde::Serialize;

use crate::types::ClassId;

/// Cache allocation of one class on one socket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct L3caRecord {
    pub class_id: ClassId,
    pub ways_mask: u64,
}

/// Bandwidth limit of one class on one socket.
///
/// `ctrl` tells whether `mb_max` is an absolute rate in MBps (true)
/// or a percentage (false).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MbaRecord {
    pub class_id: ClassId,
    pub mb_max: u32,
    pub ctrl: bool,
}

bitflags! {
    /// Resource technologies a class of service has to support.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Technologies: u8 {
        const L3CA = 1 << 0;
        const MBA = 1 << 1;
    }
}

/// Code and data prioritization requirement on reset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CdpConfig {
    #[default]
    Any,
    Off,
    On,
}

/// Bandwidth controller requirement on reset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MbaConfig {
    #[default]
    Any,
    Default,
    Ctrl,
}
