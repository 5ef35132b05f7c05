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

use serde::Deserialize;
use serde::Serialize;

/// A single entry of the platform capability list.
///
/// Details are optional the same way they are in the underlying platform
/// reports: a technology could be announced with nothing attached to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    L3ca(Option<L3caInfo>),
    Mba(Option<MbaInfo>),
    Monitoring,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct L3caInfo {
    pub num_classes: u32,
    pub num_ways: u32,
    pub cdp_enabled: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MbaInfo {
    pub num_classes: u32,
    pub ctrl: MbaCtrlFlag,
}

/// State of the MBA controller flag as reported by the platform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MbaCtrlFlag {
    /// Controller disabled, limits are percentages.
    Off,
    /// Controller enabled, limits are MBps.
    On,
    /// Anything else the platform reported.
    Unknown(i32),
}

impl Capability {
    pub fn is_l3ca(&self) -> bool {
        matches!(self, Capability::L3ca(_))
    }

    pub fn is_mba(&self) -> bool {
        matches!(self, Capability::Mba(_))
    }
}
