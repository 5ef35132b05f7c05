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
use thiserror::Error as ThisError;

/// How a platform expresses memory bandwidth limits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BandwidthMode {
    /// The platform has no memory bandwidth allocation.
    Unsupported,
    /// Limits are a percentage of the maximum bandwidth.
    Percentage,
    /// Limits are an absolute rate in MBps.
    AbsoluteRate,
}

impl BandwidthMode {
    pub fn is_supported(&self) -> bool {
        !matches!(self, BandwidthMode::Unsupported)
    }
}

/// Bandwidth control configuration requested on a global reset.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BandwidthResetMode {
    /// Keep whatever mode the platform is in.
    Any,
    /// Return to the hardware default, percentage based, control.
    Default,
    /// Force absolute rate (MBps) control.
    AbsoluteRate,
}

#[derive(ThisError, Debug, Copy, Clone, PartialEq, Eq)]
#[error("unknown bandwidth reset mode {0}, expected 0 (any), 1 (default) or 2 (absolute rate)")]
pub struct UnknownBandwidthResetMode(pub i32);

impl TryFrom<i32> for BandwidthResetMode {
    type Error = UnknownBandwidthResetMode;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BandwidthResetMode::Any),
            1 => Ok(BandwidthResetMode::Default),
            2 => Ok(BandwidthResetMode::AbsoluteRate),
            other => Err(UnknownBandwidthResetMode(other)),
        }
    }
}
