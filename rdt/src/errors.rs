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

use std::fmt;

use thiserror::Error as ThisError;

use rdt_shared::backend::BackendError;
use rdt_shared::backend::Technologies;
use rdt_shared::types::ClassId;
use rdt_shared::types::SocketIndex;
use rdt_shared::types::UnknownBandwidthResetMode;

#[derive(ThisError, Debug)]
pub enum RdtError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// The backend refused a value. Items applied earlier in the same call
    /// stay applied, `applied` tells how many of them there are.
    #[error("backend rejected {operation} after {applied} applied item(s): {source}")]
    BackendRejected {
        operation: Operation,
        applied: usize,
        source: BackendError,
    },

    /// Some subjects of a batch bind were refused. The others are bound.
    #[error("{operation} failed for {failed} subject(s), {bound} bound: {source}")]
    AssociationFailed {
        operation: Operation,
        bound: usize,
        failed: usize,
        source: BackendError,
    },

    #[error("no free class of service supporting {requested:?} is left")]
    CapacityExhausted { requested: Technologies },
}

/// Request errors caught before any backend call.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("socket index {socket} is out of range, platform has {socket_count} socket(s)")]
    SocketIndexOutOfRange {
        socket: SocketIndex,
        socket_count: usize,
    },

    #[error("mask {mask:#x} sets bits outside of {cache_ways} cache ways")]
    MaskOutOfRange { mask: u64, cache_ways: u32 },

    #[error("{class_ids} class id(s) given for {subjects} subject(s)")]
    LengthMismatch { class_ids: usize, subjects: usize },

    #[error("bandwidth can't be requested in the unsupported mode")]
    UnsupportedRequestedMode,

    #[error("bandwidth limit {value} on socket {socket} is out of range")]
    BandwidthOutOfRange { socket: SocketIndex, value: u32 },

    #[error("core list is empty")]
    EmptyCoreList,

    #[error(transparent)]
    UnknownResetMode(#[from] UnknownBandwidthResetMode),

    #[error("the default class of service can't be released")]
    DefaultClassReserved,

    #[error("platform is already initialized")]
    AlreadyInitialized,
}

/// Mismatches between a request and what the platform supports.
#[derive(ThisError, Debug)]
pub enum CapabilityError {
    #[error("platform isn't initialized")]
    NotInitialized,

    #[error("querying {what} failed: {source}")]
    QueryFailed {
        what: &'static str,
        source: BackendError,
    },

    #[error("platform doesn't support L3 cache allocation")]
    L3caMissing,

    #[error("{technology} capability is reported without any details")]
    EmptyCapability { technology: &'static str },

    #[error("MBA control flag has unknown value {0}")]
    UnknownMbaCtrl(i32),

    #[error("{technology} id table is empty")]
    EmptyIdTable { technology: &'static str },

    #[error("platform reports {0} cache ways, expected 1..=64")]
    InvalidCacheWays(u32),

    #[error("class {class_id} is out of {technology} range, platform has {slot_count} class(es)")]
    ClassIdOutOfRange {
        class_id: ClassId,
        slot_count: u32,
        technology: &'static str,
    },

    #[error("platform doesn't support memory bandwidth allocation")]
    BandwidthUnsupported,
}

/// Backend entry point an error came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Init,
    Shutdown,
    SetL3ca,
    SetMba,
    AssocCore,
    AssocTask,
    QueryAssociation,
    ReleaseCores,
    Assign,
    Reset,
}

impl RdtError {
    pub(crate) fn backend_rejected(
        operation: Operation,
        applied: usize,
        source: BackendError,
    ) -> Self {
        Self::BackendRejected {
            operation,
            applied,
            source,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_capability(&self) -> bool {
        matches!(self, Self::Capability(_))
    }
}

impl CapabilityError {
    pub(crate) fn query_failed(what: &'static str, source: BackendError) -> Self {
        Self::QueryFailed { what, source }
    }

    pub(crate) fn class_id_out_of_range(
        class_id: ClassId,
        slot_count: u32,
        technology: &'static str,
    ) -> Self {
        Self::ClassIdOutOfRange {
            class_id,
            slot_count,
            technology,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Init => "init",
            Operation::Shutdown => "shutdown",
            Operation::SetL3ca => "L3 cache allocation",
            Operation::SetMba => "memory bandwidth allocation",
            Operation::AssocCore => "core association",
            Operation::AssocTask => "task association",
            Operation::QueryAssociation => "association query",
            Operation::ReleaseCores => "core release",
            Operation::Assign => "class assignment",
            Operation::Reset => "reset",
        };
        f.write_str(name)
    }
}
