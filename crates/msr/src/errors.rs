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

use nix::errno::Errno;
use thiserror::Error as ThisError;

use rdt_shared::backend::BackendError;
use rdt_shared::types::LogicalCoreId;

#[derive(ThisError, Debug)]
pub enum MSRError {
    #[error("opening MSR file '/dev/cpu/{core_id}/msr' for read failed: {io_error}")]
    OpenForRead {
        core_id: LogicalCoreId,
        io_error: std::io::Error,
    },

    #[error("opening MSR file '/dev/cpu/{core_id}/msr' for write failed: {io_error}")]
    OpenForWrite {
        core_id: LogicalCoreId,
        io_error: std::io::Error,
    },

    #[error("reading register {register_id:#X} from '/dev/cpu/{core_id}/msr' failed: {errno}")]
    Read {
        register_id: u32,
        core_id: LogicalCoreId,
        errno: Errno,
    },

    #[error(
        "writing value {value:#X} to register {register_id:#X} of '/dev/cpu/{core_id}/msr' failed: {errno}"
    )]
    Write {
        value: u64,
        register_id: u32,
        core_id: LogicalCoreId,
        errno: Errno,
    },
}

#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
impl MSRError {
    pub(crate) fn open_for_read(core_id: LogicalCoreId, io_error: std::io::Error) -> Self {
        Self::OpenForRead { core_id, io_error }
    }

    pub(crate) fn open_for_write(core_id: LogicalCoreId, io_error: std::io::Error) -> Self {
        Self::OpenForWrite { core_id, io_error }
    }

    pub(crate) fn read(register_id: u32, core_id: LogicalCoreId, errno: Errno) -> Self {
        Self::Read {
            register_id,
            core_id,
            errno,
        }
    }

    pub(crate) fn write(
        value: u64,
        register_id: u32,
        core_id: LogicalCoreId,
        errno: Errno,
    ) -> Self {
        Self::Write {
            value,
            register_id,
            core_id,
            errno,
        }
    }
}

impl From<MSRError> for BackendError {
    fn from(error: MSRError) -> Self {
        match error {
            MSRError::OpenForRead { io_error, .. } | MSRError::OpenForWrite { io_error, .. } => {
                BackendError::IoError(io_error)
            }
            error => BackendError::rejected(error),
        }
    }
}
