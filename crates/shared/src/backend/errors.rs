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

#[derive(ThisError, Debug)]
pub enum BackendError {
    #[error("backend is not initialized")]
    NotInitialized,

    #[error("backend doesn't support {operation}")]
    Unsupported { operation: String },

    #[error("backend rejected the request: {reason}")]
    Rejected { reason: String },

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("no free class of service is left")]
    NoFreeClass,

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl BackendError {
    pub fn unsupported(operation: impl ToString) -> Self {
        Self::Unsupported {
            operation: operation.to_string(),
        }
    }

    pub fn rejected(reason: impl ToString) -> Self {
        Self::Rejected {
            reason: reason.to_string(),
        }
    }

    pub fn invalid_parameter(reason: impl ToString) -> Self {
        Self::InvalidParameter {
            reason: reason.to_string(),
        }
    }
}
