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

#[derive(Debug, ThisError)]
pub enum CPUTopologyError {
    #[error(transparent)]
    RawHwlocError(#[from] hwlocality::errors::RawHwlocError),

    #[error("no packages found in the topology")]
    PackagesNotFound,

    #[error("os index of a package with {logical_index} logical index not found")]
    PackageOsIndexNotFound { logical_index: usize },

    #[error("logical cores of a package with {logical_index} logical index not found")]
    PackageCoresNotFound { logical_index: usize },
}

impl CPUTopologyError {
    pub fn package_os_index_not_found(logical_index: usize) -> Self {
        Self::PackageOsIndexNotFound { logical_index }
    }

    pub fn package_cores_not_found(logical_index: usize) -> Self {
        Self::PackageCoresNotFound { logical_index }
    }
}
