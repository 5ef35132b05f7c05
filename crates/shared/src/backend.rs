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

//! The narrow interface the allocation core drives the hardware through.
//!
//! A backend owns the real mechanism (resctrl filesystem, MSR registers, ...)
//! and is assumed to be synchronous and authoritative: once a call returns
//! successfully the setting is in effect.

mod capability;
mod config;
mod errors;
mod records;

pub use capability::Capability;
pub use capability::L3caInfo;
pub use capability::MbaCtrlFlag;
pub use capability::MbaInfo;
pub use config::BackendConfig;
pub use config::Interface;
pub use config::LogTarget;
pub use config::Verbosity;
pub use errors::BackendError;
pub use records::CdpConfig;
pub use records::L3caRecord;
pub use records::MbaConfig;
pub use records::MbaRecord;
pub use records::Technologies;

use crate::types::ClassId;
use crate::types::LogicalCoreId;
use crate::types::TaskId;

pub type BackendResult<T> = Result<T, BackendError>;

pub trait RdtBackend: Send {
    /// Opens the backend, must precede every other call.
    fn init(&mut self, config: &BackendConfig) -> BackendResult<()>;

    /// Releases the backend, safe to call on a half-initialized backend.
    fn shutdown(&mut self) -> BackendResult<()>;

    /// Returns the list of resource technologies the platform exposes.
    fn capabilities(&self) -> BackendResult<Vec<Capability>>;

    /// Backend ids of every socket with cache allocation, in socket order.
    fn l3ca_ids(&self) -> BackendResult<Vec<u32>>;

    /// Backend ids of every socket with memory bandwidth allocation, in socket order.
    fn mba_ids(&self) -> BackendResult<Vec<u32>>;

    /// Number of ways of the last level cache.
    fn l3_num_ways(&self) -> BackendResult<u32>;

    fn set_l3ca(&mut self, l3ca_id: u32, record: &L3caRecord) -> BackendResult<()>;

    /// Programs a bandwidth limit and returns the record actually applied,
    /// hardware could round or clamp the requested value.
    fn set_mba(&mut self, mba_id: u32, requested: &MbaRecord) -> BackendResult<MbaRecord>;

    fn assoc_core(&mut self, core_id: LogicalCoreId, class_id: ClassId) -> BackendResult<()>;

    fn assoc_task(&mut self, task_id: TaskId, class_id: ClassId) -> BackendResult<()>;

    /// Returns the class the core is currently associated with.
    fn core_association(&self, core_id: LogicalCoreId) -> BackendResult<ClassId>;

    /// Cores the backend currently associates with the class, whoever bound them.
    fn class_cores(&self, class_id: ClassId) -> BackendResult<Vec<LogicalCoreId>>;

    /// Moves the cores back to the default class.
    fn release_cores(&mut self, core_ids: &[LogicalCoreId]) -> BackendResult<()>;

    /// Picks the first unused class supporting all the technologies and
    /// associates the cores with it.
    fn assign(
        &mut self,
        technologies: Technologies,
        core_ids: &[LogicalCoreId],
    ) -> BackendResult<ClassId>;

    /// Restores every class to platform defaults and every core to the default class.
    fn reset(&mut self, l3_cdp: CdpConfig, l2_cdp: CdpConfig, mba: MbaConfig)
        -> BackendResult<()>;
}
