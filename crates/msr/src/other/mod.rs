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

//! This module keeps the crate compiling on archs without MSR access,
//! the backend refuses to initialize there.

use rdt_shared::backend::BackendConfig;
use rdt_shared::backend::BackendError;
use rdt_shared::backend::BackendResult;
use rdt_shared::backend::Capability;
use rdt_shared::backend::CdpConfig;
use rdt_shared::backend::L3caRecord;
use rdt_shared::backend::MbaConfig;
use rdt_shared::backend::MbaRecord;
use rdt_shared::backend::RdtBackend;
use rdt_shared::backend::Technologies;
use rdt_shared::types::ClassId;
use rdt_shared::types::LogicalCoreId;
use rdt_shared::types::TaskId;

#[derive(Default)]
pub struct MsrBackend;

impl MsrBackend {
    pub fn new() -> Self {
        Self
    }
}

impl RdtBackend for MsrBackend {
    fn init(&mut self, _config: &BackendConfig) -> BackendResult<()> {
        Err(BackendError::unsupported("MSR access on this platform"))
    }

    fn shutdown(&mut self) -> BackendResult<()> {
        Ok(())
    }

    fn capabilities(&self) -> BackendResult<Vec<Capability>> {
        Err(BackendError::NotInitialized)
    }

    fn l3ca_ids(&self) -> BackendResult<Vec<u32>> {
        Err(BackendError::NotInitialized)
    }

    fn mba_ids(&self) -> BackendResult<Vec<u32>> {
        Err(BackendError::NotInitialized)
    }

    fn l3_num_ways(&self) -> BackendResult<u32> {
        Err(BackendError::NotInitialized)
    }

    fn set_l3ca(&mut self, _l3ca_id: u32, _record: &L3caRecord) -> BackendResult<()> {
        Err(BackendError::NotInitialized)
    }

    fn set_mba(&mut self, _mba_id: u32, _requested: &MbaRecord) -> BackendResult<MbaRecord> {
        Err(BackendError::NotInitialized)
    }

    fn assoc_core(&mut self, _core_id: LogicalCoreId, _class_id: ClassId) -> BackendResult<()> {
        Err(BackendError::NotInitialized)
    }

    fn assoc_task(&mut self, _task_id: TaskId, _class_id: ClassId) -> BackendResult<()> {
        Err(BackendError::NotInitialized)
    }

    fn core_association(&self, _core_id: LogicalCoreId) -> BackendResult<ClassId> {
        Err(BackendError::NotInitialized)
    }

    fn class_cores(&self, _class_id: ClassId) -> BackendResult<Vec<LogicalCoreId>> {
        Err(BackendError::NotInitialized)
    }

    fn release_cores(&mut self, _core_ids: &[LogicalCoreId]) -> BackendResult<()> {
        Err(BackendError::NotInitialized)
    }

    fn assign(
        &mut self,
        _technologies: Technologies,
        _core_ids: &[LogicalCoreId],
    ) -> BackendResult<ClassId> {
        Err(BackendError::NotInitialized)
    }

    fn reset(
        &mut self,
        _l3_cdp: CdpConfig,
        _l2_cdp: CdpConfig,
        _mba: MbaConfig,
    ) -> BackendResult<()> {
        Err(BackendError::NotInitialized)
    }
}
