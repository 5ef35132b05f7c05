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

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use rdt_shared::backend::BackendConfig;
use rdt_shared::backend::BackendError;
use rdt_shared::backend::BackendResult;
use rdt_shared::backend::Capability;
use rdt_shared::backend::CdpConfig;
use rdt_shared::backend::L3caRecord;
use rdt_shared::backend::MbaConfig;
use rdt_shared::backend::MbaCtrlFlag;
use rdt_shared::backend::MbaRecord;
use rdt_shared::backend::RdtBackend;
use rdt_shared::backend::Technologies;
use rdt_shared::types::ClassId;
use rdt_shared::types::LogicalCoreId;
use rdt_shared::types::TaskId;

use crate::platforms::StubPlatform;

/// Number of calls per backend entry point, failed calls included.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CallCounters {
    pub init: usize,
    pub shutdown: usize,
    pub capabilities: usize,
    pub set_l3ca: usize,
    pub set_mba: usize,
    pub assoc_core: usize,
    pub assoc_task: usize,
    pub core_association: usize,
    pub class_cores: usize,
    pub release_cores: usize,
    pub assign: usize,
    pub reset: usize,
}

impl CallCounters {
    /// Calls which could change platform state.
    pub fn mutations(&self) -> usize {
        self.set_l3ca
            + self.set_mba
            + self.assoc_core
            + self.assoc_task
            + self.release_cores
            + self.assign
            + self.reset
    }
}

/// Which calls should be rejected.
#[derive(Clone, Debug, Default)]
pub struct StubFailures {
    pub init: bool,
    pub shutdown: bool,
    pub capabilities: bool,
    pub release_cores: bool,
    pub reset: bool,
    pub l3ca_ids: HashSet<u32>,
    pub mba_ids: HashSet<u32>,
    pub cores: HashSet<LogicalCoreId>,
    pub tasks: HashSet<TaskId>,
}

#[derive(Debug, Default)]
pub struct StubState {
    pub platform: StubPlatform,
    pub initialized: bool,
    pub last_config: Option<BackendConfig>,
    pub last_reset: Option<(CdpConfig, CdpConfig, MbaConfig)>,
    pub l3ca: HashMap<(u32, ClassId), u64>,
    pub mba: HashMap<(u32, ClassId), MbaRecord>,
    pub core_classes: HashMap<LogicalCoreId, ClassId>,
    pub task_classes: HashMap<TaskId, ClassId>,
    pub calls: CallCounters,
    pub failures: StubFailures,
}

/// In-memory backend, clones share the same state so a test could keep a
/// handle after moving the backend into a controller.
#[derive(Clone, Debug, Default)]
pub struct StubBackend {
    state: Arc<Mutex<StubState>>,
}

impl StubBackend {
    pub fn new(platform: StubPlatform) -> Self {
        let state = StubState {
            platform,
            ..StubState::default()
        };

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut StubState) -> R) -> R {
        f(&mut *self.state.lock())
    }

    pub fn calls(&self) -> CallCounters {
        self.state.lock().calls
    }

    pub fn fail_init(&self) {
        self.state.lock().failures.init = true;
    }

    pub fn fail_shutdown(&self) {
        self.state.lock().failures.shutdown = true;
    }

    pub fn fail_capabilities(&self) {
        self.state.lock().failures.capabilities = true;
    }

    pub fn fail_l3ca_id(&self, l3ca_id: u32) {
        self.state.lock().failures.l3ca_ids.insert(l3ca_id);
    }

    pub fn fail_mba_id(&self, mba_id: u32) {
        self.state.lock().failures.mba_ids.insert(mba_id);
    }

    pub fn fail_core(&self, core_id: LogicalCoreId) {
        self.state.lock().failures.cores.insert(core_id);
    }

    pub fn fail_task(&self, task_id: TaskId) {
        self.state.lock().failures.tasks.insert(task_id);
    }

    pub fn l3ca_mask(&self, l3ca_id: u32, class_id: ClassId) -> Option<u64> {
        self.state.lock().l3ca.get(&(l3ca_id, class_id)).copied()
    }

    pub fn mba_record(&self, mba_id: u32, class_id: ClassId) -> Option<MbaRecord> {
        self.state.lock().mba.get(&(mba_id, class_id)).copied()
    }

    pub fn core_class(&self, core_id: LogicalCoreId) -> ClassId {
        self.state.lock().core_class(core_id)
    }

    pub fn task_class(&self, task_id: TaskId) -> ClassId {
        self.state
            .lock()
            .task_classes
            .get(&task_id)
            .copied()
            .unwrap_or_default()
    }

    /// Associates a core without going through the counters.
    pub fn preset_core(&self, core_id: LogicalCoreId, class_id: ClassId) {
        self.state.lock().core_classes.insert(core_id, class_id);
    }
}

impl StubState {
    fn core_class(&self, core_id: LogicalCoreId) -> ClassId {
        self.core_classes
            .get(&core_id)
            .copied()
            .unwrap_or_default()
    }

    fn check_initialized(&self) -> BackendResult<()> {
        if !self.initialized {
            return Err(BackendError::NotInitialized);
        }
        Ok(())
    }

    fn slot_count(&self, technologies: Technologies) -> u32 {
        let mut slot_count = self.platform.l3ca_slot_count();
        if technologies.contains(Technologies::MBA) {
            let mba_slots = self.platform.mba_info().map_or(0, |info| info.num_classes);
            slot_count = slot_count.min(mba_slots);
        }
        slot_count
    }

    fn check_class(&self, class_id: ClassId, slot_count: u32) -> BackendResult<()> {
        if class_id.get() >= slot_count {
            return Err(BackendError::invalid_parameter(format!(
                "class {class_id} is out of {slot_count} classes"
            )));
        }
        Ok(())
    }

    fn clamp_mba(&self, requested: &MbaRecord) -> u32 {
        if requested.ctrl {
            return requested.mb_max.min(self.platform.max_rate);
        }

        let granularity = self.platform.mba_granularity.max(1);
        let rounded = requested.mb_max / granularity * granularity;
        rounded.clamp(granularity, 100)
    }
}

impl RdtBackend for StubBackend {
    fn init(&mut self, config: &BackendConfig) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.calls.init += 1;
        if state.failures.init {
            return Err(BackendError::rejected("init failure injected"));
        }
        state.initialized = true;
        state.last_config = Some(*config);
        Ok(())
    }

    fn shutdown(&mut self) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.calls.shutdown += 1;
        state.initialized = false;
        if state.failures.shutdown {
            return Err(BackendError::rejected("shutdown failure injected"));
        }
        Ok(())
    }

    fn capabilities(&self) -> BackendResult<Vec<Capability>> {
        let mut state = self.state.lock();
        state.calls.capabilities += 1;
        state.check_initialized()?;
        if state.failures.capabilities {
            return Err(BackendError::rejected("capability failure injected"));
        }
        Ok(state.platform.capabilities.clone())
    }

    fn l3ca_ids(&self) -> BackendResult<Vec<u32>> {
        let state = self.state.lock();
        state.check_initialized()?;
        Ok(state.platform.l3ca_ids.clone())
    }

    fn mba_ids(&self) -> BackendResult<Vec<u32>> {
        let state = self.state.lock();
        state.check_initialized()?;
        Ok(state.platform.mba_ids.clone())
    }

    fn l3_num_ways(&self) -> BackendResult<u32> {
        let state = self.state.lock();
        state.check_initialized()?;
        Ok(state.platform.cache_ways)
    }

    fn set_l3ca(&mut self, l3ca_id: u32, record: &L3caRecord) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.calls.set_l3ca += 1;
        state.check_initialized()?;
        state.check_class(record.class_id, state.platform.l3ca_slot_count())?;
        if !state.platform.l3ca_ids.contains(&l3ca_id) {
            return Err(BackendError::invalid_parameter(format!("unknown L3CA id {l3ca_id}")));
        }
        if state.failures.l3ca_ids.contains(&l3ca_id) {
            return Err(BackendError::rejected(format!("L3CA id {l3ca_id} failure injected")));
        }
        state.l3ca.insert((l3ca_id, record.class_id), record.ways_mask);
        Ok(())
    }

    fn set_mba(&mut self, mba_id: u32, requested: &MbaRecord) -> BackendResult<MbaRecord> {
        let mut state = self.state.lock();
        state.calls.set_mba += 1;
        state.check_initialized()?;
        let info = state
            .platform
            .mba_info()
            .ok_or_else(|| BackendError::unsupported("memory bandwidth allocation"))?;
        state.check_class(requested.class_id, info.num_classes)?;
        if requested.ctrl != (info.ctrl == MbaCtrlFlag::On) {
            return Err(BackendError::rejected("bandwidth mode differs from the platform one"));
        }
        if !state.platform.mba_ids.contains(&mba_id) {
            return Err(BackendError::invalid_parameter(format!("unknown MBA id {mba_id}")));
        }
        if state.failures.mba_ids.contains(&mba_id) {
            return Err(BackendError::rejected(format!("MBA id {mba_id} failure injected")));
        }

        let actual = MbaRecord {
            mb_max: state.clamp_mba(requested),
            ..*requested
        };
        state.mba.insert((mba_id, requested.class_id), actual);
        Ok(actual)
    }

    fn assoc_core(&mut self, core_id: LogicalCoreId, class_id: ClassId) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.calls.assoc_core += 1;
        state.check_initialized()?;
        if state.failures.cores.contains(&core_id) {
            return Err(BackendError::rejected(format!("core {core_id} failure injected")));
        }
        state.core_classes.insert(core_id, class_id);
        Ok(())
    }

    fn assoc_task(&mut self, task_id: TaskId, class_id: ClassId) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.calls.assoc_task += 1;
        state.check_initialized()?;
        if state.failures.tasks.contains(&task_id) {
            return Err(BackendError::rejected(format!("task {task_id} failure injected")));
        }
        state.task_classes.insert(task_id, class_id);
        Ok(())
    }

    fn core_association(&self, core_id: LogicalCoreId) -> BackendResult<ClassId> {
        let mut state = self.state.lock();
        state.calls.core_association += 1;
        state.check_initialized()?;
        Ok(state.core_class(core_id))
    }

    fn class_cores(&self, class_id: ClassId) -> BackendResult<Vec<LogicalCoreId>> {
        let mut state = self.state.lock();
        state.calls.class_cores += 1;
        state.check_initialized()?;
        let mut core_ids = state
            .core_classes
            .iter()
            .filter(|(_, bound)| **bound == class_id)
            .map(|(core_id, _)| *core_id)
            .collect::<Vec<_>>();
        core_ids.sort();
        Ok(core_ids)
    }

    fn release_cores(&mut self, core_ids: &[LogicalCoreId]) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.calls.release_cores += 1;
        state.check_initialized()?;
        if state.failures.release_cores {
            return Err(BackendError::rejected("release failure injected"));
        }
        for core_id in core_ids {
            state.core_classes.insert(*core_id, ClassId::DEFAULT);
        }
        Ok(())
    }

    fn assign(
        &mut self,
        technologies: Technologies,
        core_ids: &[LogicalCoreId],
    ) -> BackendResult<ClassId> {
        let mut state = self.state.lock();
        state.calls.assign += 1;
        state.check_initialized()?;

        let slot_count = state.slot_count(technologies);
        let used = state.core_classes.values().copied().collect::<HashSet<_>>();
        let class_id = (1..slot_count)
            .map(ClassId::new)
            .find(|class_id| !used.contains(class_id))
            .ok_or(BackendError::NoFreeClass)?;

        for core_id in core_ids {
            state.core_classes.insert(*core_id, class_id);
        }
        Ok(class_id)
    }

    fn reset(&mut self, l3_cdp: CdpConfig, l2_cdp: CdpConfig, mba: MbaConfig) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.calls.reset += 1;
        state.check_initialized()?;
        if state.failures.reset {
            return Err(BackendError::rejected("reset failure injected"));
        }
        state.last_reset = Some((l3_cdp, l2_cdp, mba));
        state.l3ca.clear();
        state.mba.clear();
        state.core_classes.clear();
        state.task_classes.clear();
        Ok(())
    }
}
