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


use parking_lot::RwLock;

use rdt_shared::backend::BackendConfig;
use rdt_shared::backend::RdtBackend;
use rdt_shared::types::BandwidthMode;
use rdt_shared::types::BandwidthResetMode;
use rdt_shared::types::ClassId;
use rdt_shared::types::LogicalCoreId;
use rdt_shared::types::SocketIndex;
use rdt_shared::types::TaskId;

use crate::applier::AllocationApplier;
use crate::applier::AppliedBandwidth;
use crate::association::AssociationManager;
use crate::capability::CapabilityRegistry;
use crate::capability::CapabilitySnapshot;
use crate::class_store::BandwidthLimit;
use crate::class_store::ClassOfService;
use crate::class_store::ClassStore;
use crate::errors::Operation;
use crate::errors::ValidationError;
use crate::lifecycle;
use crate::lifecycle::LifecycleController;
use crate::RdtError;
use crate::RdtResult;

struct ControllerState<B> {
    backend: B,
    registry: CapabilityRegistry,
    store: ClassStore,
}

impl<B: RdtBackend> ControllerState<B> {
    fn lifecycle(&mut self) -> LifecycleController<'_, B> {
        LifecycleController::new(&mut self.backend, &mut self.registry, &mut self.store)
    }

    fn applier(&mut self) -> RdtResult<AllocationApplier<'_, B>> {
        let snapshot = self.registry.snapshot()?;
        Ok(AllocationApplier::new(&mut self.backend, snapshot, &mut self.store))
    }

    fn associations(&mut self) -> RdtResult<AssociationManager<'_, B>> {
        let snapshot = self.registry.snapshot()?;
        Ok(AssociationManager::new(&mut self.backend, snapshot, &mut self.store))
    }
}

/// Shared handle to the platform.
///
/// Every call touching the backend's settings or associations takes the write
/// half of one lock, queries take the read half. Calls don't time out, a stuck
/// backend blocks the caller.
pub struct RdtController<B> {
    state: RwLock<ControllerState<B>>,
    backend_config: BackendConfig,
}

impl<B: RdtBackend> RdtController<B> {
    /// Creates a controller initializing the backend through the OS interface.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, BackendConfig::default())
    }

    pub fn with_config(backend: B, backend_config: BackendConfig) -> Self {
        let state = ControllerState {
            backend,
            registry: CapabilityRegistry::new(),
            store: ClassStore::new(),
        };

        Self {
            state: RwLock::new(state),
            backend_config,
        }
    }

    /// Initializes the backend and discovers platform capabilities.
    ///
    /// If either step fails the backend is shut down on a best-effort basis
    /// and the original error is returned.
    pub fn init(&self) -> RdtResult<()> {
        self.state.write().lifecycle().init(&self.backend_config)
    }

    pub fn shutdown(&self) -> RdtResult<()> {
        self.state.write().lifecycle().shutdown()
    }

    /// Restores every class to platform defaults and every core to the
    /// default class, then rediscovers capabilities.
    pub fn reset_to_defaults(&self, mode: BandwidthResetMode) -> RdtResult<()> {
        self.state.write().lifecycle().reset_to_defaults(mode)
    }

    /// Same as [`Self::reset_to_defaults`] for a raw mode: 0 any, 1 default,
    /// 2 absolute rate.
    pub fn reset_to_defaults_raw(&self, mode: i32) -> RdtResult<()> {
        let mode = BandwidthResetMode::try_from(mode).map_err(ValidationError::from)?;
        self.reset_to_defaults(mode)
    }

    /// Takes the first free class and associates the cores with it.
    pub fn acquire_class(&self, core_ids: &[LogicalCoreId]) -> RdtResult<ClassId> {
        self.state.write().lifecycle().acquire_class(core_ids)
    }

    pub fn release_class(&self, class_id: ClassId) -> RdtResult<()> {
        self.state.write().lifecycle().release_class(class_id)
    }

    pub fn free_class_count(&self) -> RdtResult<u32> {
        let state = self.state.read();
        lifecycle::free_class_count(&state.backend, &state.registry, &state.store)
    }

    pub fn query_capabilities(&self) -> RdtResult<CapabilitySnapshot> {
        self.state.read().registry.snapshot().cloned()
    }

    /// Programs cache way masks of the class, socket by socket in the given
    /// order.
    ///
    /// Stops at the first socket the backend rejects. Sockets programmed
    /// before it are not rolled back, the error's `applied` field tells how
    /// many there are.
    pub fn apply_cache_allocation(
        &self,
        class_id: ClassId,
        masks: &[(SocketIndex, u64)],
    ) -> RdtResult<()> {
        self.state.write().applier()?.apply_cache(class_id, masks)
    }

    /// Programs bandwidth limits of the class, socket by socket in the given
    /// order, and returns both requested and actually programmed values.
    ///
    /// Stops at the first socket the backend rejects. Sockets programmed
    /// before it are not rolled back, the error's `applied` field tells how
    /// many there are.
    pub fn apply_bandwidth_allocation(
        &self,
        class_id: ClassId,
        mode: BandwidthMode,
        limits: &[(SocketIndex, u32)],
    ) -> RdtResult<Vec<AppliedBandwidth>> {
        self.state
            .write()
            .applier()?
            .apply_bandwidth(class_id, mode, limits)
    }

    pub fn cache_mask(&self, class_id: ClassId, socket: SocketIndex) -> Option<u64> {
        let state = self.state.read();
        state.store.class(class_id)?.cache_masks.get(&socket).copied()
    }

    pub fn bandwidth_limit(
        &self,
        class_id: ClassId,
        socket: SocketIndex,
    ) -> Option<BandwidthLimit> {
        let state = self.state.read();
        state.store.class(class_id)?.bandwidth.get(&socket).copied()
    }

    pub fn class(&self, class_id: ClassId) -> Option<ClassOfService> {
        self.state.read().store.class(class_id).cloned()
    }

    pub fn classes(&self) -> Vec<ClassOfService> {
        self.state.read().store.classes().cloned().collect()
    }

    pub fn bind_core(&self, class_id: ClassId, core_id: LogicalCoreId) -> RdtResult<()> {
        self.bind_cores(class_id, &[core_id])
    }

    /// Binds every core to the class. A failing core doesn't stop the rest,
    /// the first failure is returned.
    pub fn bind_cores(&self, class_id: ClassId, core_ids: &[LogicalCoreId]) -> RdtResult<()> {
        self.state
            .write()
            .associations()?
            .bind_cores(class_id, core_ids)
    }

    /// Binds `core_ids[i]` to `class_ids[i]`.
    pub fn bind_core_pairs(
        &self,
        class_ids: &[ClassId],
        core_ids: &[LogicalCoreId],
    ) -> RdtResult<()> {
        self.state
            .write()
            .associations()?
            .bind_core_pairs(class_ids, core_ids)
    }

    pub fn bind_task(&self, class_id: ClassId, task_id: TaskId) -> RdtResult<()> {
        self.bind_tasks(class_id, &[task_id])
    }

    pub fn bind_tasks(&self, class_id: ClassId, task_ids: &[TaskId]) -> RdtResult<()> {
        self.state
            .write()
            .associations()?
            .bind_tasks(class_id, task_ids)
    }

    pub fn bind_task_pairs(&self, class_ids: &[ClassId], task_ids: &[TaskId]) -> RdtResult<()> {
        self.state
            .write()
            .associations()?
            .bind_task_pairs(class_ids, task_ids)
    }

    /// Moves the cores back to the default class, class settings stay untouched.
    pub fn release_cores(&self, core_ids: &[LogicalCoreId]) -> RdtResult<()> {
        self.state.write().associations()?.release_cores(core_ids)
    }

    /// Class the core was last successfully bound to.
    pub fn core_class(&self, core_id: LogicalCoreId) -> ClassId {
        self.state.read().store.core_class(core_id)
    }

    pub fn task_class(&self, task_id: TaskId) -> ClassId {
        self.state.read().store.task_class(task_id)
    }

    /// Class the backend currently associates the core with, useful to
    /// reconcile after a partially failed bind.
    pub fn core_association(&self, core_id: LogicalCoreId) -> RdtResult<ClassId> {
        let state = self.state.read();
        state.registry.snapshot()?;
        state
            .backend
            .core_association(core_id)
            .map_err(|error| RdtError::backend_rejected(Operation::QueryAssociation, 0, error))
    }
}
