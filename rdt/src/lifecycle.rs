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

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use rdt_shared::backend::BackendConfig;
use rdt_shared::backend::BackendError;
use rdt_shared::backend::CdpConfig;
use rdt_shared::backend::MbaConfig;
use rdt_shared::backend::RdtBackend;
use rdt_shared::backend::Technologies;
use rdt_shared::types::BandwidthResetMode;
use rdt_shared::types::ClassId;
use rdt_shared::types::LogicalCoreId;

use crate::capability::CapabilityRegistry;
use crate::class_store::ClassStore;
use crate::errors::CapabilityError;
use crate::errors::Operation;
use crate::errors::ValidationError;
use crate::RdtError;
use crate::RdtResult;

/// Platform init and shutdown, global reset and class acquire/release.
pub(crate) struct LifecycleController<'state, B: ?Sized> {
    backend: &'state mut B,
    registry: &'state mut CapabilityRegistry,
    store: &'state mut ClassStore,
}

impl<'state, B: RdtBackend + ?Sized> LifecycleController<'state, B> {
    pub(crate) fn new(
        backend: &'state mut B,
        registry: &'state mut CapabilityRegistry,
        store: &'state mut ClassStore,
    ) -> Self {
        Self {
            backend,
            registry,
            store,
        }
    }

    pub(crate) fn init(&mut self, config: &BackendConfig) -> RdtResult<()> {
        if self.registry.is_initialized() {
            return Err(ValidationError::AlreadyInitialized.into());
        }

        tracing::info!("initializing platform with {config:?}");
        if let Err(error) = self.backend.init(config) {
            tracing::error!("backend initialization failed: {error}");
            self.shutdown_after_failure();
            return Err(RdtError::backend_rejected(Operation::Init, 0, error));
        }

        let discovered = self.registry.refresh(&*self.backend).map(|_| ());
        if let Err(error) = discovered {
            tracing::error!("capability discovery failed: {error}");
            self.shutdown_after_failure();
            return Err(error);
        }
        self.store.clear();

        tracing::info!("platform initialized");
        Ok(())
    }

    /// Snapshot and store are dropped even if the backend fails to shut down.
    pub(crate) fn shutdown(&mut self) -> RdtResult<()> {
        if !self.registry.is_initialized() {
            return Err(CapabilityError::NotInitialized.into());
        }

        self.registry.clear();
        self.store.clear();
        self.backend
            .shutdown()
            .map_err(|error| RdtError::backend_rejected(Operation::Shutdown, 0, error))?;

        tracing::info!("platform shut down");
        Ok(())
    }

    pub(crate) fn reset_to_defaults(&mut self, mode: BandwidthResetMode) -> RdtResult<()> {
        self.registry.snapshot()?;

        let mba = match mode {
            BandwidthResetMode::Any => MbaConfig::Any,
            BandwidthResetMode::Default => MbaConfig::Default,
            BandwidthResetMode::AbsoluteRate => MbaConfig::Ctrl,
        };
        tracing::info!("resetting every class to defaults, bandwidth mode {mode:?}");
        self.backend
            .reset(CdpConfig::Any, CdpConfig::Any, mba)
            .map_err(|error| RdtError::backend_rejected(Operation::Reset, 0, error))?;

        self.store.clear();
        self.registry.refresh(&*self.backend)?;

        Ok(())
    }

    pub(crate) fn acquire_class(&mut self, core_ids: &[LogicalCoreId]) -> RdtResult<ClassId> {
        let snapshot = self.registry.snapshot()?;
        if core_ids.is_empty() {
            return Err(ValidationError::EmptyCoreList.into());
        }

        let mut technologies = Technologies::L3CA;
        if snapshot.bandwidth_mode.is_supported() {
            technologies |= Technologies::MBA;
        }

        let class_id = match self.backend.assign(technologies, core_ids) {
            Ok(class_id) => class_id,
            Err(BackendError::NoFreeClass) => {
                tracing::warn!("no free class for {} core(s)", core_ids.len());
                return Err(RdtError::CapacityExhausted {
                    requested: technologies,
                });
            }
            Err(error) => return Err(RdtError::backend_rejected(Operation::Assign, 0, error)),
        };

        self.store.ensure_class(class_id);
        for &core_id in core_ids {
            self.store.bind_core(core_id, class_id);
        }
        tracing::info!("acquired class {class_id} for {} core(s)", core_ids.len());

        Ok(class_id)
    }

    /// Returns every core and task of the class to the default class and
    /// forgets the class. Its hardware settings are left as they are.
    ///
    /// Cores are taken from the backend as well as from the store, so a class
    /// bound by another controller instance is released too.
    pub(crate) fn release_class(&mut self, class_id: ClassId) -> RdtResult<()> {
        let snapshot = self.registry.snapshot()?;
        if class_id.is_default() {
            return Err(ValidationError::DefaultClassReserved.into());
        }
        snapshot.check_class(class_id)?;

        let mut core_ids = self
            .backend
            .class_cores(class_id)
            .map_err(|error| RdtError::backend_rejected(Operation::QueryAssociation, 0, error))?
            .into_iter()
            .collect::<BTreeSet<_>>();
        let task_ids = match self.store.class(class_id) {
            Some(class) => {
                core_ids.extend(class.bound_cores.iter().copied());
                class.bound_tasks.iter().copied().collect::<Vec<_>>()
            }
            None if core_ids.is_empty() => {
                tracing::debug!("class {class_id} isn't in use, nothing to release");
                return Ok(());
            }
            None => Vec::new(),
        };

        if !core_ids.is_empty() {
            let core_ids = core_ids.into_iter().collect::<Vec<_>>();
            self.backend
                .release_cores(&core_ids)
                .map_err(|error| RdtError::backend_rejected(Operation::ReleaseCores, 0, error))?;
            for core_id in core_ids {
                self.store.bind_core(core_id, ClassId::DEFAULT);
            }
        }
        for (applied, &task_id) in task_ids.iter().enumerate() {
            self.backend
                .assoc_task(task_id, ClassId::DEFAULT)
                .map_err(|error| RdtError::backend_rejected(Operation::AssocTask, applied, error))?;
            self.store.bind_task(task_id, ClassId::DEFAULT);
        }

        self.store.remove_class(class_id);
        tracing::info!("released class {class_id}");

        Ok(())
    }

    fn shutdown_after_failure(&mut self) {
        if let Err(error) = self.backend.shutdown() {
            tracing::warn!("best-effort backend shutdown failed: {error}");
        }
    }
}

/// Classes able to serve an acquire: not held by the store and without
/// cores on the backend.
pub(crate) fn free_class_count<B: RdtBackend + ?Sized>(
    backend: &B,
    registry: &CapabilityRegistry,
    store: &ClassStore,
) -> RdtResult<u32> {
    let snapshot = registry.snapshot()?;
    let class_count = if snapshot.bandwidth_mode.is_supported() {
        snapshot.l3ca_slot_count.min(snapshot.mba_slot_count)
    } else {
        snapshot.l3ca_slot_count
    };

    let mut free = 0;
    for class_id in (1..class_count).map(ClassId::new) {
        if store.class(class_id).is_some() {
            continue;
        }
        let core_ids = backend
            .class_cores(class_id)
            .map_err(|error| RdtError::backend_rejected(Operation::QueryAssociation, 0, error))?;
        if core_ids.is_empty() {
            free += 1;
        }
    }

    Ok(free)
}
