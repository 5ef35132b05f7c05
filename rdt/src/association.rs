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


use std::fmt::Display;

use rdt_shared::backend::BackendError;
use rdt_shared::backend::BackendResult;
use rdt_shared::backend::RdtBackend;
use rdt_shared::types::ClassId;
use rdt_shared::types::LogicalCoreId;
use rdt_shared::types::TaskId;

use crate::capability::CapabilitySnapshot;
use crate::class_store::ClassStore;
use crate::errors::Operation;
use crate::errors::ValidationError;
use crate::RdtError;
use crate::RdtResult;

/// Binds cores and tasks to classes, independently of class settings.
pub(crate) struct AssociationManager<'state, B: ?Sized> {
    backend: &'state mut B,
    snapshot: &'state CapabilitySnapshot,
    store: &'state mut ClassStore,
}

impl<'state, B: RdtBackend + ?Sized> AssociationManager<'state, B> {
    pub(crate) fn new(
        backend: &'state mut B,
        snapshot: &'state CapabilitySnapshot,
        store: &'state mut ClassStore,
    ) -> Self {
        Self {
            backend,
            snapshot,
            store,
        }
    }

    pub(crate) fn bind_cores(
        &mut self,
        class_id: ClassId,
        core_ids: &[LogicalCoreId],
    ) -> RdtResult<()> {
        self.snapshot.check_class(class_id)?;
        let pairs = core_ids.iter().map(|&core_id| (class_id, core_id));
        self.bind_each(
            pairs,
            Operation::AssocCore,
            |backend, core_id, class_id| backend.assoc_core(core_id, class_id),
            ClassStore::bind_core,
        )
    }

    pub(crate) fn bind_core_pairs(
        &mut self,
        class_ids: &[ClassId],
        core_ids: &[LogicalCoreId],
    ) -> RdtResult<()> {
        self.check_pairs(class_ids, core_ids.len())?;
        let pairs = class_ids.iter().copied().zip(core_ids.iter().copied());
        self.bind_each(
            pairs,
            Operation::AssocCore,
            |backend, core_id, class_id| backend.assoc_core(core_id, class_id),
            ClassStore::bind_core,
        )
    }

    pub(crate) fn bind_tasks(&mut self, class_id: ClassId, task_ids: &[TaskId]) -> RdtResult<()> {
        self.snapshot.check_class(class_id)?;
        let pairs = task_ids.iter().map(|&task_id| (class_id, task_id));
        self.bind_each(
            pairs,
            Operation::AssocTask,
            |backend, task_id, class_id| backend.assoc_task(task_id, class_id),
            ClassStore::bind_task,
        )
    }

    pub(crate) fn bind_task_pairs(
        &mut self,
        class_ids: &[ClassId],
        task_ids: &[TaskId],
    ) -> RdtResult<()> {
        self.check_pairs(class_ids, task_ids.len())?;
        let pairs = class_ids.iter().copied().zip(task_ids.iter().copied());
        self.bind_each(
            pairs,
            Operation::AssocTask,
            |backend, task_id, class_id| backend.assoc_task(task_id, class_id),
            ClassStore::bind_task,
        )
    }

    pub(crate) fn release_cores(&mut self, core_ids: &[LogicalCoreId]) -> RdtResult<()> {
        if core_ids.is_empty() {
            return Err(ValidationError::EmptyCoreList.into());
        }

        tracing::debug!("releasing {} core(s) to the default class", core_ids.len());
        self.backend
            .release_cores(core_ids)
            .map_err(|error| RdtError::backend_rejected(Operation::ReleaseCores, 0, error))?;
        self.store.release_cores(core_ids);

        Ok(())
    }

    fn check_pairs(&self, class_ids: &[ClassId], subjects: usize) -> RdtResult<()> {
        if class_ids.len() != subjects {
            return Err(ValidationError::LengthMismatch {
                class_ids: class_ids.len(),
                subjects,
            }
            .into());
        }

        class_ids
            .iter()
            .try_for_each(|&class_id| self.snapshot.check_class(class_id))
    }

    /// Attempts every pair even after a failure, the store only learns about
    /// accepted pairs. Reports the first failure.
    fn bind_each<S, P>(
        &mut self,
        pairs: P,
        operation: Operation,
        mut associate: impl FnMut(&mut B, S, ClassId) -> BackendResult<()>,
        mut record: impl FnMut(&mut ClassStore, S, ClassId),
    ) -> RdtResult<()>
    where
        S: Copy + Display,
        P: IntoIterator<Item = (ClassId, S)>,
    {
        let mut first_error: Option<BackendError> = None;
        let mut bound = 0;
        let mut failed = 0;

        for (class_id, subject) in pairs {
            tracing::debug!("{operation}: {subject} -> class {class_id}");
            match associate(&mut *self.backend, subject, class_id) {
                Ok(()) => {
                    record(&mut *self.store, subject, class_id);
                    bound += 1;
                }
                Err(error) => {
                    tracing::warn!("{operation} of {subject} to class {class_id} failed: {error}");
                    failed += 1;
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(source) => {
                tracing::warn!("{operation}: {failed} subject(s) failed, {bound} bound");
                Err(RdtError::AssociationFailed {
                    operation,
                    bound,
                    failed,
                    source,
                })
            }
        }
    }
}
