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

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;

use serde::Serialize;

use rdt_shared::types::BandwidthMode;
use rdt_shared::types::ClassId;
use rdt_shared::types::LogicalCoreId;
use rdt_shared::types::SocketIndex;
use rdt_shared::types::TaskId;

/// Bandwidth limit of a class on one socket, as requested by a caller and
/// as actually programmed by the backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BandwidthLimit {
    pub requested: u32,
    pub actual: u32,
    pub mode: BandwidthMode,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassOfService {
    pub id: ClassId,
    pub cache_masks: BTreeMap<SocketIndex, u64>,
    pub bandwidth: BTreeMap<SocketIndex, BandwidthLimit>,
    pub bound_cores: BTreeSet<LogicalCoreId>,
    pub bound_tasks: BTreeSet<TaskId>,
}

impl ClassOfService {
    pub fn new(id: ClassId) -> Self {
        Self {
            id,
            cache_masks: BTreeMap::new(),
            bandwidth: BTreeMap::new(),
            bound_cores: BTreeSet::new(),
            bound_tasks: BTreeSet::new(),
        }
    }
}

/// Mirror of what was successfully pushed to the backend.
///
/// A core or task is bound to at most one class: binding it elsewhere
/// removes it from the previous class. Subjects without an entry belong to
/// the default class.
#[derive(Debug)]
pub(crate) struct ClassStore {
    classes: BTreeMap<ClassId, ClassOfService>,
    core_bindings: HashMap<LogicalCoreId, ClassId>,
    task_bindings: HashMap<TaskId, ClassId>,
}

impl ClassStore {
    pub(crate) fn new() -> Self {
        let mut store = Self {
            classes: BTreeMap::new(),
            core_bindings: HashMap::new(),
            task_bindings: HashMap::new(),
        };
        store.ensure_class(ClassId::DEFAULT);
        store
    }

    pub(crate) fn class(&self, class_id: ClassId) -> Option<&ClassOfService> {
        self.classes.get(&class_id)
    }

    pub(crate) fn classes(&self) -> impl Iterator<Item = &ClassOfService> {
        self.classes.values()
    }

    pub(crate) fn ensure_class(&mut self, class_id: ClassId) -> &mut ClassOfService {
        self.classes
            .entry(class_id)
            .or_insert_with(|| ClassOfService::new(class_id))
    }

    pub(crate) fn set_cache_mask(&mut self, class_id: ClassId, socket: SocketIndex, mask: u64) {
        self.ensure_class(class_id).cache_masks.insert(socket, mask);
    }

    pub(crate) fn set_bandwidth(
        &mut self,
        class_id: ClassId,
        socket: SocketIndex,
        limit: BandwidthLimit,
    ) {
        self.ensure_class(class_id).bandwidth.insert(socket, limit);
    }

    pub(crate) fn bind_core(&mut self, core_id: LogicalCoreId, class_id: ClassId) {
        if let Some(previous) = self.core_bindings.insert(core_id, class_id) {
            if let Some(class) = self.classes.get_mut(&previous) {
                class.bound_cores.remove(&core_id);
            }
        }
        self.ensure_class(class_id).bound_cores.insert(core_id);
    }

    pub(crate) fn bind_task(&mut self, task_id: TaskId, class_id: ClassId) {
        if let Some(previous) = self.task_bindings.insert(task_id, class_id) {
            if let Some(class) = self.classes.get_mut(&previous) {
                class.bound_tasks.remove(&task_id);
            }
        }
        self.ensure_class(class_id).bound_tasks.insert(task_id);
    }

    pub(crate) fn release_cores(&mut self, core_ids: &[LogicalCoreId]) {
        for &core_id in core_ids {
            self.bind_core(core_id, ClassId::DEFAULT);
        }
    }

    pub(crate) fn core_class(&self, core_id: LogicalCoreId) -> ClassId {
        self.core_bindings
            .get(&core_id)
            .copied()
            .unwrap_or(ClassId::DEFAULT)
    }

    pub(crate) fn task_class(&self, task_id: TaskId) -> ClassId {
        self.task_bindings
            .get(&task_id)
            .copied()
            .unwrap_or(ClassId::DEFAULT)
    }

    /// Forgets a non-default class, its cores and tasks fall back to the
    /// default class.
    pub(crate) fn remove_class(&mut self, class_id: ClassId) -> Option<ClassOfService> {
        if class_id.is_default() {
            return None;
        }

        let class = self.classes.remove(&class_id)?;
        let cores = class.bound_cores.iter().copied().collect::<Vec<_>>();
        self.release_cores(&cores);
        for &task_id in &class.bound_tasks {
            self.bind_task(task_id, ClassId::DEFAULT);
        }

        Some(class)
    }

    /// Drops every class except an empty default one.
    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core(id: u32) -> LogicalCoreId {
        LogicalCoreId::new(id)
    }

    #[test]
    fn rebinding_moves_core_between_classes() {
        let mut store = ClassStore::new();
        let first = ClassId::new(1);
        let second = ClassId::new(2);

        store.bind_core(core(3), first);
        store.bind_core(core(3), second);

        assert_eq!(store.core_class(core(3)), second);
        assert!(store.class(first).unwrap().bound_cores.is_empty());
        assert!(store.class(second).unwrap().bound_cores.contains(&core(3)));
    }

    #[test]
    fn removed_class_returns_subjects_to_default() {
        let mut store = ClassStore::new();
        let class_id = ClassId::new(2);
        store.bind_core(core(1), class_id);
        store.bind_task(TaskId::new(42), class_id);
        store.set_cache_mask(class_id, SocketIndex::new(0), 0xF);

        let removed = store.remove_class(class_id).unwrap();

        assert_eq!(removed.cache_masks.get(&SocketIndex::new(0)), Some(&0xF));
        assert!(store.class(class_id).is_none());
        assert_eq!(store.core_class(core(1)), ClassId::DEFAULT);
        assert_eq!(store.task_class(TaskId::new(42)), ClassId::DEFAULT);
        let default = store.class(ClassId::DEFAULT).unwrap();
        assert!(default.bound_cores.contains(&core(1)));
        assert!(default.bound_tasks.contains(&TaskId::new(42)));
    }

    #[test]
    fn default_class_is_never_removed() {
        let mut store = ClassStore::new();
        assert!(store.remove_class(ClassId::DEFAULT).is_none());
        assert!(store.class(ClassId::DEFAULT).is_some());
    }
}
