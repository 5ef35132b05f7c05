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

use rdt_shared::backend::BackendConfig;
use rdt_shared::backend::CdpConfig;
use rdt_shared::backend::Interface;
use rdt_shared::backend::MbaConfig;
use rdt_shared::types::BandwidthResetMode;
use rdt_shared::types::ClassId;
use rdt_shared::types::LogicalCoreId;
use rdt_shared::types::SocketIndex;
use rdt_shared::types::TaskId;
use rdt_test_utils::*;
use test_log::test;

use super::*;

struct Fixture {
    backend: StubBackend,
    registry: CapabilityRegistry,
    store: ClassStore,
}

impl Fixture {
    fn new(platform: StubPlatform) -> Self {
        Self {
            backend: StubBackend::new(platform),
            registry: CapabilityRegistry::new(),
            store: ClassStore::new(),
        }
    }

    fn initialized(platform: StubPlatform) -> Self {
        let mut fixture = Self::new(platform);
        fixture.lifecycle().init(&BackendConfig::default()).unwrap();
        fixture
    }

    fn lifecycle(&mut self) -> LifecycleController<'_, StubBackend> {
        LifecycleController::new(&mut self.backend, &mut self.registry, &mut self.store)
    }

    fn free_class_count(&self) -> u32 {
        free_class_count(&self.backend, &self.registry, &self.store).unwrap()
    }
}

fn core(id: u32) -> LogicalCoreId {
    LogicalCoreId::new(id)
}

#[test]
fn init_passes_config_and_caches_snapshot() {
    let mut fixture = Fixture::new(two_socket_platform());
    let config = BackendConfig::with_interface(Interface::Msr);

    fixture.lifecycle().init(&config).unwrap();

    assert!(fixture.registry.is_initialized());
    let last_config = fixture.backend.with_state(|state| state.last_config);
    assert_eq!(last_config, Some(config));
}

#[test]
fn second_init_is_rejected() {
    let mut fixture = Fixture::initialized(two_socket_platform());

    let result = fixture.lifecycle().init(&BackendConfig::default());

    assert!(matches!(
        result,
        Err(RdtError::Validation(ValidationError::AlreadyInitialized))
    ));
    assert_eq!(fixture.backend.calls().init, 1);
}

#[test]
fn failed_init_shuts_backend_down() {
    let mut fixture = Fixture::new(two_socket_platform());
    fixture.backend.fail_init();
    fixture.backend.fail_shutdown();

    let result = fixture.lifecycle().init(&BackendConfig::default());

    assert!(matches!(
        result,
        Err(RdtError::BackendRejected {
            operation: Operation::Init,
            ..
        })
    ));
    assert_eq!(fixture.backend.calls().shutdown, 1);
    assert!(!fixture.registry.is_initialized());
}

#[test]
fn failed_discovery_shuts_backend_down() {
    let mut fixture = Fixture::new(two_socket_platform());
    fixture.backend.fail_capabilities();

    let result = fixture.lifecycle().init(&BackendConfig::default());

    assert!(matches!(
        result,
        Err(RdtError::Capability(CapabilityError::QueryFailed { .. }))
    ));
    assert_eq!(fixture.backend.calls().shutdown, 1);
    assert!(!fixture.registry.is_initialized());
}

#[test]
fn shutdown_requires_init() {
    let mut fixture = Fixture::new(two_socket_platform());

    let result = fixture.lifecycle().shutdown();

    assert!(matches!(
        result,
        Err(RdtError::Capability(CapabilityError::NotInitialized))
    ));
    assert_eq!(fixture.backend.calls().shutdown, 0);
}

#[test]
fn shutdown_drops_state() {
    let mut fixture = Fixture::initialized(two_socket_platform());
    fixture.lifecycle().acquire_class(&[core(1)]).unwrap();

    fixture.lifecycle().shutdown().unwrap();

    assert!(!fixture.registry.is_initialized());
    assert_eq!(fixture.store.core_class(core(1)), ClassId::DEFAULT);
    assert!(fixture.lifecycle().shutdown().is_err());
}

#[test]
fn reset_clears_store_and_passes_modes() {
    let mut fixture = Fixture::initialized(two_socket_platform());
    let class_id = fixture.lifecycle().acquire_class(&[core(1)]).unwrap();
    fixture
        .store
        .set_cache_mask(class_id, SocketIndex::new(0), 0x3);

    fixture
        .lifecycle()
        .reset_to_defaults(BandwidthResetMode::AbsoluteRate)
        .unwrap();

    assert!(fixture.store.class(class_id).is_none());
    assert_eq!(fixture.store.core_class(core(1)), ClassId::DEFAULT);
    let last_reset = fixture.backend.with_state(|state| state.last_reset);
    assert_eq!(
        last_reset,
        Some((CdpConfig::Any, CdpConfig::Any, MbaConfig::Ctrl))
    );
    assert_eq!(fixture.backend.calls().capabilities, 2);
}

#[test]
fn acquire_binds_cores_to_first_free_class() {
    let mut fixture = Fixture::initialized(two_socket_platform());

    let first = fixture.lifecycle().acquire_class(&[core(1), core(2)]).unwrap();
    let second = fixture.lifecycle().acquire_class(&[core(3)]).unwrap();

    assert_eq!(first, ClassId::new(1));
    assert_eq!(second, ClassId::new(2));
    assert_eq!(fixture.store.core_class(core(2)), first);
    assert_eq!(fixture.backend.core_class(core(3)), second);
    assert_eq!(fixture.free_class_count(), 1);
}

#[test]
fn acquire_without_free_class_changes_nothing() {
    let mut fixture = Fixture::initialized(single_class_platform());

    let result = fixture.lifecycle().acquire_class(&[core(5)]);

    assert!(matches!(result, Err(RdtError::CapacityExhausted { .. })));
    assert_eq!(fixture.store.core_class(core(5)), ClassId::DEFAULT);
    assert_eq!(fixture.backend.core_class(core(5)), ClassId::DEFAULT);
}

#[test]
fn acquire_of_no_cores_is_rejected() {
    let mut fixture = Fixture::initialized(two_socket_platform());

    let result = fixture.lifecycle().acquire_class(&[]);

    assert!(matches!(
        result,
        Err(RdtError::Validation(ValidationError::EmptyCoreList))
    ));
    assert_eq!(fixture.backend.calls().assign, 0);
}

#[test]
fn release_class_returns_subjects_to_default() {
    let mut fixture = Fixture::initialized(two_socket_platform());
    let class_id = fixture.lifecycle().acquire_class(&[core(1), core(2)]).unwrap();
    fixture.store.bind_task(TaskId::new(77), class_id);

    fixture.lifecycle().release_class(class_id).unwrap();

    assert!(fixture.store.class(class_id).is_none());
    assert_eq!(fixture.backend.core_class(core(1)), ClassId::DEFAULT);
    assert_eq!(fixture.backend.task_class(TaskId::new(77)), ClassId::DEFAULT);
    assert_eq!(fixture.free_class_count(), 3);
}

#[test]
fn release_class_frees_cores_bound_by_another_controller() {
    let backend = StubBackend::new(two_socket_platform());
    backend.preset_core(core(5), ClassId::new(2));
    let mut fixture = Fixture {
        backend,
        ..Fixture::new(two_socket_platform())
    };
    fixture.lifecycle().init(&BackendConfig::default()).unwrap();
    assert_eq!(fixture.free_class_count(), 2);

    fixture.lifecycle().release_class(ClassId::new(2)).unwrap();

    assert_eq!(fixture.backend.core_class(core(5)), ClassId::DEFAULT);
    assert_eq!(fixture.backend.calls().release_cores, 1);
    assert_eq!(fixture.store.core_class(core(5)), ClassId::DEFAULT);
    assert_eq!(fixture.free_class_count(), 3);
}

#[test]
fn release_of_unused_class_makes_no_changes() {
    let mut fixture = Fixture::initialized(two_socket_platform());

    fixture.lifecycle().release_class(ClassId::new(3)).unwrap();

    assert_eq!(fixture.backend.calls().class_cores, 1);
    assert_eq!(fixture.backend.calls().mutations(), 0);
}

#[test]
fn default_class_cant_be_released() {
    let mut fixture = Fixture::initialized(two_socket_platform());

    let result = fixture.lifecycle().release_class(ClassId::DEFAULT);

    assert!(matches!(
        result,
        Err(RdtError::Validation(ValidationError::DefaultClassReserved))
    ));
}

#[test]
fn free_count_without_mba_uses_l3ca_slots() {
    let fixture = Fixture::initialized(platform_without_mba());

    assert_eq!(fixture.free_class_count(), 3);
}
