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
use rdt_shared::backend::RdtBackend;
use rdt_shared::types::BandwidthMode;
use rdt_shared::types::ClassId;
use rdt_shared::types::SocketIndex;
use rdt_test_utils::*;
use test_log::test;

use super::*;
use crate::capability::query_snapshot;
use crate::errors::CapabilityError;

struct Fixture {
    backend: StubBackend,
    snapshot: CapabilitySnapshot,
    store: ClassStore,
}

impl Fixture {
    fn new(platform: StubPlatform) -> Self {
        let mut backend = StubBackend::new(platform);
        backend.init(&BackendConfig::default()).unwrap();
        let snapshot = query_snapshot(&backend).unwrap();

        Self {
            backend,
            snapshot,
            store: ClassStore::new(),
        }
    }

    fn applier(&mut self) -> AllocationApplier<'_, StubBackend> {
        AllocationApplier::new(&mut self.backend, &self.snapshot, &mut self.store)
    }
}

fn socket(index: u32) -> SocketIndex {
    SocketIndex::new(index)
}

#[test]
fn cache_masks_go_to_mapped_ids() {
    let mut fixture = Fixture::new(remapped_socket_platform());
    let class_id = ClassId::new(2);

    fixture
        .applier()
        .apply_cache(class_id, &[(socket(0), 0xF), (socket(1), 0xF0)])
        .unwrap();

    assert_eq!(fixture.backend.l3ca_mask(3, class_id), Some(0xF));
    assert_eq!(fixture.backend.l3ca_mask(7, class_id), Some(0xF0));
    assert_eq!(fixture.backend.l3ca_mask(0, class_id), None);
    let class = fixture.store.class(class_id).unwrap();
    assert_eq!(class.cache_masks.get(&socket(1)), Some(&0xF0));
}

#[test]
fn cache_apply_stops_at_first_rejection() {
    let mut fixture = Fixture::new(two_socket_platform());
    fixture.backend.fail_l3ca_id(1);
    let class_id = ClassId::new(1);

    let result = fixture
        .applier()
        .apply_cache(class_id, &[(socket(0), 0x3), (socket(1), 0x3), (socket(0), 0xC)]);

    match result {
        Err(RdtError::BackendRejected {
            operation, applied, ..
        }) => {
            assert_eq!(operation, Operation::SetL3ca);
            assert_eq!(applied, 1);
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(fixture.backend.calls().set_l3ca, 2);
    assert_eq!(fixture.backend.l3ca_mask(0, class_id), Some(0x3));
    let class = fixture.store.class(class_id).unwrap();
    assert_eq!(class.cache_masks.get(&socket(0)), Some(&0x3));
    assert_eq!(class.cache_masks.get(&socket(1)), None);
}

#[test]
fn invalid_cache_request_never_reaches_backend() {
    let mut fixture = Fixture::new(two_socket_platform());

    let out_of_ways = fixture
        .applier()
        .apply_cache(ClassId::new(1), &[(socket(0), 0xF), (socket(1), 1 << 20)]);
    assert!(matches!(
        out_of_ways,
        Err(RdtError::Validation(ValidationError::MaskOutOfRange { .. }))
    ));

    let bad_socket = fixture
        .applier()
        .apply_cache(ClassId::new(1), &[(socket(2), 0xF)]);
    assert!(matches!(
        bad_socket,
        Err(RdtError::Validation(ValidationError::SocketIndexOutOfRange { .. }))
    ));

    let bad_class = fixture
        .applier()
        .apply_cache(ClassId::new(4), &[(socket(0), 0xF)]);
    assert!(matches!(
        bad_class,
        Err(RdtError::Capability(CapabilityError::ClassIdOutOfRange { .. }))
    ));

    assert_eq!(fixture.backend.calls().mutations(), 0);
}

#[test]
fn bandwidth_reports_requested_and_actual() {
    let mut fixture = Fixture::new(two_socket_platform());
    let class_id = ClassId::new(3);

    let applied = fixture
        .applier()
        .apply_bandwidth(
            class_id,
            BandwidthMode::Percentage,
            &[(socket(0), 55), (socket(1), 70)],
        )
        .unwrap();

    let expected = vec![
        AppliedBandwidth {
            socket: socket(0),
            requested: 55,
            actual: 50,
        },
        AppliedBandwidth {
            socket: socket(1),
            requested: 70,
            actual: 70,
        },
    ];
    assert_eq!(applied, expected);

    let limit = fixture.store.class(class_id).unwrap().bandwidth[&socket(0)];
    assert_eq!(
        limit,
        BandwidthLimit {
            requested: 55,
            actual: 50,
            mode: BandwidthMode::Percentage,
        }
    );
}

#[test]
fn bandwidth_goes_to_mapped_ids() {
    let mut fixture = Fixture::new(remapped_socket_platform());
    let class_id = ClassId::new(1);

    fixture
        .applier()
        .apply_bandwidth(class_id, BandwidthMode::Percentage, &[(socket(1), 40)])
        .unwrap();

    let record = fixture.backend.mba_record(9, class_id).unwrap();
    assert_eq!(record.mb_max, 40);
    assert!(!record.ctrl);
}

#[test]
fn bandwidth_on_unsupported_platform_fails() {
    let mut fixture = Fixture::new(platform_without_mba());

    let result = fixture
        .applier()
        .apply_bandwidth(ClassId::new(1), BandwidthMode::Percentage, &[(socket(0), 50)]);

    assert!(matches!(
        result,
        Err(RdtError::Capability(CapabilityError::BandwidthUnsupported))
    ));
    assert_eq!(fixture.backend.calls().set_mba, 0);
}

#[test]
fn bandwidth_validation() {
    let mut fixture = Fixture::new(two_socket_platform());
    let class_id = ClassId::new(1);

    let unsupported_mode = fixture
        .applier()
        .apply_bandwidth(class_id, BandwidthMode::Unsupported, &[(socket(0), 50)]);
    assert!(matches!(
        unsupported_mode,
        Err(RdtError::Validation(ValidationError::UnsupportedRequestedMode))
    ));

    for value in [0, 101] {
        let result = fixture
            .applier()
            .apply_bandwidth(class_id, BandwidthMode::Percentage, &[(socket(0), value)]);
        assert!(matches!(
            result,
            Err(RdtError::Validation(ValidationError::BandwidthOutOfRange { .. }))
        ));
    }

    assert_eq!(fixture.backend.calls().set_mba, 0);
}

#[test]
fn bandwidth_stops_at_first_rejection() {
    let mut fixture = Fixture::new(two_socket_platform());
    fixture.backend.fail_mba_id(0);

    let result = fixture.applier().apply_bandwidth(
        ClassId::new(1),
        BandwidthMode::Percentage,
        &[(socket(0), 50), (socket(1), 50)],
    );

    assert!(matches!(
        result,
        Err(RdtError::BackendRejected { applied: 0, .. })
    ));
    assert_eq!(fixture.backend.calls().set_mba, 1);
    assert!(fixture.store.class(ClassId::new(1)).is_none());
}

#[test]
fn mode_mismatch_is_backend_rejection() {
    let mut fixture = Fixture::new(two_socket_platform());

    let result = fixture.applier().apply_bandwidth(
        ClassId::new(1),
        BandwidthMode::AbsoluteRate,
        &[(socket(0), 2000)],
    );

    assert!(matches!(
        result,
        Err(RdtError::BackendRejected {
            operation: Operation::SetMba,
            ..
        })
    ));
}
