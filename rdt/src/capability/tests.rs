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
use rdt_shared::backend::Capability;
use rdt_shared::backend::L3caInfo;
use rdt_shared::backend::MbaCtrlFlag;
use rdt_shared::backend::MbaInfo;
use rdt_shared::backend::RdtBackend;
use rdt_shared::types::BandwidthMode;
use rdt_shared::types::ClassId;
use rdt_shared::types::SocketIndex;
use rdt_test_utils::*;
use test_log::test;

use super::*;
use crate::RdtError;

fn query(platform: StubPlatform) -> RdtResult<CapabilitySnapshot> {
    let mut backend = StubBackend::new(platform);
    backend.init(&BackendConfig::default()).unwrap();
    query_snapshot(&backend)
}

fn replace_mba(platform: &mut StubPlatform, mba: Capability) {
    platform.capabilities.retain(|capability| !capability.is_mba());
    platform.capabilities.push(mba);
}

#[test]
fn two_socket_snapshot() {
    let snapshot = query(two_socket_platform()).unwrap();

    let expected = CapabilitySnapshot {
        l3ca_ids: vec![0, 1],
        mba_ids: vec![0, 1],
        cache_ways: 20,
        l3ca_slot_count: 4,
        mba_slot_count: 4,
        bandwidth_mode: BandwidthMode::Percentage,
        cdp_enabled: false,
    };
    assert_eq!(snapshot, expected);
    assert_eq!(snapshot.socket_count(), 2);
    assert_eq!(snapshot.full_mask(), 0xFFFFF);
}

#[test]
fn missing_mba_means_unsupported_bandwidth() {
    let snapshot = query(platform_without_mba()).unwrap();

    assert_eq!(snapshot.bandwidth_mode, BandwidthMode::Unsupported);
    assert_eq!(snapshot.mba_slot_count, 0);
    assert!(snapshot.mba_ids.is_empty());
}

#[test]
fn mba_ctrl_selects_absolute_rate() {
    let snapshot = query(absolute_rate_platform()).unwrap();
    assert_eq!(snapshot.bandwidth_mode, BandwidthMode::AbsoluteRate);
}

#[test]
fn unknown_mba_ctrl_is_capability_error() {
    let mut platform = two_socket_platform();
    let mba = Capability::Mba(Some(MbaInfo {
        num_classes: 4,
        ctrl: MbaCtrlFlag::Unknown(7),
    }));
    replace_mba(&mut platform, mba);

    let result = query(platform);
    assert!(matches!(
        result,
        Err(RdtError::Capability(CapabilityError::UnknownMbaCtrl(7)))
    ));
}

#[test]
fn capability_without_details_is_capability_error() {
    let mut platform = two_socket_platform();
    replace_mba(&mut platform, Capability::Mba(None));
    let result = query(platform);
    assert!(matches!(
        result,
        Err(RdtError::Capability(CapabilityError::EmptyCapability {
            technology: "MBA"
        }))
    ));

    let mut platform = two_socket_platform();
    platform.capabilities[0] = Capability::L3ca(None);
    let result = query(platform);
    assert!(matches!(
        result,
        Err(RdtError::Capability(CapabilityError::EmptyCapability {
            technology: "L3CA"
        }))
    ));
}

#[test]
fn missing_l3ca_is_capability_error() {
    let mut platform = two_socket_platform();
    platform.capabilities.retain(|capability| !capability.is_l3ca());

    let result = query(platform);
    assert!(matches!(
        result,
        Err(RdtError::Capability(CapabilityError::L3caMissing))
    ));
}

#[test]
fn empty_cache_id_table_is_capability_error() {
    let mut platform = two_socket_platform();
    platform.l3ca_ids.clear();

    let result = query(platform);
    assert!(matches!(
        result,
        Err(RdtError::Capability(CapabilityError::EmptyIdTable { .. }))
    ));
}

#[test]
fn empty_bandwidth_id_table_is_capability_error() {
    let platform = StubPlatform {
        mba_ids: vec![],
        ..two_socket_platform()
    };

    let result = query(platform);
    assert!(matches!(
        result,
        Err(RdtError::Capability(CapabilityError::EmptyIdTable {
            technology: "MBA"
        }))
    ));
}

#[test]
fn bandwidth_ids_are_not_needed_without_mba() {
    let platform = StubPlatform {
        mba_ids: vec![],
        ..platform_without_mba()
    };

    let snapshot = query(platform).unwrap();
    assert!(snapshot.mba_ids.is_empty());
    assert_eq!(snapshot.bandwidth_mode, BandwidthMode::Unsupported);
}

#[test]
fn failed_query_is_reported_with_its_source() {
    let mut backend = StubBackend::new(two_socket_platform());
    backend.init(&BackendConfig::default()).unwrap();
    backend.fail_capabilities();

    let result = query_snapshot(&backend);
    assert!(matches!(
        result,
        Err(RdtError::Capability(CapabilityError::QueryFailed {
            what: "capabilities",
            ..
        }))
    ));
}

#[test]
fn cdp_flag_is_taken_from_l3ca() {
    let mut platform = two_socket_platform();
    platform.capabilities[0] = Capability::L3ca(Some(L3caInfo {
        num_classes: 8,
        num_ways: 11,
        cdp_enabled: true,
    }));

    let snapshot = query(platform).unwrap();
    assert!(snapshot.cdp_enabled);
    assert_eq!(snapshot.l3ca_slot_count, 8);
}

#[test]
fn socket_and_class_checks() {
    let snapshot = query(remapped_socket_platform()).unwrap();

    assert_eq!(snapshot.l3ca_id(SocketIndex::new(1)).unwrap(), 7);
    assert_eq!(snapshot.mba_id(SocketIndex::new(0)).unwrap(), 5);
    assert!(snapshot.l3ca_id(SocketIndex::new(2)).unwrap_err().is_validation());

    assert!(snapshot.check_l3ca_class(ClassId::new(3)).is_ok());
    assert!(snapshot.check_l3ca_class(ClassId::new(4)).unwrap_err().is_capability());
    assert!(snapshot.check_mask(0xFFFFF).is_ok());
    assert!(snapshot.check_mask(0x100000).unwrap_err().is_validation());
}

#[test]
fn registry_requires_refresh() {
    let mut backend = StubBackend::new(two_socket_platform());
    let mut registry = CapabilityRegistry::new();
    assert!(matches!(
        registry.snapshot(),
        Err(RdtError::Capability(CapabilityError::NotInitialized))
    ));

    backend.init(&BackendConfig::default()).unwrap();
    registry.refresh(&backend).unwrap();
    assert!(registry.is_initialized());

    registry.clear();
    assert!(!registry.is_initialized());
}
