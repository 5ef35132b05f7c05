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

use rdt_shared::backend::Capability;
use rdt_shared::backend::L3caInfo;
use rdt_shared::backend::MbaCtrlFlag;
use rdt_shared::backend::MbaInfo;

/// What a [`crate::StubBackend`] reports about the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StubPlatform {
    pub capabilities: Vec<Capability>,
    pub l3ca_ids: Vec<u32>,
    pub mba_ids: Vec<u32>,
    pub cache_ways: u32,
    /// Percentage limits are rounded down to a multiple of it.
    pub mba_granularity: u32,
    /// Absolute rate limits are clamped to it.
    pub max_rate: u32,
}

impl StubPlatform {
    pub fn l3ca_slot_count(&self) -> u32 {
        self.capabilities
            .iter()
            .find_map(|capability| match capability {
                Capability::L3ca(Some(info)) => Some(info.num_classes),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub fn mba_info(&self) -> Option<MbaInfo> {
        self.capabilities.iter().find_map(|capability| match capability {
            Capability::Mba(Some(info)) => Some(*info),
            _ => None,
        })
    }
}

impl Default for StubPlatform {
    fn default() -> Self {
        generate_platform(2, 20, 4, Some(MbaCtrlFlag::Off))
    }
}

pub fn generate_platform(
    sockets: u32,
    cache_ways: u32,
    slot_count: u32,
    mba_ctrl: Option<MbaCtrlFlag>,
) -> StubPlatform {
    let mut capabilities = vec![
        Capability::L3ca(Some(L3caInfo {
            num_classes: slot_count,
            num_ways: cache_ways,
            cdp_enabled: false,
        })),
        Capability::Monitoring,
    ];
    let mba_ids = match mba_ctrl {
        Some(ctrl) => {
            capabilities.push(Capability::Mba(Some(MbaInfo {
                num_classes: slot_count,
                ctrl,
            })));
            (0..sockets).collect()
        }
        None => Vec::new(),
    };

    StubPlatform {
        capabilities,
        l3ca_ids: (0..sockets).collect(),
        mba_ids,
        cache_ways,
        mba_granularity: 10,
        max_rate: 10_000,
    }
}

/// 2 sockets, 20 cache ways, 4 classes, percentage bandwidth control.
pub fn two_socket_platform() -> StubPlatform {
    StubPlatform::default()
}

/// Same as [`two_socket_platform`] but backend ids differ from socket indices.
pub fn remapped_socket_platform() -> StubPlatform {
    StubPlatform {
        l3ca_ids: vec![3, 7],
        mba_ids: vec![5, 9],
        ..two_socket_platform()
    }
}

pub fn platform_without_mba() -> StubPlatform {
    generate_platform(2, 20, 4, None)
}

pub fn absolute_rate_platform() -> StubPlatform {
    generate_platform(2, 20, 4, Some(MbaCtrlFlag::On))
}

/// Only the default class exists, nothing could be acquired.
pub fn single_class_platform() -> StubPlatform {
    generate_platform(1, 11, 1, Some(MbaCtrlFlag::Off))
}
