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

use serde::Serialize;

use rdt_shared::backend::Capability;
use rdt_shared::backend::MbaCtrlFlag;
use rdt_shared::backend::RdtBackend;
use rdt_shared::types::BandwidthMode;
use rdt_shared::types::ClassId;
use rdt_shared::types::SocketIndex;

use crate::errors::CapabilityError;
use crate::errors::ValidationError;
use crate::RdtResult;

const MAX_CACHE_WAYS: u32 = u64::BITS;

/// Static platform facts, queried once on init and replaced only by a reset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CapabilitySnapshot {
    /// Backend cache allocation ids, indexed by socket.
    pub l3ca_ids: Vec<u32>,
    /// Backend bandwidth allocation ids, indexed by socket.
    pub mba_ids: Vec<u32>,
    pub cache_ways: u32,
    pub l3ca_slot_count: u32,
    pub mba_slot_count: u32,
    pub bandwidth_mode: BandwidthMode,
    pub cdp_enabled: bool,
}

impl CapabilitySnapshot {
    pub fn socket_count(&self) -> usize {
        self.l3ca_ids.len()
    }

    /// Number of class ids cores and tasks could be associated with.
    pub fn class_count(&self) -> u32 {
        self.l3ca_slot_count.max(self.mba_slot_count)
    }

    /// Mask granting every cache way.
    pub fn full_mask(&self) -> u64 {
        if self.cache_ways >= MAX_CACHE_WAYS {
            u64::MAX
        } else {
            (1u64 << self.cache_ways) - 1
        }
    }

    pub(crate) fn l3ca_id(&self, socket: SocketIndex) -> RdtResult<u32> {
        lookup_id(&self.l3ca_ids, socket)
    }

    pub(crate) fn mba_id(&self, socket: SocketIndex) -> RdtResult<u32> {
        lookup_id(&self.mba_ids, socket)
    }

    pub(crate) fn check_mask(&self, mask: u64) -> RdtResult<()> {
        if mask & !self.full_mask() != 0 {
            return Err(ValidationError::MaskOutOfRange {
                mask,
                cache_ways: self.cache_ways,
            }
            .into());
        }

        Ok(())
    }

    pub(crate) fn check_l3ca_class(&self, class_id: ClassId) -> RdtResult<()> {
        check_slot(class_id, self.l3ca_slot_count, "L3CA")
    }

    pub(crate) fn check_mba_class(&self, class_id: ClassId) -> RdtResult<()> {
        if !self.bandwidth_mode.is_supported() {
            return Err(CapabilityError::BandwidthUnsupported.into());
        }
        check_slot(class_id, self.mba_slot_count, "MBA")
    }

    pub(crate) fn check_class(&self, class_id: ClassId) -> RdtResult<()> {
        check_slot(class_id, self.class_count(), "association")
    }
}

fn lookup_id(ids: &[u32], socket: SocketIndex) -> RdtResult<u32> {
    ids.get(usize::from(socket)).copied().ok_or_else(|| {
        ValidationError::SocketIndexOutOfRange {
            socket,
            socket_count: ids.len(),
        }
        .into()
    })
}

fn check_slot(class_id: ClassId, slot_count: u32, technology: &'static str) -> RdtResult<()> {
    if class_id.get() >= slot_count {
        return Err(CapabilityError::class_id_out_of_range(class_id, slot_count, technology).into());
    }

    Ok(())
}

/// Owns the cached snapshot, `None` until the platform is initialized.
#[derive(Debug, Default)]
pub(crate) struct CapabilityRegistry {
    snapshot: Option<CapabilitySnapshot>,
}

impl CapabilityRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.snapshot.is_some()
    }

    pub(crate) fn snapshot(&self) -> RdtResult<&CapabilitySnapshot> {
        self.snapshot
            .as_ref()
            .ok_or_else(|| CapabilityError::NotInitialized.into())
    }

    /// Queries the backend and replaces the cached snapshot wholesale.
    /// The previous snapshot is kept if the query fails.
    pub(crate) fn refresh<B: RdtBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> RdtResult<&CapabilitySnapshot> {
        let snapshot = query_snapshot(backend)?;
        tracing::info!(
            "platform has {} socket(s), {} cache ways, {} L3CA and {} MBA class(es), bandwidth mode {:?}",
            snapshot.socket_count(),
            snapshot.cache_ways,
            snapshot.l3ca_slot_count,
            snapshot.mba_slot_count,
            snapshot.bandwidth_mode,
        );

        Ok(self.snapshot.insert(snapshot))
    }

    pub(crate) fn clear(&mut self) {
        self.snapshot = None;
    }
}

pub(crate) fn query_snapshot<B: RdtBackend + ?Sized>(backend: &B) -> RdtResult<CapabilitySnapshot> {
    let capabilities = backend
        .capabilities()
        .map_err(|error| CapabilityError::query_failed("capabilities", error))?;

    let l3ca = capabilities
        .iter()
        .find(|capability| capability.is_l3ca())
        .ok_or(CapabilityError::L3caMissing)?;
    let l3ca = match l3ca {
        Capability::L3ca(Some(info)) => *info,
        _ => {
            return Err(CapabilityError::EmptyCapability { technology: "L3CA" }.into());
        }
    };

    let mba = capabilities.iter().find(|capability| capability.is_mba());
    let (bandwidth_mode, mba_slot_count) = match mba {
        None => (BandwidthMode::Unsupported, 0),
        Some(Capability::Mba(Some(info))) => (bandwidth_mode(info.ctrl)?, info.num_classes),
        Some(_) => {
            return Err(CapabilityError::EmptyCapability { technology: "MBA" }.into());
        }
    };

    let l3ca_ids = backend
        .l3ca_ids()
        .map_err(|error| CapabilityError::query_failed("L3CA ids", error))?;
    if l3ca_ids.is_empty() {
        return Err(CapabilityError::EmptyIdTable { technology: "L3CA" }.into());
    }

    let mba_ids = if bandwidth_mode.is_supported() {
        let mba_ids = backend
            .mba_ids()
            .map_err(|error| CapabilityError::query_failed("MBA ids", error))?;
        if mba_ids.is_empty() {
            return Err(CapabilityError::EmptyIdTable { technology: "MBA" }.into());
        }
        mba_ids
    } else {
        Vec::new()
    };

    let cache_ways = backend
        .l3_num_ways()
        .map_err(|error| CapabilityError::query_failed("L3 cache ways", error))?;
    if cache_ways == 0 || cache_ways > MAX_CACHE_WAYS {
        return Err(CapabilityError::InvalidCacheWays(cache_ways).into());
    }

    let snapshot = CapabilitySnapshot {
        l3ca_ids,
        mba_ids,
        cache_ways,
        l3ca_slot_count: l3ca.num_classes,
        mba_slot_count,
        bandwidth_mode,
        cdp_enabled: l3ca.cdp_enabled,
    };

    Ok(snapshot)
}

fn bandwidth_mode(ctrl: MbaCtrlFlag) -> Result<BandwidthMode, CapabilityError> {
    match ctrl {
        MbaCtrlFlag::Off => Ok(BandwidthMode::Percentage),
        MbaCtrlFlag::On => Ok(BandwidthMode::AbsoluteRate),
        MbaCtrlFlag::Unknown(value) => Err(CapabilityError::UnknownMbaCtrl(value)),
    }
}
