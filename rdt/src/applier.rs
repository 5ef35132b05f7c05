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

use rdt_shared::backend::L3caRecord;
use rdt_shared::backend::MbaRecord;
use rdt_shared::backend::RdtBackend;
use rdt_shared::types::BandwidthMode;
use rdt_shared::types::ClassId;
use rdt_shared::types::SocketIndex;

use crate::capability::CapabilitySnapshot;
use crate::class_store::BandwidthLimit;
use crate::class_store::ClassStore;
use crate::errors::Operation;
use crate::errors::ValidationError;
use crate::RdtError;
use crate::RdtResult;

const MAX_PERCENTAGE: u32 = 100;

/// Bandwidth programmed on one socket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppliedBandwidth {
    pub socket: SocketIndex,
    pub requested: u32,
    pub actual: u32,
}

/// Pushes class settings to the backend socket by socket and mirrors every
/// accepted socket into the store.
pub(crate) struct AllocationApplier<'state, B: ?Sized> {
    backend: &'state mut B,
    snapshot: &'state CapabilitySnapshot,
    store: &'state mut ClassStore,
}

impl<'state, B: RdtBackend + ?Sized> AllocationApplier<'state, B> {
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

    pub(crate) fn apply_cache(
        &mut self,
        class_id: ClassId,
        masks: &[(SocketIndex, u64)],
    ) -> RdtResult<()> {
        self.snapshot.check_l3ca_class(class_id)?;
        let targets = masks
            .iter()
            .map(|&(socket, mask)| -> RdtResult<_> {
                self.snapshot.check_mask(mask)?;
                let l3ca_id = self.snapshot.l3ca_id(socket)?;
                Ok((socket, l3ca_id, mask))
            })
            .collect::<RdtResult<Vec<_>>>()?;

        for (applied, (socket, l3ca_id, ways_mask)) in targets.into_iter().enumerate() {
            let record = L3caRecord {
                class_id,
                ways_mask,
            };
            tracing::debug!(
                "class {class_id}: cache mask {ways_mask:#x} on socket {socket} (L3CA id {l3ca_id})"
            );

            if let Err(error) = self.backend.set_l3ca(l3ca_id, &record) {
                warn_partial(Operation::SetL3ca, class_id, applied, socket);
                return Err(RdtError::backend_rejected(Operation::SetL3ca, applied, error));
            }
            self.store.set_cache_mask(class_id, socket, ways_mask);
        }

        Ok(())
    }

    pub(crate) fn apply_bandwidth(
        &mut self,
        class_id: ClassId,
        mode: BandwidthMode,
        limits: &[(SocketIndex, u32)],
    ) -> RdtResult<Vec<AppliedBandwidth>> {
        self.snapshot.check_mba_class(class_id)?;
        if !mode.is_supported() {
            return Err(ValidationError::UnsupportedRequestedMode.into());
        }
        let targets = limits
            .iter()
            .map(|&(socket, value)| -> RdtResult<_> {
                check_limit(mode, socket, value)?;
                let mba_id = self.snapshot.mba_id(socket)?;
                Ok((socket, mba_id, value))
            })
            .collect::<RdtResult<Vec<_>>>()?;

        let ctrl = matches!(mode, BandwidthMode::AbsoluteRate);
        let mut programmed = Vec::with_capacity(targets.len());
        for (applied, (socket, mba_id, requested)) in targets.into_iter().enumerate() {
            let record = MbaRecord {
                class_id,
                mb_max: requested,
                ctrl,
            };
            tracing::debug!(
                "class {class_id}: bandwidth {requested} ({mode:?}) on socket {socket} (MBA id {mba_id})"
            );

            let actual = match self.backend.set_mba(mba_id, &record) {
                Ok(actual) => actual,
                Err(error) => {
                    warn_partial(Operation::SetMba, class_id, applied, socket);
                    return Err(RdtError::backend_rejected(Operation::SetMba, applied, error));
                }
            };
            if actual.mb_max != requested {
                tracing::debug!(
                    "class {class_id}: socket {socket} bandwidth adjusted from {requested} to {}",
                    actual.mb_max
                );
            }

            let limit = BandwidthLimit {
                requested,
                actual: actual.mb_max,
                mode,
            };
            self.store.set_bandwidth(class_id, socket, limit);
            programmed.push(AppliedBandwidth {
                socket,
                requested,
                actual: actual.mb_max,
            });
        }

        Ok(programmed)
    }
}

fn check_limit(mode: BandwidthMode, socket: SocketIndex, value: u32) -> RdtResult<()> {
    let in_range = match mode {
        BandwidthMode::Percentage => (1..=MAX_PERCENTAGE).contains(&value),
        _ => value > 0,
    };
    if !in_range {
        return Err(ValidationError::BandwidthOutOfRange { socket, value }.into());
    }

    Ok(())
}

fn warn_partial(operation: Operation, class_id: ClassId, applied: usize, socket: SocketIndex) {
    if applied > 0 {
        tracing::warn!(
            "class {class_id}: {operation} failed on socket {socket}, {applied} earlier socket(s) stay applied"
        );
    }
}
