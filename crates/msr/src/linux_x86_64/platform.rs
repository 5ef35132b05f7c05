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

use once_cell::sync::Lazy;
use raw_cpuid::CpuId;

/// Allocation features of the CPU this process runs on, `None` without L3 CAT.
pub static MSR_PLATFORM: Lazy<Option<MsrPlatform>> = Lazy::new(MsrPlatform::detect);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MsrPlatform {
    pub cache_ways: u32,
    pub l3ca_classes: u32,
    pub mba: Option<MsrMbaInfo>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MsrMbaInfo {
    pub classes: u32,
    pub max_delay: u32,
}

impl MsrPlatform {
    pub fn detect() -> Option<Self> {
        let cpuid = CpuId::new();
        let Some(rdt_info) = cpuid.get_rdt_allocation_info() else {
            tracing::debug!("CPU doesn't report RDT allocation");
            return None;
        };
        let Some(l3_cat) = rdt_info.l3_cat() else {
            tracing::debug!("CPU doesn't support L3 cache allocation");
            return None;
        };

        let mba = rdt_info
            .memory_bandwidth_allocation()
            .map(|mba| MsrMbaInfo {
                classes: mba.highest_cos() as u32 + 1,
                max_delay: mba.max_hba_throttling() as u32,
            });

        let platform = Self {
            cache_ways: l3_cat.capacity_mask_length() as u32,
            l3ca_classes: l3_cat.highest_cos() as u32 + 1,
            mba,
        };
        tracing::debug!("detected MSR platform {platform:?}");

        Some(platform)
    }

    pub fn full_mask(&self) -> u64 {
        if self.cache_ways >= u64::BITS {
            u64::MAX
        } else {
            (1u64 << self.cache_ways) - 1
        }
    }

    pub fn class_count(&self) -> u32 {
        let mba_classes = self.mba.map_or(0, |mba| mba.classes);
        self.l3ca_classes.max(mba_classes)
    }
}
