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

use std::collections::HashSet;

use cpu_utils::CPUTopology;
use cpu_utils::Package;

use rdt_shared::backend::BackendConfig;
use rdt_shared::backend::BackendError;
use rdt_shared::backend::BackendResult;
use rdt_shared::backend::Capability;
use rdt_shared::backend::CdpConfig;
use rdt_shared::backend::Interface;
use rdt_shared::backend::L3caInfo;
use rdt_shared::backend::L3caRecord;
use rdt_shared::backend::MbaConfig;
use rdt_shared::backend::MbaCtrlFlag;
use rdt_shared::backend::MbaInfo;
use rdt_shared::backend::MbaRecord;
use rdt_shared::backend::RdtBackend;
use rdt_shared::backend::Technologies;
use rdt_shared::types::ClassId;
use rdt_shared::types::LogicalCoreId;
use rdt_shared::types::TaskId;

use super::platform::MsrMbaInfo;
use super::platform::MsrPlatform;
use super::platform::MSR_PLATFORM;
use super::utils;
use crate::registers;
use crate::registers::MSRItem;

struct Opened {
    platform: MsrPlatform,
    packages: Vec<Package>,
}

/// Backend writing class of service MSRs through `/dev/cpu/<n>/msr`.
///
/// Socket ids are hwloc package os indices, cache and bandwidth registers of a
/// package are written on its first core.
#[derive(Default)]
pub struct MsrBackend {
    opened: Option<Opened>,
}

impl MsrBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn opened(&self) -> BackendResult<&Opened> {
        self.opened.as_ref().ok_or(BackendError::NotInitialized)
    }
}

impl Opened {
    fn package(&self, socket_id: u32) -> BackendResult<&Package> {
        self.packages
            .iter()
            .find(|package| package.os_index == socket_id)
            .ok_or_else(|| BackendError::invalid_parameter(format!("unknown package {socket_id}")))
    }

    fn mba(&self) -> BackendResult<MsrMbaInfo> {
        self.platform
            .mba
            .ok_or_else(|| BackendError::unsupported("memory bandwidth allocation"))
    }

    fn all_cores(&self) -> impl Iterator<Item = LogicalCoreId> + '_ {
        self.packages
            .iter()
            .flat_map(|package| package.logical_cores.iter().copied())
    }

    fn check_class(&self, class_id: ClassId, slot_count: u32) -> BackendResult<()> {
        if class_id.get() >= slot_count {
            return Err(BackendError::invalid_parameter(format!(
                "class {class_id} is out of {slot_count} classes"
            )));
        }
        Ok(())
    }

    fn associate(&self, core_id: LogicalCoreId, class_id: ClassId) -> BackendResult<()> {
        self.check_class(class_id, self.platform.class_count())?;
        utils::write_item(MSRItem::pqr_assoc(class_id), core_id)?;
        Ok(())
    }

    fn association(&self, core_id: LogicalCoreId) -> BackendResult<ClassId> {
        let value = utils::read_msr(registers::IA32_PQR_ASSOC, core_id)?;
        Ok(registers::class_from_pqr_assoc(value))
    }
}

impl RdtBackend for MsrBackend {
    fn init(&mut self, config: &BackendConfig) -> BackendResult<()> {
        if config.interface != Interface::Msr {
            return Err(BackendError::invalid_parameter(
                "MSR backend works only through the MSR interface",
            ));
        }

        let platform = (*MSR_PLATFORM)
            .ok_or_else(|| BackendError::unsupported("L3 cache allocation"))?;
        let packages = CPUTopology::new()
            .and_then(|topology| topology.packages())
            .map_err(BackendError::rejected)?
            .into_iter()
            .collect::<Vec<_>>();

        tracing::info!(
            "MSR backend opened on {} package(s), {} cache ways",
            packages.len(),
            platform.cache_ways
        );
        self.opened = Some(Opened { platform, packages });

        Ok(())
    }

    fn shutdown(&mut self) -> BackendResult<()> {
        self.opened = None;
        Ok(())
    }

    fn capabilities(&self) -> BackendResult<Vec<Capability>> {
        let opened = self.opened()?;
        let platform = &opened.platform;

        let mut capabilities = vec![Capability::L3ca(Some(L3caInfo {
            num_classes: platform.l3ca_classes,
            num_ways: platform.cache_ways,
            cdp_enabled: false,
        }))];
        if let Some(mba) = platform.mba {
            capabilities.push(Capability::Mba(Some(MbaInfo {
                num_classes: mba.classes,
                ctrl: MbaCtrlFlag::Off,
            })));
        }

        Ok(capabilities)
    }

    fn l3ca_ids(&self) -> BackendResult<Vec<u32>> {
        let opened = self.opened()?;
        Ok(opened.packages.iter().map(|package| package.os_index).collect())
    }

    fn mba_ids(&self) -> BackendResult<Vec<u32>> {
        let opened = self.opened()?;
        opened.mba()?;
        Ok(opened.packages.iter().map(|package| package.os_index).collect())
    }

    fn l3_num_ways(&self) -> BackendResult<u32> {
        Ok(self.opened()?.platform.cache_ways)
    }

    fn set_l3ca(&mut self, l3ca_id: u32, record: &L3caRecord) -> BackendResult<()> {
        let opened = self.opened()?;
        opened.check_class(record.class_id, opened.platform.l3ca_classes)?;
        if record.ways_mask == 0 || record.ways_mask & !opened.platform.full_mask() != 0 {
            return Err(BackendError::invalid_parameter(format!(
                "mask {:#x} doesn't fit {} cache ways",
                record.ways_mask, opened.platform.cache_ways
            )));
        }

        let package = opened.package(l3ca_id)?;
        let item = MSRItem::l3_mask(record.class_id, record.ways_mask);
        utils::write_item(item, package.first_core())?;

        Ok(())
    }

    fn set_mba(&mut self, mba_id: u32, requested: &MbaRecord) -> BackendResult<MbaRecord> {
        let opened = self.opened()?;
        let mba = opened.mba()?;
        if requested.ctrl {
            return Err(BackendError::unsupported("absolute rate bandwidth control"));
        }
        opened.check_class(requested.class_id, mba.classes)?;

        let package = opened.package(mba_id)?;
        let delay = registers::delay_for_percentage(requested.mb_max, mba.max_delay);
        let item = MSRItem::mba_delay(requested.class_id, delay);
        utils::write_item(item, package.first_core())?;

        let actual = MbaRecord {
            mb_max: registers::percentage_for_delay(delay),
            ..*requested
        };
        Ok(actual)
    }

    fn assoc_core(&mut self, core_id: LogicalCoreId, class_id: ClassId) -> BackendResult<()> {
        self.opened()?.associate(core_id, class_id)
    }

    fn assoc_task(&mut self, _task_id: TaskId, _class_id: ClassId) -> BackendResult<()> {
        self.opened()?;
        Err(BackendError::unsupported("task association through MSRs"))
    }

    fn core_association(&self, core_id: LogicalCoreId) -> BackendResult<ClassId> {
        self.opened()?.association(core_id)
    }

    fn class_cores(&self, class_id: ClassId) -> BackendResult<Vec<LogicalCoreId>> {
        let opened = self.opened()?;
        let mut core_ids = Vec::new();
        for core_id in opened.all_cores() {
            if opened.association(core_id)? == class_id {
                core_ids.push(core_id);
            }
        }
        Ok(core_ids)
    }

    fn release_cores(&mut self, core_ids: &[LogicalCoreId]) -> BackendResult<()> {
        let opened = self.opened()?;
        core_ids
            .iter()
            .try_for_each(|&core_id| opened.associate(core_id, ClassId::DEFAULT))
    }

    fn assign(
        &mut self,
        technologies: Technologies,
        core_ids: &[LogicalCoreId],
    ) -> BackendResult<ClassId> {
        let opened = self.opened()?;

        let mut slot_count = opened.platform.l3ca_classes;
        if technologies.contains(Technologies::MBA) {
            slot_count = slot_count.min(opened.mba()?.classes);
        }

        let used = opened
            .all_cores()
            .map(|core_id| opened.association(core_id))
            .collect::<BackendResult<HashSet<_>>>()?;
        let class_id = (1..slot_count)
            .map(ClassId::new)
            .find(|class_id| !used.contains(class_id))
            .ok_or(BackendError::NoFreeClass)?;

        for &core_id in core_ids {
            opened.associate(core_id, class_id)?;
        }
        Ok(class_id)
    }

    fn reset(&mut self, l3_cdp: CdpConfig, l2_cdp: CdpConfig, mba: MbaConfig) -> BackendResult<()> {
        let opened = self.opened()?;
        if l3_cdp == CdpConfig::On || l2_cdp == CdpConfig::On {
            return Err(BackendError::unsupported("code and data prioritization"));
        }
        if mba == MbaConfig::Ctrl {
            return Err(BackendError::unsupported("absolute rate bandwidth control"));
        }

        let full_mask = opened.platform.full_mask();
        for package in &opened.packages {
            let core_id = package.first_core();
            for class_id in (0..opened.platform.l3ca_classes).map(ClassId::new) {
                utils::write_item(MSRItem::l3_mask(class_id, full_mask), core_id)?;
            }
            if let Some(mba) = opened.platform.mba {
                for class_id in (0..mba.classes).map(ClassId::new) {
                    utils::write_item(MSRItem::mba_delay(class_id, 0), core_id)?;
                }
            }
        }

        for core_id in opened.all_cores() {
            opened.associate(core_id, ClassId::DEFAULT)?;
        }

        tracing::info!("MSR backend reset every class to defaults");
        Ok(())
    }
}
