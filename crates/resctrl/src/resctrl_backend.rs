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

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

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

use crate::cpu_list::format_cpu_list;
use crate::cpu_list::parse_cpu_list;
use crate::errors::ResctrlError;
use crate::fs_utils;
use crate::info::ResctrlInfo;
use crate::mounts::ResctrlMount;
use crate::schemata::schemata_line;
use crate::schemata::Schemata;
use crate::ResctrlResult;

const GROUP_PREFIX: &str = "COS";
const MB_RESOURCE: &str = "MB";
const MAX_PERCENTAGE: u32 = 100;
const SCHEMATA: &str = "schemata";
const CPUS_LIST: &str = "cpus_list";
const TASKS: &str = "tasks";

pub const DEFAULT_RESCTRL_ROOT: &str = "/sys/fs/resctrl";
pub const DEFAULT_MOUNTS_FILE: &str = "/proc/mounts";

struct Opened {
    mount: ResctrlMount,
    info: ResctrlInfo,
    l3ca_ids: Vec<u32>,
    mba_ids: Vec<u32>,
}

/// Backend programming the resctrl filesystem.
///
/// Class 0 is the root group, class `n` is the group directory `COS<n>`
/// which is created the first time the class is touched.
pub struct ResctrlBackend {
    root: PathBuf,
    mounts_file: PathBuf,
    opened: Option<Opened>,
}

impl Default for ResctrlBackend {
    fn default() -> Self {
        Self::new(DEFAULT_RESCTRL_ROOT, DEFAULT_MOUNTS_FILE)
    }
}

impl ResctrlBackend {
    pub fn new(root: impl Into<PathBuf>, mounts_file: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mounts_file: mounts_file.into(),
            opened: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn opened(&self) -> BackendResult<&Opened> {
        self.opened.as_ref().ok_or(BackendError::NotInitialized)
    }

    fn open(&self) -> ResctrlResult<Opened> {
        let mount = ResctrlMount::find(&self.mounts_file, &self.root)?;
        let info = ResctrlInfo::read(&self.root)?;

        let schemata_path = self.root.join(SCHEMATA);
        let schemata = Schemata::parse(&fs_utils::read(&schemata_path)?)
            .map_err(|reason| ResctrlError::parse(&schemata_path, reason))?;
        let l3_resource = info.l3.schemata_resources()[0];
        let l3ca_ids = schemata.domain_ids(l3_resource);
        let mba_ids = match info.mb {
            Some(_) => schemata.domain_ids(MB_RESOURCE),
            None => Vec::new(),
        };

        Ok(Opened {
            mount,
            info,
            l3ca_ids,
            mba_ids,
        })
    }

    fn group_dir(&self, class_id: ClassId) -> PathBuf {
        if class_id.is_default() {
            self.root.clone()
        } else {
            self.root.join(format!("{GROUP_PREFIX}{class_id}"))
        }
    }

    fn ensure_group(&self, class_id: ClassId) -> ResctrlResult<PathBuf> {
        let dir = self.group_dir(class_id);
        if !dir.is_dir() {
            tracing::debug!("creating resctrl group {dir:?}");
            fs::create_dir(&dir).map_err(|error| ResctrlError::write(&dir, "", error))?;
        }
        Ok(dir)
    }

    /// Class directories `COS<n>` present under the root, in class order.
    fn groups(&self) -> ResctrlResult<Vec<(ClassId, PathBuf)>> {
        let entries =
            fs::read_dir(&self.root).map_err(|error| ResctrlError::read(&self.root, error))?;

        let mut groups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| ResctrlError::read(&self.root, error))?;
            let name = entry.file_name();
            let Some(class_id) = name
                .to_str()
                .and_then(|name| name.strip_prefix(GROUP_PREFIX))
                .and_then(|id| id.parse::<u32>().ok())
            else {
                continue;
            };
            if entry.path().is_dir() {
                groups.push((ClassId::new(class_id), entry.path()));
            }
        }
        groups.sort();

        Ok(groups)
    }

    fn read_cpus(dir: &Path) -> ResctrlResult<BTreeSet<LogicalCoreId>> {
        let path = dir.join(CPUS_LIST);
        match fs_utils::read_optional(&path)? {
            Some(list) => {
                parse_cpu_list(&list).map_err(|reason| ResctrlError::parse(&path, reason))
            }
            None => Ok(BTreeSet::new()),
        }
    }

    fn write_cpus(dir: &Path, cores: &BTreeSet<LogicalCoreId>) -> ResctrlResult<()> {
        fs_utils::write_line(&dir.join(CPUS_LIST), &format_cpu_list(cores))
    }

    fn has_tasks(dir: &Path) -> ResctrlResult<bool> {
        let tasks = fs_utils::read_optional(&dir.join(TASKS))?.unwrap_or_default();
        Ok(tasks.lines().any(|line| !line.trim().is_empty()))
    }

    fn associate(&self, core_id: LogicalCoreId, class_id: ClassId) -> ResctrlResult<()> {
        for (group_class, dir) in self.groups()? {
            if group_class == class_id {
                continue;
            }
            let mut cores = Self::read_cpus(&dir)?;
            if cores.remove(&core_id) {
                Self::write_cpus(&dir, &cores)?;
            }
        }

        let dir = self.ensure_group(class_id)?;
        let mut cores = Self::read_cpus(&dir)?;
        if cores.insert(core_id) {
            Self::write_cpus(&dir, &cores)?;
        }

        Ok(())
    }

    fn association(&self, core_id: LogicalCoreId) -> ResctrlResult<ClassId> {
        for (class_id, dir) in self.groups()? {
            if Self::read_cpus(&dir)?.contains(&core_id) {
                return Ok(class_id);
            }
        }
        Ok(ClassId::DEFAULT)
    }

    fn is_free(&self, class_id: ClassId) -> ResctrlResult<bool> {
        let dir = self.group_dir(class_id);
        if !dir.is_dir() {
            return Ok(true);
        }
        Ok(Self::read_cpus(&dir)?.is_empty() && !Self::has_tasks(&dir)?)
    }

    fn remove_group(dir: &Path) -> ResctrlResult<()> {
        // kernel groups go away with rmdir even though they list files
        match fs::remove_dir(dir) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(_) => {
                fs::remove_dir_all(dir).map_err(|error| ResctrlError::remove_group(dir, error))
            }
        }
    }

    fn read_schemata(dir: &Path) -> ResctrlResult<Schemata> {
        let path = dir.join(SCHEMATA);
        let content = fs_utils::read_optional(&path)?.unwrap_or_default();
        Schemata::parse(&content).map_err(|reason| ResctrlError::parse(&path, reason))
    }
}

impl Opened {
    fn check_class(&self, class_id: ClassId, slot_count: u32) -> BackendResult<()> {
        if class_id.get() >= slot_count {
            return Err(BackendError::invalid_parameter(format!(
                "class {class_id} is out of {slot_count} classes"
            )));
        }
        Ok(())
    }

    fn class_count(&self) -> u32 {
        let mb_closids = self.info.mb.as_ref().map_or(0, |mb| mb.num_closids);
        self.info.l3.num_closids.max(mb_closids)
    }

    fn unthrottled(&self) -> u32 {
        if self.mount.mba_mbps {
            u32::MAX
        } else {
            MAX_PERCENTAGE
        }
    }
}

impl RdtBackend for ResctrlBackend {
    fn init(&mut self, config: &BackendConfig) -> BackendResult<()> {
        if config.interface != Interface::Os {
            return Err(BackendError::invalid_parameter(
                "resctrl backend works only through the OS interface",
            ));
        }

        let opened = self.open()?;
        tracing::info!(
            "resctrl at {:?} opened, {} cache domain(s), cdp {}, MBps {}",
            self.root,
            opened.l3ca_ids.len(),
            opened.info.l3.cdp,
            opened.mount.mba_mbps,
        );
        self.opened = Some(opened);

        Ok(())
    }

    fn shutdown(&mut self) -> BackendResult<()> {
        self.opened = None;
        Ok(())
    }

    fn capabilities(&self) -> BackendResult<Vec<Capability>> {
        let opened = self.opened()?;
        let l3 = &opened.info.l3;

        let mut capabilities = vec![Capability::L3ca(Some(L3caInfo {
            num_classes: l3.num_closids,
            num_ways: l3.num_ways(),
            cdp_enabled: l3.cdp,
        }))];
        if let Some(mb) = &opened.info.mb {
            let ctrl = if opened.mount.mba_mbps {
                MbaCtrlFlag::On
            } else {
                MbaCtrlFlag::Off
            };
            capabilities.push(Capability::Mba(Some(MbaInfo {
                num_classes: mb.num_closids,
                ctrl,
            })));
        }
        if self.root.join("info").join("L3_MON").is_dir() {
            capabilities.push(Capability::Monitoring);
        }

        Ok(capabilities)
    }

    fn l3ca_ids(&self) -> BackendResult<Vec<u32>> {
        Ok(self.opened()?.l3ca_ids.clone())
    }

    fn mba_ids(&self) -> BackendResult<Vec<u32>> {
        Ok(self.opened()?.mba_ids.clone())
    }

    fn l3_num_ways(&self) -> BackendResult<u32> {
        Ok(self.opened()?.info.l3.num_ways())
    }

    fn set_l3ca(&mut self, l3ca_id: u32, record: &L3caRecord) -> BackendResult<()> {
        let opened = self.opened()?;
        opened.check_class(record.class_id, opened.info.l3.num_closids)?;
        if !opened.l3ca_ids.contains(&l3ca_id) {
            return Err(BackendError::invalid_parameter(format!("unknown cache id {l3ca_id}")));
        }
        let cbm_mask = opened.info.l3.cbm_mask;
        if record.ways_mask == 0 || record.ways_mask & !cbm_mask != 0 {
            return Err(BackendError::invalid_parameter(format!(
                "mask {:#x} doesn't fit {cbm_mask:#x}",
                record.ways_mask
            )));
        }

        let dir = self.ensure_group(record.class_id)?;
        for resource in opened.info.l3.schemata_resources() {
            let line = schemata_line(resource, [(l3ca_id, format!("{:x}", record.ways_mask))]);
            fs_utils::write_line(&dir.join(SCHEMATA), &line)?;
        }

        Ok(())
    }

    fn set_mba(&mut self, mba_id: u32, requested: &MbaRecord) -> BackendResult<MbaRecord> {
        let opened = self.opened()?;
        let mb = opened
            .info
            .mb
            .as_ref()
            .ok_or_else(|| BackendError::unsupported("memory bandwidth allocation"))?;
        opened.check_class(requested.class_id, mb.num_closids)?;
        if requested.ctrl != opened.mount.mba_mbps {
            return Err(BackendError::rejected(format!(
                "resctrl is mounted with MBps control {}, requested {}",
                opened.mount.mba_mbps, requested.ctrl
            )));
        }
        if !opened.mba_ids.contains(&mba_id) {
            return Err(BackendError::invalid_parameter(format!("unknown MBA id {mba_id}")));
        }

        let dir = self.ensure_group(requested.class_id)?;
        let line = schemata_line(MB_RESOURCE, [(mba_id, requested.mb_max)]);
        fs_utils::write_line(&dir.join(SCHEMATA), &line)?;

        let schemata = Self::read_schemata(&dir)?;
        let actual = match schemata.value(MB_RESOURCE, mba_id) {
            Some(value) => value.parse::<u32>().map_err(|error| {
                ResctrlError::parse(&dir.join(SCHEMATA), format!("MB value {value:?}: {error}"))
            })?,
            None => requested.mb_max,
        };

        Ok(MbaRecord {
            mb_max: actual,
            ..*requested
        })
    }

    fn assoc_core(&mut self, core_id: LogicalCoreId, class_id: ClassId) -> BackendResult<()> {
        let opened = self.opened()?;
        opened.check_class(class_id, opened.class_count())?;
        self.associate(core_id, class_id)?;
        Ok(())
    }

    fn assoc_task(&mut self, task_id: TaskId, class_id: ClassId) -> BackendResult<()> {
        let opened = self.opened()?;
        opened.check_class(class_id, opened.class_count())?;
        let dir = self.ensure_group(class_id)?;
        fs_utils::append_line(&dir.join(TASKS), &task_id.to_string())?;
        Ok(())
    }

    fn core_association(&self, core_id: LogicalCoreId) -> BackendResult<ClassId> {
        self.opened()?;
        Ok(self.association(core_id)?)
    }

    fn class_cores(&self, class_id: ClassId) -> BackendResult<Vec<LogicalCoreId>> {
        self.opened()?;
        let dir = self.group_dir(class_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        Ok(Self::read_cpus(&dir)?.into_iter().collect())
    }

    fn release_cores(&mut self, core_ids: &[LogicalCoreId]) -> BackendResult<()> {
        self.opened()?;
        for &core_id in core_ids {
            self.associate(core_id, ClassId::DEFAULT)?;
        }
        Ok(())
    }

    fn assign(
        &mut self,
        technologies: Technologies,
        core_ids: &[LogicalCoreId],
    ) -> BackendResult<ClassId> {
        let opened = self.opened()?;

        let mut slot_count = opened.info.l3.num_closids;
        if technologies.contains(Technologies::MBA) {
            let mb = opened
                .info
                .mb
                .as_ref()
                .ok_or_else(|| BackendError::unsupported("memory bandwidth allocation"))?;
            slot_count = slot_count.min(mb.num_closids);
        }

        let mut free_class = None;
        for class_id in (1..slot_count).map(ClassId::new) {
            if self.is_free(class_id)? {
                free_class = Some(class_id);
                break;
            }
        }
        let class_id = free_class.ok_or(BackendError::NoFreeClass)?;

        for &core_id in core_ids {
            self.associate(core_id, class_id)?;
        }
        Ok(class_id)
    }

    fn reset(&mut self, l3_cdp: CdpConfig, l2_cdp: CdpConfig, mba: MbaConfig) -> BackendResult<()> {
        let opened = self.opened()?;
        let cdp = opened.info.l3.cdp;
        match (l3_cdp, cdp) {
            (CdpConfig::On, false) | (CdpConfig::Off, true) => {
                return Err(BackendError::unsupported(
                    "switching L3 CDP without remounting resctrl",
                ));
            }
            _ => {}
        }
        match (l2_cdp, opened.mount.l2_cdp) {
            (CdpConfig::On, false) | (CdpConfig::Off, true) => {
                return Err(BackendError::unsupported(
                    "switching L2 CDP without remounting resctrl",
                ));
            }
            _ => {}
        }
        match (mba, opened.mount.mba_mbps) {
            (MbaConfig::Ctrl, false) | (MbaConfig::Default, true) => {
                return Err(BackendError::unsupported(
                    "switching MBA control without remounting resctrl",
                ));
            }
            _ => {}
        }

        for (_, dir) in self.groups()? {
            tracing::debug!("removing resctrl group {dir:?}");
            Self::remove_group(&dir)?;
        }

        let root_schemata = self.root.join(SCHEMATA);
        let full_mask = format!("{:x}", opened.info.l3.cbm_mask);
        for resource in opened.info.l3.schemata_resources() {
            let values = opened.l3ca_ids.iter().map(|&id| (id, full_mask.as_str()));
            fs_utils::write_line(&root_schemata, &schemata_line(resource, values))?;
        }
        if !opened.mba_ids.is_empty() {
            let unthrottled = opened.unthrottled();
            let values = opened.mba_ids.iter().map(|&id| (id, unthrottled));
            fs_utils::write_line(&root_schemata, &schemata_line(MB_RESOURCE, values))?;
        }

        tracing::info!("resctrl reset every class to defaults");
        Ok(())
    }
}
