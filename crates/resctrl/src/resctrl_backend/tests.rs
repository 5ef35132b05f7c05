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

use std::fs;
use std::path::Path;

use maplit::btreeset;
use tempfile::TempDir;

use rdt_shared::backend::BackendConfig;
use rdt_shared::backend::BackendError;
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
use test_log::test;

use super::*;

struct FakeResctrl {
    dir: TempDir,
}

impl FakeResctrl {
    fn new(mount_options: &str, cdp: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("resctrl");
        let l3 = if cdp { "L3CODE" } else { "L3" };

        write(&root.join("info").join(l3).join("num_closids"), "4\n");
        write(&root.join("info").join(l3).join("cbm_mask"), "fffff\n");
        write(&root.join("info").join("MB").join("num_closids"), "4\n");
        let l3_lines = if cdp {
            "L3CODE:0=fffff;1=fffff\nL3DATA:0=fffff;1=fffff\n"
        } else {
            "    L3:0=fffff;1=fffff\n"
        };
        write(
            &root.join("schemata"),
            &format!("{l3_lines}    MB:0=100;1=100\n"),
        );
        write(&root.join("cpus_list"), "0-7\n");
        write(&root.join("tasks"), "1\n");

        let mounts = format!(
            "proc /proc proc rw 0 0\nresctrl {} resctrl {mount_options} 0 0\n",
            root.display()
        );
        write(&dir.path().join("mounts"), &mounts);

        Self { dir }
    }

    fn root(&self) -> std::path::PathBuf {
        self.dir.path().join("resctrl")
    }

    fn backend(&self) -> ResctrlBackend {
        ResctrlBackend::new(self.root(), self.dir.path().join("mounts"))
    }

    fn opened_backend(&self) -> ResctrlBackend {
        let mut backend = self.backend();
        backend.init(&BackendConfig::default()).unwrap();
        backend
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join(relative)).unwrap()
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn core(id: u32) -> LogicalCoreId {
    LogicalCoreId::new(id)
}

#[test]
fn capabilities_come_from_info() {
    let fake = FakeResctrl::new("rw,relatime", false);
    let backend = fake.opened_backend();

    let capabilities = backend.capabilities().unwrap();

    let expected = vec![
        Capability::L3ca(Some(L3caInfo {
            num_classes: 4,
            num_ways: 20,
            cdp_enabled: false,
        })),
        Capability::Mba(Some(MbaInfo {
            num_classes: 4,
            ctrl: MbaCtrlFlag::Off,
        })),
    ];
    assert_eq!(capabilities, expected);
    assert_eq!(backend.l3ca_ids().unwrap(), vec![0, 1]);
    assert_eq!(backend.mba_ids().unwrap(), vec![0, 1]);
    assert_eq!(backend.l3_num_ways().unwrap(), 20);
}

#[test]
fn mbps_mount_reports_ctrl_on() {
    let fake = FakeResctrl::new("rw,relatime,mba_MBps", false);
    let backend = fake.opened_backend();

    let capabilities = backend.capabilities().unwrap();

    assert!(capabilities.contains(&Capability::Mba(Some(MbaInfo {
        num_classes: 4,
        ctrl: MbaCtrlFlag::On,
    }))));
}

#[test]
fn init_requires_mount_and_os_interface() {
    let fake = FakeResctrl::new("rw", false);
    let mut backend = ResctrlBackend::new(
        fake.root().join("elsewhere"),
        fake.dir.path().join("mounts"),
    );
    assert!(matches!(
        backend.init(&BackendConfig::default()),
        Err(BackendError::Unsupported { .. })
    ));

    let mut backend = fake.backend();
    let config = BackendConfig::with_interface(Interface::Msr);
    assert!(matches!(
        backend.init(&config),
        Err(BackendError::InvalidParameter { .. })
    ));
    assert!(matches!(
        backend.capabilities(),
        Err(BackendError::NotInitialized)
    ));
}

#[test]
fn cache_mask_goes_to_class_group() {
    let fake = FakeResctrl::new("rw", false);
    let mut backend = fake.opened_backend();

    let record = L3caRecord {
        class_id: ClassId::new(2),
        ways_mask: 0xFF00,
    };
    backend.set_l3ca(1, &record).unwrap();

    assert_eq!(fake.read("COS2/schemata"), "L3:1=ff00\n");

    let too_wide = L3caRecord {
        class_id: ClassId::new(2),
        ways_mask: 0x100000,
    };
    assert!(backend.set_l3ca(1, &too_wide).is_err());
    assert!(backend.set_l3ca(5, &record).is_err());
}

#[test]
fn cdp_mount_writes_code_and_data_masks() {
    let fake = FakeResctrl::new("rw,cdp", true);
    let mut backend = fake.opened_backend();
    let record = L3caRecord {
        class_id: ClassId::new(1),
        ways_mask: 0xF,
    };

    backend.set_l3ca(0, &record).unwrap();

    assert!(matches!(
        backend.capabilities().unwrap()[0],
        Capability::L3ca(Some(L3caInfo {
            cdp_enabled: true,
            ..
        }))
    ));
    // the fake file keeps only the last write
    assert_eq!(fake.read("COS1/schemata"), "L3DATA:0=f\n");
}

#[test]
fn bandwidth_is_read_back() {
    let fake = FakeResctrl::new("rw", false);
    let mut backend = fake.opened_backend();
    let requested = MbaRecord {
        class_id: ClassId::new(1),
        mb_max: 40,
        ctrl: false,
    };

    let actual = backend.set_mba(1, &requested).unwrap();

    assert_eq!(actual, requested);
    assert_eq!(fake.read("COS1/schemata"), "MB:1=40\n");

    let mbps = MbaRecord {
        ctrl: true,
        ..requested
    };
    assert!(matches!(
        backend.set_mba(1, &mbps),
        Err(BackendError::Rejected { .. })
    ));
}

#[test]
fn core_moves_between_groups() {
    let fake = FakeResctrl::new("rw", false);
    let mut backend = fake.opened_backend();

    backend.assoc_core(core(3), ClassId::new(1)).unwrap();
    backend.assoc_core(core(4), ClassId::new(1)).unwrap();
    assert_eq!(fake.read("COS1/cpus_list"), "3-4\n");

    backend.assoc_core(core(3), ClassId::new(2)).unwrap();
    assert_eq!(fake.read("COS1/cpus_list"), "4\n");
    assert_eq!(fake.read("COS2/cpus_list"), "3\n");
    assert_eq!(backend.core_association(core(3)).unwrap(), ClassId::new(2));
    assert_eq!(backend.core_association(core(6)).unwrap(), ClassId::DEFAULT);

    backend.release_cores(&[core(3), core(4)]).unwrap();
    assert_eq!(fake.read("COS2/cpus_list"), "\n");
    assert_eq!(backend.core_association(core(4)).unwrap(), ClassId::DEFAULT);
}

#[test]
fn class_cores_reads_group_written_by_earlier_backend() {
    let fake = FakeResctrl::new("rw", false);
    let mut earlier = fake.opened_backend();
    earlier.assoc_core(core(5), ClassId::new(2)).unwrap();
    earlier.assoc_core(core(1), ClassId::new(2)).unwrap();

    let backend = fake.opened_backend();

    assert_eq!(
        backend.class_cores(ClassId::new(2)).unwrap(),
        vec![core(1), core(5)]
    );
    assert!(backend.class_cores(ClassId::new(3)).unwrap().is_empty());
    assert!(matches!(
        fake.backend().class_cores(ClassId::new(2)),
        Err(BackendError::NotInitialized)
    ));
}

#[test]
fn task_is_appended_to_group() {
    let fake = FakeResctrl::new("rw", false);
    let mut backend = fake.opened_backend();

    backend.assoc_task(TaskId::new(4242), ClassId::new(3)).unwrap();
    backend.assoc_task(TaskId::new(4243), ClassId::new(3)).unwrap();

    assert_eq!(fake.read("COS3/tasks"), "4242\n4243\n");
    assert!(backend.assoc_task(TaskId::new(1), ClassId::new(4)).is_err());
}

#[test]
fn assign_picks_first_unused_group() {
    let fake = FakeResctrl::new("rw", false);
    let mut backend = fake.opened_backend();
    backend.assoc_core(core(0), ClassId::new(1)).unwrap();
    backend.assoc_task(TaskId::new(7), ClassId::new(2)).unwrap();

    let class_id = backend
        .assign(Technologies::L3CA | Technologies::MBA, &[core(5), core(6)])
        .unwrap();

    assert_eq!(class_id, ClassId::new(3));
    let cores = crate::parse_cpu_list(&fake.read("COS3/cpus_list")).unwrap();
    assert_eq!(cores, btreeset! { core(5), core(6) });

    assert!(matches!(
        backend.assign(Technologies::L3CA, &[core(7)]),
        Err(BackendError::NoFreeClass)
    ));
}

#[test]
fn reset_removes_groups_and_restores_root() {
    let fake = FakeResctrl::new("rw", false);
    let mut backend = fake.opened_backend();
    backend.assoc_core(core(1), ClassId::new(1)).unwrap();
    backend
        .set_l3ca(
            0,
            &L3caRecord {
                class_id: ClassId::new(2),
                ways_mask: 0x3,
            },
        )
        .unwrap();

    backend
        .reset(CdpConfig::Any, CdpConfig::Any, MbaConfig::Any)
        .unwrap();

    assert!(!fake.root().join("COS1").exists());
    assert!(!fake.root().join("COS2").exists());
    assert_eq!(fake.read("schemata"), "MB:0=100;1=100\n");
    assert_eq!(backend.core_association(core(1)).unwrap(), ClassId::DEFAULT);
}

#[test]
fn reset_refuses_modes_needing_remount() {
    let fake = FakeResctrl::new("rw", false);
    let mut backend = fake.opened_backend();

    let results = [
        backend.reset(CdpConfig::Any, CdpConfig::Any, MbaConfig::Ctrl),
        backend.reset(CdpConfig::On, CdpConfig::Any, MbaConfig::Any),
        backend.reset(CdpConfig::Any, CdpConfig::On, MbaConfig::Any),
    ];

    for result in results {
        assert!(matches!(result, Err(BackendError::Unsupported { .. })));
    }
}
