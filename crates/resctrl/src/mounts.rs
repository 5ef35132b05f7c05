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

use std::path::Path;

use crate::errors::ResctrlError;
use crate::fs_utils;
use crate::ResctrlResult;

const RESCTRL_FS_TYPE: &str = "resctrl";

/// Options of the resctrl mount the backend works on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResctrlMount {
    /// Bandwidth limits are MBps instead of percentages.
    pub mba_mbps: bool,
    pub l2_cdp: bool,
}

impl ResctrlMount {
    /// Looks up the resctrl mount at `root` in a mounts file, `/proc/mounts` format.
    pub fn find(mounts_file: &Path, root: &Path) -> ResctrlResult<Self> {
        let mounts = fs_utils::read(mounts_file)?;
        Self::parse(&mounts, root).ok_or_else(|| ResctrlError::NotMounted {
            root: root.to_path_buf(),
        })
    }

    fn parse(mounts: &str, root: &Path) -> Option<Self> {
        mounts.lines().find_map(|line| {
            let mut fields = line.split_whitespace();
            let _device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            let options = fields.next().unwrap_or_default();

            if fs_type != RESCTRL_FS_TYPE || Path::new(mount_point) != root {
                return None;
            }

            let has_option = |name: &str| options.split(',').any(|option| option == name);
            Some(Self {
                mba_mbps: has_option("mba_MBps"),
                l2_cdp: has_option("cdpl2"),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUNTS: &str = "\
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
resctrl /sys/fs/resctrl resctrl rw,relatime,cdpl2,mba_MBps 0 0
";

    #[test]
    fn reads_mount_options() {
        let mount = ResctrlMount::parse(MOUNTS, Path::new("/sys/fs/resctrl")).unwrap();

        assert!(mount.mba_mbps);
        assert!(mount.l2_cdp);
    }

    #[test]
    fn other_mount_points_are_ignored() {
        assert!(ResctrlMount::parse(MOUNTS, Path::new("/mnt/resctrl")).is_none());
        assert!(ResctrlMount::parse(MOUNTS, Path::new("/sys")).is_none());
    }
}
