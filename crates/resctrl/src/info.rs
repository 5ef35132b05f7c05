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

/// Static resource limits from the resctrl `info` directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResctrlInfo {
    pub l3: L3Info,
    pub mb: Option<MbInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct L3Info {
    pub num_closids: u32,
    pub cbm_mask: u64,
    /// Code and data masks are separate, `L3CODE` and `L3DATA` replace `L3`.
    pub cdp: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MbInfo {
    pub num_closids: u32,
}

impl ResctrlInfo {
    pub fn read(root: &Path) -> ResctrlResult<Self> {
        let info = root.join("info");

        let (l3_dir, cdp) = if info.join("L3").is_dir() {
            (info.join("L3"), false)
        } else if info.join("L3CODE").is_dir() {
            (info.join("L3CODE"), true)
        } else {
            return Err(ResctrlError::MissingResource { resource: "L3" });
        };

        let num_closids = fs_utils::read_number(&l3_dir.join("num_closids"))?;
        let cbm_path = l3_dir.join("cbm_mask");
        let cbm_mask = u64::from_str_radix(fs_utils::read(&cbm_path)?.trim(), 16)
            .map_err(|error| ResctrlError::parse(&cbm_path, error))?;
        let l3 = L3Info {
            num_closids,
            cbm_mask,
            cdp,
        };

        let mb_dir = info.join("MB");
        let mb = if mb_dir.is_dir() {
            let num_closids = fs_utils::read_number(&mb_dir.join("num_closids"))?;
            Some(MbInfo { num_closids })
        } else {
            None
        };

        Ok(Self { l3, mb })
    }
}

impl L3Info {
    pub fn num_ways(&self) -> u32 {
        self.cbm_mask.count_ones()
    }

    /// Schemata resources a cache mask has to be written to.
    pub fn schemata_resources(&self) -> &'static [&'static str] {
        if self.cdp {
            &["L3CODE", "L3DATA"]
        } else {
            &["L3"]
        }
    }
}
