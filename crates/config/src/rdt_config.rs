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

use std::path::PathBuf;

use crate::defaults::default_backend_kind;
use crate::defaults::default_log_level;
use crate::defaults::default_mounts_file;
use crate::defaults::default_resctrl_root;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RdtConfig {
    pub backend: Backend,
    pub logs: Logs,
    pub startup: Startup,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backend {
    pub kind: BackendKind,
    /// Mount point of the resource control filesystem, absolute after resolution.
    pub resctrl_root: PathBuf,
    pub mounts_file: PathBuf,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Kernel resource control filesystem.
    #[default]
    Resctrl,
    /// Direct model specific register access.
    Msr,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Logs {
    pub log_level: tracing_subscriber::filter::LevelFilter,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Startup {
    /// Raw bandwidth reset mode to apply right after init, validated by the allocator.
    pub reset: Option<i32>,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            resctrl_root: default_resctrl_root(),
            mounts_file: default_mounts_file(),
        }
    }
}

impl Default for Logs {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_tracing_filter(),
        }
    }
}
