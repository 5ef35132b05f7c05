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
use std::path::PathBuf;

use eyre::eyre;
use serde::Deserialize;
use serde::Serialize;

use super::defaults::default_log_level;
use super::defaults::default_mounts_file;
use super::defaults::default_resctrl_root;
use crate::*;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedRdtConfig {
    #[serde(default)]
    pub backend: UnresolvedBackend,
    #[serde(default)]
    pub logs: UnresolvedLogs,
    #[serde(default)]
    pub startup: UnresolvedStartup,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedBackend {
    #[serde(default)]
    pub kind: UnresolvedBackendKind,

    #[serde(default = "default_resctrl_root")]
    pub resctrl_root: PathBuf,

    #[serde(default = "default_mounts_file")]
    pub mounts_file: PathBuf,
}

impl Default for UnresolvedBackend {
    fn default() -> Self {
        Self {
            kind: Default::default(),
            resctrl_root: default_resctrl_root(),
            mounts_file: default_mounts_file(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedBackendKind {
    #[default]
    Resctrl,
    Msr,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedLogs {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

impl Default for UnresolvedLogs {
    fn default() -> Self {
        UnresolvedLogs {
            log_level: default_log_level(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedStartup {
    pub reset: Option<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl UnresolvedRdtConfig {
    pub fn resolve(self, config_path: impl AsRef<Path>) -> eyre::Result<RdtConfig> {
        let config_dir = config_path.as_ref().parent().ok_or_else(|| {
            eyre!(
                "config resolver was provided with invalid config path: {}",
                config_path.as_ref().display()
            )
        })?;

        let config = RdtConfig {
            backend: self.backend.resolve(config_dir),
            logs: self.logs.resolve(),
            startup: self.startup.resolve(),
        };
        Ok(config)
    }
}

impl UnresolvedBackend {
    pub fn resolve(self, config_dir: &Path) -> Backend {
        let kind = match self.kind {
            UnresolvedBackendKind::Resctrl => BackendKind::Resctrl,
            UnresolvedBackendKind::Msr => BackendKind::Msr,
        };

        Backend {
            kind,
            resctrl_root: config_dir.join(self.resctrl_root),
            mounts_file: self.mounts_file,
        }
    }
}

impl LogLevel {
    pub fn to_tracing_filter(&self) -> tracing_subscriber::filter::LevelFilter {
        use tracing_subscriber::filter::LevelFilter;

        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl UnresolvedLogs {
    pub fn resolve(self) -> Logs {
        Logs {
            log_level: self.log_level.to_tracing_filter(),
        }
    }
}

impl UnresolvedStartup {
    pub fn resolve(self) -> Startup {
        Startup { reset: self.reset }
    }
}
