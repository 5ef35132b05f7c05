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

/// Where a backend should put its own diagnostic output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogTarget {
    #[default]
    Stdout,
    Stderr,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    Silent,
    #[default]
    Default,
    Verbose,
}

/// The mechanism a backend should use to reach the hardware.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Interface {
    /// The kernel resource control interface.
    #[default]
    Os,
    /// Direct model specific register access.
    Msr,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendConfig {
    pub log_target: LogTarget,
    pub verbosity: Verbosity,
    pub interface: Interface,
}

impl BackendConfig {
    pub fn with_interface(interface: Interface) -> Self {
        Self {
            interface,
            ..Self::default()
        }
    }
}
