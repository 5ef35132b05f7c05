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

#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![deny(
    dead_code,
    nonstandard_style,
    unused_imports,
    unused_mut,
    unused_variables,
    unused_unsafe,
    unreachable_patterns
)]

mod cpu_list;
mod errors;
mod fs_utils;
mod info;
mod mounts;
mod resctrl_backend;
mod schemata;

pub use cpu_list::format_cpu_list;
pub use cpu_list::parse_cpu_list;
pub use errors::ResctrlError;
pub use info::L3Info;
pub use info::MbInfo;
pub use info::ResctrlInfo;
pub use mounts::ResctrlMount;
pub use resctrl_backend::ResctrlBackend;
pub use resctrl_backend::DEFAULT_MOUNTS_FILE;
pub use resctrl_backend::DEFAULT_RESCTRL_ROOT;
pub use schemata::Schemata;

pub type ResctrlResult<T> = Result<T, ResctrlError>;
