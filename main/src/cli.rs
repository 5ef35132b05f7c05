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

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

use rdt_shared::types::BandwidthMode;
use rdt_shared::types::SocketIndex;

#[derive(Parser, Debug)]
#[command(about = "Partitions last level cache and memory bandwidth among classes of service")]
pub(crate) struct Args {
    #[arg(short, long)]
    pub(crate) config_path: String,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Print platform capabilities as JSON.
    Caps,
    /// Program cache way masks of a class.
    Cache {
        #[arg(long)]
        class: u32,
        /// Socket mask pairs like `0=0xff`.
        #[arg(long = "mask", required = true, value_parser = parse_socket_value::<u64>)]
        masks: Vec<(SocketIndex, u64)>,
    },
    /// Program memory bandwidth limits of a class.
    Mba {
        #[arg(long)]
        class: u32,
        #[arg(long, value_enum, default_value_t = MbaMode::Percentage)]
        mode: MbaMode,
        /// Socket limit pairs like `1=50`.
        #[arg(long = "limit", required = true, value_parser = parse_socket_value::<u32>)]
        limits: Vec<(SocketIndex, u32)>,
    },
    /// Associate cores with a class.
    BindCores {
        #[arg(long)]
        class: u32,
        #[arg(required = true)]
        cores: Vec<u32>,
    },
    /// Associate tasks with a class.
    BindTasks {
        #[arg(long)]
        class: u32,
        #[arg(required = true)]
        tasks: Vec<u32>,
    },
    /// Move cores back to the default class.
    Release {
        #[arg(required = true)]
        cores: Vec<u32>,
    },
    /// Pick a free class for the cores and print its id.
    Acquire {
        #[arg(required = true)]
        cores: Vec<u32>,
    },
    /// Return a class to the pool.
    ReleaseClass { class: u32 },
    /// Restore platform defaults, the mode is 0 (any), 1 (percentage) or 2 (absolute rate).
    Reset {
        #[arg(long, default_value_t = 0)]
        mode: i32,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum MbaMode {
    Percentage,
    Rate,
}

impl From<MbaMode> for BandwidthMode {
    fn from(mode: MbaMode) -> Self {
        match mode {
            MbaMode::Percentage => BandwidthMode::Percentage,
            MbaMode::Rate => BandwidthMode::AbsoluteRate,
        }
    }
}

pub(crate) trait ParseNumber: Sized {
    fn parse_number(value: &str) -> Result<Self, std::num::ParseIntError>;
}

impl ParseNumber for u32 {
    fn parse_number(value: &str) -> Result<Self, std::num::ParseIntError> {
        match value.strip_prefix("0x") {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => value.parse(),
        }
    }
}

impl ParseNumber for u64 {
    fn parse_number(value: &str) -> Result<Self, std::num::ParseIntError> {
        match value.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => value.parse(),
        }
    }
}

pub(crate) fn parse_socket_value<T: ParseNumber>(arg: &str) -> Result<(SocketIndex, T), String> {
    let (socket, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected SOCKET=VALUE, got {arg:?}"))?;
    let socket = socket
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid socket index {socket:?}: {e}"))?;
    let value =
        T::parse_number(value.trim()).map_err(|e| format!("invalid value {value:?}: {e}"))?;

    Ok((SocketIndex::from(socket), value))
}
