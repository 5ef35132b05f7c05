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

mod cli;
mod commands;

use clap::Parser;
use eyre::WrapErr as _;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use rdt_allocator::RdtController;
use rdt_config::load_config;
use rdt_config::BackendKind;
use rdt_config::RdtConfig;
use rdt_msr::MsrBackend;
use rdt_resctrl::ResctrlBackend;
use rdt_shared::backend::BackendConfig;
use rdt_shared::backend::Interface;
use rdt_shared::backend::RdtBackend;

use crate::cli::Args;
use crate::cli::Command;

fn main() -> eyre::Result<()> {
    let args = Args::parse();
    let config = load_config(args.config_path.as_str())?;

    let filter = EnvFilter::builder()
        .with_env_var("RUST_LOG")
        .with_default_directive(Directive::from(config.logs.log_level))
        .from_env_lossy();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .wrap_err("setting global tracing subscriber failed")?;
    tracing_log::LogTracer::init()?;

    tracing::info!("starting with config {config:?}");

    match config.backend.kind {
        BackendKind::Resctrl => {
            let backend = ResctrlBackend::new(
                config.backend.resctrl_root.clone(),
                config.backend.mounts_file.clone(),
            );
            let controller =
                RdtController::with_config(backend, BackendConfig::with_interface(Interface::Os));
            run(controller, &config, args.command)
        }
        BackendKind::Msr => {
            let controller = RdtController::with_config(
                MsrBackend::new(),
                BackendConfig::with_interface(Interface::Msr),
            );
            run(controller, &config, args.command)
        }
    }
}

fn run<B: RdtBackend>(
    controller: RdtController<B>,
    config: &RdtConfig,
    command: Command,
) -> eyre::Result<()> {
    controller
        .init()
        .wrap_err("failed to initialize the allocation backend")?;

    if let Some(mode) = config.startup.reset {
        if let Err(error) = controller.reset_to_defaults_raw(mode) {
            shutdown(&controller);
            return Err(error).wrap_err("startup reset failed");
        }
    }

    let result = commands::execute(&controller, command);
    shutdown(&controller);
    result
}

// The command outcome matters more than a failed shutdown, which is only logged.
fn shutdown<B: RdtBackend>(controller: &RdtController<B>) {
    if let Err(error) = controller.shutdown() {
        tracing::warn!("shutdown of the allocation backend failed: {error}");
    }
}
