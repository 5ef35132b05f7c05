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

use eyre::WrapErr as _;

use rdt_allocator::RdtController;
use rdt_shared::backend::RdtBackend;
use rdt_shared::types::ClassId;
use rdt_shared::types::LogicalCoreId;
use rdt_shared::types::TaskId;

use crate::cli::Command;

pub(crate) fn execute<B: RdtBackend>(
    controller: &RdtController<B>,
    command: Command,
) -> eyre::Result<()> {
    match command {
        Command::Caps => {
            let capabilities = controller.query_capabilities()?;
            let free_classes = controller.free_class_count()?;
            let report = serde_json::json!({
                "capabilities": capabilities,
                "free_classes": free_classes,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Cache { class, masks } => {
            controller
                .apply_cache_allocation(ClassId::new(class), &masks)
                .wrap_err_with(|| format!("failed to program cache masks of class {class}"))?;
        }
        Command::Mba {
            class,
            mode,
            limits,
        } => {
            let applied = controller
                .apply_bandwidth_allocation(ClassId::new(class), mode.into(), &limits)
                .wrap_err_with(|| format!("failed to program bandwidth of class {class}"))?;
            println!("{}", serde_json::to_string_pretty(&applied)?);
        }
        Command::BindCores { class, cores } => {
            controller.bind_cores(ClassId::new(class), &core_ids(cores))?;
        }
        Command::BindTasks { class, tasks } => {
            let tasks = tasks.into_iter().map(TaskId::from).collect::<Vec<_>>();
            controller.bind_tasks(ClassId::new(class), &tasks)?;
        }
        Command::Release { cores } => {
            controller.release_cores(&core_ids(cores))?;
        }
        Command::Acquire { cores } => {
            let class_id = controller.acquire_class(&core_ids(cores))?;
            println!("{class_id}");
        }
        Command::ReleaseClass { class } => {
            controller.release_class(ClassId::new(class))?;
        }
        Command::Reset { mode } => {
            controller.reset_to_defaults_raw(mode)?;
        }
    }

    Ok(())
}

fn core_ids(cores: Vec<u32>) -> Vec<LogicalCoreId> {
    cores.into_iter().map(LogicalCoreId::from).collect()
}
