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

use config::Config;
use config::Environment;
use config::File;
use config::FileFormat;
use eyre::Context;

use crate::unresolved_config::UnresolvedRdtConfig;
use crate::RdtConfig;

const ENV_PREFIX: &str = "RDT";
const ENV_SEPARATOR: &str = "_";

/// Loads the TOML file at `path`, `RDT_*` environment variables are merged
/// in with the file taking precedence.
pub fn load_config(path: impl AsRef<Path>) -> eyre::Result<RdtConfig> {
    let path = path.as_ref();
    let file_source = File::from(path).required(true).format(FileFormat::Toml);
    let environment_source = Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR);

    let unresolved: UnresolvedRdtConfig = Config::builder()
        .add_source(environment_source)
        .add_source(file_source)
        .build()
        .and_then(Config::try_deserialize)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    unresolved.resolve(path)
}
