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

use std::io::Write;
use std::path::PathBuf;

use crate::config_loader::load_config;
use crate::Backend;
use crate::BackendKind;
use crate::Logs;
use crate::RdtConfig;
use crate::Startup;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn parse_basic_config() {
    let mut manifest_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_path.push("src/tests/default.toml");

    let actual_config = load_config(&manifest_path).unwrap();

    let mut tests_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    tests_dir.push("src/tests");

    let expected_config = RdtConfig {
        backend: Backend {
            kind: BackendKind::Msr,
            resctrl_root: tests_dir.join("fake-resctrl"),
            mounts_file: PathBuf::from("/tmp/mounts"),
        },
        logs: Logs {
            log_level: tracing_subscriber::filter::LevelFilter::WARN,
        },
        startup: Startup { reset: Some(2) },
    };

    assert_eq!(actual_config, expected_config);
}

#[test]
fn empty_config_uses_defaults() {
    let file = write_config("");

    let actual_config = load_config(file.path()).unwrap();

    let expected_config = RdtConfig {
        backend: Backend::default(),
        logs: Logs::default(),
        startup: Startup::default(),
    };
    assert_eq!(actual_config, expected_config);
    assert_eq!(
        actual_config.logs.log_level,
        tracing_subscriber::filter::LevelFilter::ERROR
    );
}

#[test]
fn absolute_resctrl_root_is_kept() {
    let file = write_config(
        r#"
[backend]
resctrl-root = "/mnt/resctrl"
"#,
    );

    let actual_config = load_config(file.path()).unwrap();

    assert_eq!(actual_config.backend.kind, BackendKind::Resctrl);
    assert_eq!(
        actual_config.backend.resctrl_root,
        PathBuf::from("/mnt/resctrl")
    );
}

#[test]
fn unknown_backend_kind_is_rejected() {
    let file = write_config(
        r#"
[backend]
kind = "pqos"
"#,
    );

    let result = load_config(file.path());

    assert!(result.is_err());
}

#[test]
fn missing_config_file_is_an_error() {
    let result = load_config("/nonexistent/rdtctl.toml");

    assert!(result.is_err());
}
