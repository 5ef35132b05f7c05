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

use std::fs;
use std::io;
use std::path::Path;

use crate::errors::ResctrlError;
use crate::ResctrlResult;

pub(crate) fn read(path: &Path) -> ResctrlResult<String> {
    fs::read_to_string(path).map_err(|error| ResctrlError::read(path, error))
}

/// Reads a file which a freshly created group might not have yet.
pub(crate) fn read_optional(path: &Path) -> ResctrlResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(ResctrlError::read(path, error)),
    }
}

pub(crate) fn read_number(path: &Path) -> ResctrlResult<u32> {
    let content = read(path)?;
    content
        .trim()
        .parse()
        .map_err(|error| ResctrlError::parse(path, error))
}

/// Every write is a single line, resctrl parses a write as a whole.
pub(crate) fn write_line(path: &Path, line: &str) -> ResctrlResult<()> {
    let mut data = line.to_string();
    if !data.ends_with('\n') {
        data.push('\n');
    }

    tracing::debug!("writing {:?} to {path:?}", data.trim_end());
    fs::write(path, &data).map_err(|error| ResctrlError::write(path, data, error))
}

/// Appends a line, used for `tasks` where each write moves one task.
pub(crate) fn append_line(path: &Path, line: &str) -> ResctrlResult<()> {
    use std::io::Write;

    let data = format!("{line}\n");
    tracing::debug!("appending {line:?} to {path:?}");
    fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .and_then(|mut file| file.write_all(data.as_bytes()))
        .map_err(|error| ResctrlError::write(path, data, error))
}
