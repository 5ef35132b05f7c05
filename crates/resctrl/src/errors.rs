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

use std::io;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error as ThisError;

use rdt_shared::backend::BackendError;

#[derive(ThisError, Debug)]
pub enum ResctrlError {
    #[error("resctrl filesystem isn't mounted at {root:?}")]
    NotMounted { root: PathBuf },

    #[error("reading {path:?} failed: {io_error}")]
    Read { path: PathBuf, io_error: io::Error },

    #[error("writing {data:?} to {path:?} failed: {io_error}")]
    Write {
        path: PathBuf,
        data: String,
        io_error: io::Error,
    },

    #[error("removing group {path:?} failed: {io_error}")]
    RemoveGroup { path: PathBuf, io_error: io::Error },

    #[error("{path:?} has malformed content: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("resctrl exposes no {resource} resource")]
    MissingResource { resource: &'static str },
}

impl ResctrlError {
    pub(crate) fn read(path: &Path, io_error: io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            io_error,
        }
    }

    pub(crate) fn write(path: &Path, data: impl Into<String>, io_error: io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            data: data.into(),
            io_error,
        }
    }

    pub(crate) fn remove_group(path: &Path, io_error: io::Error) -> Self {
        Self::RemoveGroup {
            path: path.to_path_buf(),
            io_error,
        }
    }

    pub(crate) fn parse(path: &Path, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl From<ResctrlError> for BackendError {
    fn from(error: ResctrlError) -> Self {
        match error {
            ResctrlError::Read { io_error, .. } => BackendError::IoError(io_error),
            error @ (ResctrlError::NotMounted { .. } | ResctrlError::MissingResource { .. }) => {
                BackendError::unsupported(error)
            }
            error => BackendError::rejected(error),
        }
    }
}
