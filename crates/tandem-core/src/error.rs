// SPDX-License-Identifier: CEPL-1.0
use std::panic::Location;
use std::path::PathBuf;

use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{kind} `{name}` is not available")]
    Unavailable { kind: &'static str, name: String },

    #[error("{kind} `{name}` is required but was not requested")]
    NotRequested { kind: &'static str, name: String },

    #[error("failed to compile shader {path}: {log}")]
    Compilation { path: PathBuf, log: String },

    #[error("failed to link program: {0}")]
    Linkage(String),

    #[error("{call} returned {status}")]
    NativeCall { call: &'static str, status: String },

    #[error("invalid state: {0}")]
    State(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config: {0}")]
    Config(String),

    #[error("mesh line {line}: {message}")]
    Mesh { line: usize, message: String },
}

impl RenderError {
    pub fn unavailable(kind: &'static str, name: impl Into<String>) -> Self {
        Self::Unavailable {
            kind,
            name: name.into(),
        }
    }

    pub fn native(call: &'static str, status: impl std::fmt::Debug) -> Self {
        Self::NativeCall {
            call,
            status: format!("{status:?}"),
        }
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Logs the error with the caller's source location and hands it back, so
    /// the detection site can write `return Err(RenderError::...().report())`.
    /// Callers further up propagate with `?` and do not log again.
    #[track_caller]
    pub fn report(self) -> Self {
        let at = Location::caller();
        tracing::error!(location = %format_args!("{}:{}", at.file(), at.line()), "{self}");
        self
    }
}
