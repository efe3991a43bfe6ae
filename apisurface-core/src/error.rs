//! Typed errors for apisurface.
//!
//! Each variant corresponds to one failure the pipeline can report: a
//! source file that cannot be read, decoded or parsed, a malformed
//! `apisurface.toml` or package manifest, or a bad command-line argument.
//! Per-file variants are logged and the file is skipped; only
//! [`ApiSurfaceError::InvalidArgument`] ends a run.

use std::path::PathBuf;
use thiserror::Error;

use crate::syntax::SyntaxError;

#[derive(Error, Debug)]
pub enum ApiSurfaceError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source file is not UTF-8.
    #[error("{path} is not valid UTF-8: {source}")]
    Encoding {
        path: PathBuf,
        #[source]
        source: std::str::Utf8Error,
    },

    /// Python syntax error; line and column are 1-indexed.
    #[error("{path}:{line}:{column}: {message}")]
    Syntax {
        path: PathBuf,
        message: String,
        line: usize,
        column: usize,
    },

    /// Malformed `apisurface.toml`.
    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Malformed `pyproject.toml`.
    #[error("invalid manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ApiSurfaceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn encoding(path: impl Into<PathBuf>, source: std::str::Utf8Error) -> Self {
        Self::Encoding {
            path: path.into(),
            source,
        }
    }

    /// Attaches the file path to a parser failure.
    pub fn syntax(path: impl Into<PathBuf>, err: SyntaxError) -> Self {
        Self::Syntax {
            path: path.into(),
            message: err.message,
            line: err.line,
            column: err.column,
        }
    }

    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type ApiResult<T> = Result<T, ApiSurfaceError>;

/// Adds the offending path to `std::io` failures.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> ApiResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> ApiResult<T> {
        self.map_err(|e| ApiSurfaceError::io(path, e))
    }
}
