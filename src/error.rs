use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MirrorError {
    #[error("failed to connect to {host}: {message}")]
    Connection { host: String, message: String },

    #[error("remote transfer of {path} failed: {message}")]
    Transfer { path: String, message: String },

    #[error("remote returned status {status} for {path}")]
    RemoteStatus { status: u16, path: String },

    #[error("session already closed")]
    SessionClosed,

    #[error("unsafe sample identifier: {0:?}")]
    UnsafeIdentifier(String),

    #[error("manifest {path} has no column named {column}")]
    ManifestColumn { path: PathBuf, column: String },

    #[error("dataset file not found: {0}")]
    DatasetFileMissing(PathBuf),

    #[error("malformed CSV in {path}: {message}")]
    Csv { path: PathBuf, message: String },

    #[error("{path}: row {row}, column {column}: not a number: {value:?}")]
    InvalidNumber {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error("missing config file at {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl MirrorError {
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            MirrorError::Connection { .. }
                | MirrorError::Transfer { .. }
                | MirrorError::RemoteStatus { .. }
                | MirrorError::SessionClosed
        )
    }
}
