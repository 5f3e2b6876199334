//! Error types for scanning and hashing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors that stop a scan before or while it starts.
///
/// Per-entry failures never surface as a `ScanError`; they are collected as
/// [`ScanIssue`]s on the result instead.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a root path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Root path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error on a root path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// None of the configured roots could be scanned.
    #[error("All {count} root(s) were inaccessible")]
    AllRootsFailed { count: usize },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The worker pool could not be created.
    #[error("Failed to start worker pool: {message}")]
    WorkerPool { message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Kind of a non-fatal, per-path problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Permission was denied.
    AccessDenied,
    /// Transient read failure.
    IoError,
    /// The path vanished.
    PathNotFound,
    /// Reading a file failed part way through hashing.
    HashComputationFailed,
}

impl ErrorKind {
    /// Classify an I/O error.
    pub fn from_io(error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::AccessDenied,
            std::io::ErrorKind::NotFound => Self::PathNotFound,
            _ => Self::IoError,
        }
    }
}

/// Non-fatal problem attributed to a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanIssue {
    /// Path where the problem occurred.
    #[serde(serialize_with = "crate::serde_path::lossy")]
    pub path: PathBuf,
    /// Kind of problem.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl ScanIssue {
    /// Create a new issue.
    pub fn new(path: impl Into<PathBuf>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create an issue from an I/O error, classifying it by kind.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self {
            path: path.into(),
            kind: ErrorKind::from_io(error),
            message: error.to_string(),
        }
    }

    /// Create a hashing failure issue.
    pub fn hash_failed(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self {
            path: path.into(),
            kind: ErrorKind::HashComputationFailed,
            message: format!("Hash failed: {error}"),
        }
    }
}
