//! Progress events emitted by the scanner and the duplicate detector.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;

/// Work phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Directory profiling.
    #[strum(to_string = "Profiling")]
    Profiling,
    /// Content hashing.
    #[strum(to_string = "Hashing")]
    Hashing,
}

/// Discrete progress update: units completed out of units known so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Phase that produced the event.
    pub phase: Phase,
    /// Units finished (directories merged, or files hashed).
    pub completed: u64,
    /// Units known so far. Grows during a tree walk.
    pub total: u64,
    /// Path of the unit that just finished.
    #[serde(serialize_with = "crate::serde_path::lossy_option")]
    pub current_path: Option<PathBuf>,
    /// Errors recorded so far.
    pub errors_count: u64,
    /// Time since the phase started.
    pub elapsed: Duration,
}
