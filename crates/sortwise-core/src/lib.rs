//! Core types and configuration for sortwise.
//!
//! This crate holds the plain data shared by the scanner and the analyzers:
//! file records, directory profiles, the scan aggregate, configuration,
//! errors, cancellation and progress events. None of it performs I/O.

mod cancel;
mod config;
mod error;
mod profile;
mod progress;
mod record;
mod result;
pub mod serde_path;

pub use cancel::CancelToken;
pub use config::{
    ClassifierConfig, ClassifierConfigBuilder, DEFAULT_CHUNK_SIZE_BYTES,
    DEFAULT_DOCUMENT_COUNT_THRESHOLD, DEFAULT_HASH_MAX_BYTES, DEFAULT_HASH_MIN_BYTES,
    DEFAULT_MEDIA_RATIO_THRESHOLD, DEFAULT_MIXED_DISTINCT_EXT_THRESHOLD,
    DEFAULT_MIXED_FILE_COUNT_THRESHOLD, DEFAULT_SURVEY_DEPTH, FilterConfig, FilterConfigBuilder,
    HashConfig, HashConfigBuilder, ScanConfig, ScanConfigBuilder, ScanMode, resolve_workers,
};
pub use error::{ErrorKind, ScanError, ScanIssue};
pub use profile::DirectoryProfile;
pub use progress::{Phase, ProgressEvent};
pub use record::{ContentHash, FileCategory, FileRecord, normalized_extension};
pub use result::{
    ScanResult, ScanState, ScanSummary, SkipReason, SkippedDirectory, UnitOutcome,
};
