//! Analysis algorithms for sortwise.
//!
//! This crate works on the output of a scan and never writes to disk:
//!
//! - **Worthiness classification** - decide which directories are worth
//!   organizing from their content profile
//! - **Duplicate detection** - find identical files using size buckets and
//!   selective SHA-256 hashing
//!
//! # Worthiness
//!
//! ```rust,ignore
//! use sortwise_analyze::WorthinessClassifier;
//! use sortwise_scan::{CancelToken, ConcurrentScanner, ScanConfig};
//!
//! let result = ConcurrentScanner::new(ScanConfig::new("/path/to/scan"))?
//!     .scan(&CancelToken::new())?;
//!
//! for assessment in WorthinessClassifier::default().classify_all(&result) {
//!     println!("{}: {}", assessment.path.display(), assessment.worthiness);
//! }
//! ```
//!
//! # Duplicate Detection
//!
//! ```rust,ignore
//! use sortwise_analyze::DuplicateDetector;
//! use sortwise_scan::{CancelToken, ConcurrentScanner, ScanConfig};
//!
//! let cancel = CancelToken::new();
//! let result = ConcurrentScanner::new(ScanConfig::tree("/path/to/scan"))?.scan(&cancel)?;
//!
//! let report = DuplicateDetector::default().find_duplicates(&result.records, &cancel);
//!
//! println!("Found {} duplicate groups", report.groups.len());
//! println!("Wasted space: {} bytes", report.total_wasted_bytes);
//! ```

mod duplicates;
mod worthiness;

pub use duplicates::{
    DuplicateDetector, DuplicateGroup, DuplicateReport, UnverifiedGroup, UnverifiedReason,
};
pub use worthiness::{Assessment, OrganizeReason, SkipCause, Worthiness, WorthinessClassifier};

// Re-export core types
pub use sortwise_core::{ClassifierConfig, ContentHash, FileRecord, HashConfig};
