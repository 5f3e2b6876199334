//! Directory filtering, profiling and concurrent scanning for sortwise.
//!
//! # Overview
//!
//! `sortwise-scan` turns one or more root directories into a
//! [`ScanResult`]: a set of per-directory content profiles plus every
//! regular file seen. Key features:
//!
//! - **Pruning** of system, package and already-organized directories
//! - **Bounded-depth profiling** via jwalk, never following symlinks
//! - **Fixed-size worker pool** with a single merging thread
//! - **Cooperative cancellation** that keeps what was already merged
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use sortwise_scan::{CancelToken, ConcurrentScanner, ScanConfig};
//!
//! let scanner = ConcurrentScanner::new(ScanConfig::tree("/path/to/scan")).unwrap();
//! let result = scanner.scan(&CancelToken::new()).unwrap();
//!
//! println!("Directories: {}", result.profiles.len());
//! println!("Total files: {}", result.total_files());
//! ```
//!
//! # Progress Monitoring
//!
//! Subscribe to progress updates, or pass a callback that runs on the
//! merging thread:
//!
//! ```rust,no_run
//! use sortwise_scan::{CancelToken, ConcurrentScanner, ScanConfig};
//!
//! let scanner = ConcurrentScanner::new(ScanConfig::new("/path/to/scan")).unwrap();
//! let _result = scanner
//!     .scan_with(&CancelToken::new(), |event| {
//!         println!("{}/{} directories", event.completed, event.total);
//!     })
//!     .unwrap();
//! ```

mod filter;
mod profiler;
mod scanner;

pub use filter::PathFilter;
pub use profiler::{DirectoryProfiler, ProfileOutcome};
pub use scanner::ConcurrentScanner;

// Re-export core types for convenience
pub use sortwise_core::{
    CancelToken, DirectoryProfile, ErrorKind, FileCategory, FileRecord, FilterConfig, Phase,
    ProgressEvent, ScanConfig, ScanError, ScanIssue, ScanMode, ScanResult, ScanState,
    SkipReason, SkippedDirectory,
};
