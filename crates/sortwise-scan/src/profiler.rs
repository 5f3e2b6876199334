//! Single-directory content profiling.

use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};

use sortwise_core::{DirectoryProfile, ErrorKind, FileRecord, ScanIssue};

/// Everything produced by profiling one directory.
#[derive(Debug, Clone)]
pub struct ProfileOutcome {
    /// Summary of the files found.
    pub profile: DirectoryProfile,
    /// Regular files found, in walk order.
    pub records: Vec<FileRecord>,
    /// Entries that could not be read.
    pub errors: Vec<ScanIssue>,
    /// Directories at the depth boundary, present but not expanded.
    pub unexpanded: Vec<PathBuf>,
    /// Whether the directory itself could be listed.
    pub listed: bool,
}

/// Walks one directory down to a bounded depth and summarizes its files.
///
/// Symbolic links are never followed or recorded. Unreadable entries are
/// reported as issues and the rest of the directory is still profiled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryProfiler;

impl DirectoryProfiler {
    /// Create a new profiler.
    pub fn new() -> Self {
        Self
    }

    /// Profile `path`. A `depth_limit` of 0 looks at direct children only.
    pub fn profile(&self, path: &Path, depth_limit: u32) -> ProfileOutcome {
        let mut outcome = ProfileOutcome {
            profile: DirectoryProfile::new(path, depth_limit),
            records: Vec::new(),
            errors: Vec::new(),
            unexpanded: Vec::new(),
            listed: true,
        };

        if let Err(err) = std::fs::symlink_metadata(path) {
            outcome.listed = false;
            outcome.errors.push(ScanIssue::from_io(path, &err));
            return outcome;
        }

        // Each worker already runs on the scanner's pool, so walk serially here.
        let boundary = depth_limit as usize + 1;
        let walker = WalkDir::new(path)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .max_depth(boundary);

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let err_path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| path.to_path_buf());
                    if err_path == path {
                        outcome.listed = false;
                    }
                    outcome.errors.push(match err.io_error() {
                        Some(io) => ScanIssue::from_io(err_path, io),
                        None => ScanIssue::new(err_path, ErrorKind::IoError, err.to_string()),
                    });
                    continue;
                }
            };

            let depth = entry.depth();
            let entry_path = entry.path();

            if let Some(err) = &entry.read_children_error {
                if depth == 0 {
                    outcome.listed = false;
                }
                outcome.errors.push(match err.io_error() {
                    Some(io) => ScanIssue::from_io(&entry_path, io),
                    None => ScanIssue::new(&entry_path, ErrorKind::IoError, err.to_string()),
                });
            }

            if depth == 0 {
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                continue;
            }

            if file_type.is_dir() {
                outcome.profile.record_subdirectory();
                if depth == boundary {
                    outcome.unexpanded.push(entry_path);
                }
            } else if file_type.is_file() {
                match entry.metadata() {
                    Ok(metadata) => {
                        let record = FileRecord::new(
                            entry_path,
                            metadata.len(),
                            metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
                        );
                        outcome.profile.record_file(&record);
                        outcome.records.push(record);
                    }
                    Err(err) => {
                        outcome.errors.push(match err.io_error() {
                            Some(io) => ScanIssue::from_io(&entry_path, io),
                            None => {
                                ScanIssue::new(&entry_path, ErrorKind::IoError, err.to_string())
                            }
                        });
                    }
                }
            }
        }

        outcome
    }
}
