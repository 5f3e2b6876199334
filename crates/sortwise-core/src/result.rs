//! Aggregate scan results.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::config::ScanMode;
use crate::error::ScanIssue;
use crate::profile::DirectoryProfile;
use crate::record::{FileCategory, FileRecord};

/// Lifecycle of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// Not started.
    Idle,
    /// Worker pool is running.
    Running,
    /// Every unit was merged.
    Completed,
    /// Stopped early; the result holds what was merged before that.
    Cancelled,
    /// No root could be scanned.
    Failed,
}

/// Why a directory was pruned before profiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// Name is on the system/package deny-list or has a deny-listed prefix.
    SystemName,
    /// Name matches a build/cache naming pattern.
    NamePattern,
    /// Mostly package files (scripts, binaries, libraries).
    PackageDirectory,
    /// Contains an "already organized" marker file.
    OrganizedMarker,
}

/// A directory pruned by the path filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDirectory {
    /// Pruned directory.
    #[serde(serialize_with = "crate::serde_path::lossy")]
    pub path: PathBuf,
    /// Rule that pruned it.
    pub reason: SkipReason,
}

/// Everything one unit of work produced, ready to be merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitOutcome {
    /// Profile of the unit's directory, if it could be listed at all.
    pub profile: Option<DirectoryProfile>,
    /// Regular files found.
    pub records: Vec<FileRecord>,
    /// Per-entry problems.
    pub errors: Vec<ScanIssue>,
    /// Subdirectories pruned by the filter.
    pub skipped: Vec<SkippedDirectory>,
}

/// Aggregate produced by one scan invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Roots that were scanned.
    #[serde(serialize_with = "crate::serde_path::lossy_seq")]
    pub roots: Vec<PathBuf>,
    /// Mode the scan ran in.
    pub mode: ScanMode,
    /// Every regular file seen. Order is not meaningful.
    pub records: Vec<FileRecord>,
    /// Profiles keyed by directory path.
    #[serde(serialize_with = "crate::serde_path::lossy_keys")]
    pub profiles: BTreeMap<PathBuf, DirectoryProfile>,
    /// Per-entry problems.
    pub errors: Vec<ScanIssue>,
    /// Roots that could not be scanned at all.
    pub failed_roots: Vec<ScanIssue>,
    /// Directories pruned by the filter.
    pub skipped: Vec<SkippedDirectory>,
    /// Final state (`Completed` or `Cancelled`).
    pub status: ScanState,
    /// Units merged into this result.
    pub units_completed: u64,
    /// Units that finished after cancellation and were dropped.
    pub units_discarded: u64,
    /// When the scan started.
    pub started_at: DateTime<Utc>,
    /// Wall time of the scan.
    pub duration: Duration,
}

impl ScanResult {
    /// Create an empty, running result.
    pub fn new(roots: Vec<PathBuf>, mode: ScanMode) -> Self {
        Self {
            roots,
            mode,
            records: Vec::new(),
            profiles: BTreeMap::new(),
            errors: Vec::new(),
            failed_roots: Vec::new(),
            skipped: Vec::new(),
            status: ScanState::Running,
            units_completed: 0,
            units_discarded: 0,
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }

    /// Merge one unit's outcome. Keys are paths, so merging is
    /// order-independent.
    pub fn merge(&mut self, outcome: UnitOutcome) {
        if let Some(profile) = outcome.profile {
            self.profiles.insert(profile.path.clone(), profile);
        }
        self.records.extend(outcome.records);
        self.errors.extend(outcome.errors);
        self.skipped.extend(outcome.skipped);
        self.units_completed += 1;
    }

    /// Whether the scan stopped before every unit was merged.
    pub fn is_partial(&self) -> bool {
        self.status == ScanState::Cancelled
    }

    /// Total number of files recorded.
    pub fn total_files(&self) -> u64 {
        self.records.len() as u64
    }

    /// Total size of all recorded files.
    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.size_bytes).sum()
    }

    /// Records whose parent directory is exactly `dir`.
    pub fn direct_children<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = &'a FileRecord> {
        self.records.iter().filter(move |r| r.parent() == Some(dir))
    }

    /// Directories with no files at any depth, sorted by path.
    ///
    /// Found bottom-up: a directory qualifies when it holds no files and
    /// every subdirectory it saw was itself profiled and found empty.
    /// Pruned, unreadable or unexpanded subdirectories count as content.
    /// Survey profiles are not linked to each other, so in that mode only
    /// directories without files or subdirectories qualify.
    pub fn empty_directories(&self) -> Vec<PathBuf> {
        let mut empty_children: HashMap<&Path, u64> = HashMap::new();
        let mut empty = Vec::new();

        // Descendants sort after their ancestors.
        for (path, profile) in self.profiles.iter().rev() {
            let nested_empty = match self.mode {
                ScanMode::Tree => empty_children.get(path.as_path()).copied().unwrap_or(0),
                ScanMode::Survey => 0,
            };
            if profile.is_empty() && profile.subdirectory_count == nested_empty {
                if let Some(parent) = path.parent() {
                    *empty_children.entry(parent).or_default() += 1;
                }
                empty.push(path.clone());
            }
        }

        empty.reverse();
        empty
    }

    /// Summary statistics for reporting.
    pub fn summary(&self, top_n: usize) -> ScanSummary {
        let mut category_counts: BTreeMap<FileCategory, u64> = BTreeMap::new();
        let mut extension_counts: BTreeMap<&CompactString, u64> = BTreeMap::new();
        for record in &self.records {
            *category_counts.entry(record.category).or_default() += 1;
            *extension_counts.entry(&record.extension).or_default() += 1;
        }

        let top_extensions = extension_counts
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
            .take(top_n)
            .map(|(ext, count)| (ext.clone(), count))
            .collect();

        let largest_files = self
            .records
            .iter()
            .sorted_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.path.cmp(&b.path)))
            .take(top_n)
            .map(|r| (r.path.clone(), r.size_bytes))
            .collect();

        ScanSummary {
            total_files: self.total_files(),
            total_bytes: self.total_bytes(),
            directories_profiled: self.profiles.len() as u64,
            directories_skipped: self.skipped.len() as u64,
            error_count: self.errors.len() as u64,
            partial: self.is_partial(),
            empty_directories: self.empty_directories(),
            category_counts,
            top_extensions,
            largest_files,
        }
    }
}

/// Headline numbers for a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Files recorded.
    pub total_files: u64,
    /// Bytes across recorded files.
    pub total_bytes: u64,
    /// Profiles produced.
    pub directories_profiled: u64,
    /// Directories pruned by the filter.
    pub directories_skipped: u64,
    /// Per-entry problems.
    pub error_count: u64,
    /// Whether the scan was cancelled.
    pub partial: bool,
    /// Directories with no files at any depth.
    #[serde(serialize_with = "crate::serde_path::lossy_seq")]
    pub empty_directories: Vec<PathBuf>,
    /// Files per category.
    pub category_counts: BTreeMap<FileCategory, u64>,
    /// Most common extensions, most frequent first.
    pub top_extensions: Vec<(CompactString, u64)>,
    /// Largest files, biggest first.
    #[serde(serialize_with = "crate::serde_path::lossy_pairs")]
    pub largest_files: Vec<(PathBuf, u64)>,
}
