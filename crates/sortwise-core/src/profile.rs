//! Per-directory content summaries.

use std::collections::BTreeMap;
use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::record::{FileCategory, FileRecord};

/// Content summary of one directory, built from its [`FileRecord`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryProfile {
    /// Directory that was profiled.
    #[serde(serialize_with = "crate::serde_path::lossy")]
    pub path: PathBuf,
    /// Number of regular files counted, at every profiled level.
    pub total_files: u64,
    /// Files directly inside `path`. Equals `total_files` when
    /// `depth_limit` is 0.
    pub direct_files: u64,
    /// Sum of file sizes in bytes.
    pub total_bytes: u64,
    /// Files per category.
    pub category_counts: BTreeMap<FileCategory, u64>,
    /// Files per normalized extension (the empty key means "no extension").
    pub extension_counts: BTreeMap<CompactString, u64>,
    /// Number of distinct keys in `extension_counts`.
    pub distinct_extension_count: u64,
    /// Subdirectories encountered, expanded or not.
    pub subdirectory_count: u64,
    /// Depth the profile was built with (0 = direct children only).
    pub depth_limit: u32,
}

impl DirectoryProfile {
    /// Create an empty profile for a directory.
    pub fn new(path: impl Into<PathBuf>, depth_limit: u32) -> Self {
        Self {
            path: path.into(),
            total_files: 0,
            direct_files: 0,
            total_bytes: 0,
            category_counts: BTreeMap::new(),
            extension_counts: BTreeMap::new(),
            distinct_extension_count: 0,
            subdirectory_count: 0,
            depth_limit,
        }
    }

    /// Build a profile from a set of records.
    pub fn from_records<'a>(
        path: impl Into<PathBuf>,
        depth_limit: u32,
        records: impl IntoIterator<Item = &'a FileRecord>,
    ) -> Self {
        let mut profile = Self::new(path, depth_limit);
        for record in records {
            profile.record_file(record);
        }
        profile
    }

    /// Add a file to the profile.
    pub fn record_file(&mut self, record: &FileRecord) {
        self.total_files += 1;
        if record.parent() == Some(self.path.as_path()) {
            self.direct_files += 1;
        }
        self.total_bytes += record.size_bytes;
        *self.category_counts.entry(record.category).or_default() += 1;

        let count = self
            .extension_counts
            .entry(record.extension.clone())
            .or_default();
        if *count == 0 {
            self.distinct_extension_count += 1;
        }
        *count += 1;
    }

    /// Note a subdirectory.
    pub fn record_subdirectory(&mut self) {
        self.subdirectory_count += 1;
    }

    /// Number of files in a category.
    pub fn count(&self, category: FileCategory) -> u64 {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    /// Fraction of files that are media, 0 for an empty directory.
    pub fn media_ratio(&self) -> f64 {
        self.count(FileCategory::Media) as f64 / self.total_files.max(1) as f64
    }

    /// Whether no files were counted.
    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }
}
