//! Scan, filter, classification and hashing configuration.
//!
//! Every threshold and deny-list lives here as plain data so callers can
//! swap in alternate values without touching the algorithms.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default fraction of media files that makes a directory worth organizing.
pub const DEFAULT_MEDIA_RATIO_THRESHOLD: f64 = 0.30;
/// Default document count that makes a directory worth organizing.
pub const DEFAULT_DOCUMENT_COUNT_THRESHOLD: u64 = 20;
/// Default file count for the mixed-content rule.
pub const DEFAULT_MIXED_FILE_COUNT_THRESHOLD: u64 = 50;
/// Default distinct extension count for the mixed-content rule.
pub const DEFAULT_MIXED_DISTINCT_EXT_THRESHOLD: u64 = 5;

/// Smallest file hashed by default.
pub const DEFAULT_HASH_MIN_BYTES: u64 = 100;
/// Largest file hashed by default.
pub const DEFAULT_HASH_MAX_BYTES: u64 = 100 * 1024 * 1024;
/// Default read size while hashing.
pub const DEFAULT_CHUNK_SIZE_BYTES: usize = 128 * 1024;

/// Default profiling depth for survey candidates (direct children only).
pub const DEFAULT_SURVEY_DEPTH: u32 = 0;

/// Number of worker threads for a configured count (0 = one per CPU).
pub fn resolve_workers(configured: usize) -> usize {
    if configured == 0 {
        num_cpus::get().max(1)
    } else {
        configured
    }
}

/// How the scanner turns roots into units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// One unit per unfiltered child directory of each root, each profiled
    /// down to `depth_limit`.
    #[default]
    Survey,
    /// One unit per directory of the whole tree, each profiled a single
    /// level deep; subdirectories are queued as new units.
    Tree,
}

/// Configuration for scanning operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root paths to scan.
    pub roots: Vec<PathBuf>,

    /// How roots are split into units.
    #[builder(default)]
    #[serde(default)]
    pub mode: ScanMode,

    /// Levels below each survey candidate to expand (0 = direct children).
    #[builder(default = "DEFAULT_SURVEY_DEPTH")]
    #[serde(default = "default_survey_depth")]
    pub depth_limit: u32,

    /// Deepest directory queued in tree mode, relative to its root
    /// (None = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Number of worker threads (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// Directory filtering rules.
    #[builder(default)]
    #[serde(default)]
    pub filter: FilterConfig,
}

fn default_survey_depth() -> u32 {
    DEFAULT_SURVEY_DEPTH
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.roots {
            Some(ref roots) if roots.is_empty() => {
                return Err("At least one root path is required".to_string());
            }
            Some(ref roots) => {
                if roots.iter().any(|r| r.as_os_str().is_empty()) {
                    return Err("Root path cannot be empty".to_string());
                }
            }
            None => return Err("Root path is required".to_string()),
        }
        if let Some(ref filter) = self.filter {
            filter.validate()?;
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a survey config for a single root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
            mode: ScanMode::Survey,
            depth_limit: DEFAULT_SURVEY_DEPTH,
            max_depth: None,
            workers: 0,
            filter: FilterConfig::default(),
        }
    }

    /// Create a full tree walk config for a single root.
    pub fn tree(root: impl Into<PathBuf>) -> Self {
        Self {
            mode: ScanMode::Tree,
            ..Self::new(root)
        }
    }

    /// Set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Depth each unit is profiled to under the configured mode.
    pub fn unit_depth(&self) -> u32 {
        match self.mode {
            ScanMode::Survey => self.depth_limit,
            ScanMode::Tree => 0,
        }
    }
}

/// Rules deciding which directories are pruned before profiling.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
#[serde(default)]
pub struct FilterConfig {
    /// Exact directory names to skip.
    #[builder(default = "default_skip_names()")]
    pub skip_names: Vec<String>,

    /// Name prefixes to skip (output of earlier organizing runs).
    #[builder(default = "default_skip_prefixes()")]
    pub skip_prefixes: Vec<String>,

    /// Glob patterns matched against the directory name.
    #[builder(default = "default_skip_patterns()")]
    pub skip_patterns: Vec<String>,

    /// Files whose presence marks a directory as already organized.
    #[builder(default = "default_marker_files()")]
    pub marker_files: Vec<String>,

    /// Name fragments that hint at an installed package.
    #[builder(default = "default_package_indicators()")]
    pub package_indicators: Vec<String>,

    /// Extensions counted as package content when peeking.
    #[builder(default = "default_package_extensions()")]
    pub package_extensions: Vec<String>,

    /// Entries sampled when peeking into a possible package directory.
    #[builder(default = "20")]
    pub package_sample_size: usize,

    /// Fraction of sampled entries above which the directory is a package.
    #[builder(default = "0.5")]
    pub package_ratio: f64,

    /// Compare names case-insensitively.
    #[builder(default = "true")]
    pub case_insensitive: bool,
}

impl FilterConfig {
    /// Create a new filter config builder.
    pub fn builder() -> FilterConfigBuilder {
        FilterConfigBuilder::default()
    }

    /// A config that skips nothing.
    pub fn permissive() -> Self {
        Self {
            skip_names: Vec::new(),
            skip_prefixes: Vec::new(),
            skip_patterns: Vec::new(),
            marker_files: Vec::new(),
            package_indicators: Vec::new(),
            package_extensions: Vec::new(),
            package_sample_size: 0,
            package_ratio: 1.0,
            case_insensitive: true,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.package_ratio) {
            return Err(format!(
                "package_ratio must be within 0..=1, got {}",
                self.package_ratio
            ));
        }
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            skip_names: default_skip_names(),
            skip_prefixes: default_skip_prefixes(),
            skip_patterns: default_skip_patterns(),
            marker_files: default_marker_files(),
            package_indicators: default_package_indicators(),
            package_extensions: default_package_extensions(),
            package_sample_size: 20,
            package_ratio: 0.5,
            case_insensitive: true,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn default_skip_names() -> Vec<String> {
    strings(&[
        // package managers and environments
        "node_modules",
        "__pycache__",
        ".git",
        ".svn",
        ".hg",
        "vendor",
        "site-packages",
        "pip",
        "conda",
        "anaconda3",
        "miniconda3",
        "venv",
        "virtualenv",
        ".venv",
        "env",
        ".env",
        // system and cache
        "System Volume Information",
        "$RECYCLE.BIN",
        "Recovery",
        ".Trash",
        ".cache",
        "cache",
        "temp",
        "tmp",
        "temporary files",
        "AppData",
        "Application Data",
        "ProgramData",
        "Program Files",
        "Program Files (x86)",
        "Windows",
        "System32",
        "SysWOW64",
        // build output
        "build",
        "dist",
        "target",
        "bin",
        "obj",
        ".vs",
        ".vscode",
        ".idea",
        "Debug",
        "Release",
        "x64",
        "x86",
        "out",
        // sync clients
        ".dropbox",
        ".onedrive",
        ".googledrive",
        "iCloud",
        ".sync",
    ])
}

fn default_skip_prefixes() -> Vec<String> {
    strings(&[
        "Organized_",
        "Analysis_Report_",
        "Backup_",
        "Archive_",
        "Smart_Analysis_",
    ])
}

fn default_skip_patterns() -> Vec<String> {
    strings(&[
        "$*", ".*", "~*", "#*", "*_cache", "*_temp", "*_backup", "*.tmp", "*.cache",
    ])
}

fn default_marker_files() -> Vec<String> {
    strings(&[".organized"])
}

fn default_package_indicators() -> Vec<String> {
    strings(&["setup", "install", "package", "lib", "include", "share"])
}

fn default_package_extensions() -> Vec<String> {
    strings(&["py", "pyc", "exe", "dll", "so", "a", "lib"])
}

/// Thresholds for the worthiness rules.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum media fraction (inclusive).
    #[builder(default = "DEFAULT_MEDIA_RATIO_THRESHOLD")]
    pub media_ratio_threshold: f64,

    /// Minimum document count (inclusive).
    #[builder(default = "DEFAULT_DOCUMENT_COUNT_THRESHOLD")]
    pub document_count_threshold: u64,

    /// Minimum file count for mixed content (inclusive).
    #[builder(default = "DEFAULT_MIXED_FILE_COUNT_THRESHOLD")]
    pub mixed_file_count_threshold: u64,

    /// Minimum distinct extensions for mixed content (inclusive).
    #[builder(default = "DEFAULT_MIXED_DISTINCT_EXT_THRESHOLD")]
    pub mixed_distinct_ext_threshold: u64,
}

impl ClassifierConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ratio) = self.media_ratio_threshold {
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(format!("media_ratio_threshold must be >= 0, got {ratio}"));
            }
        }
        Ok(())
    }
}

impl ClassifierConfig {
    /// Create a new classifier config builder.
    pub fn builder() -> ClassifierConfigBuilder {
        ClassifierConfigBuilder::default()
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            media_ratio_threshold: DEFAULT_MEDIA_RATIO_THRESHOLD,
            document_count_threshold: DEFAULT_DOCUMENT_COUNT_THRESHOLD,
            mixed_file_count_threshold: DEFAULT_MIXED_FILE_COUNT_THRESHOLD,
            mixed_distinct_ext_threshold: DEFAULT_MIXED_DISTINCT_EXT_THRESHOLD,
        }
    }
}

/// Configuration for selective content hashing.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct HashConfig {
    /// Smallest file size to hash (inclusive).
    #[builder(default = "DEFAULT_HASH_MIN_BYTES")]
    pub hash_min_bytes: u64,

    /// Largest file size to hash (inclusive).
    #[builder(default = "DEFAULT_HASH_MAX_BYTES")]
    pub hash_max_bytes: u64,

    /// Bytes read per chunk while hashing.
    #[builder(default = "DEFAULT_CHUNK_SIZE_BYTES")]
    pub chunk_size_bytes: usize,

    /// Number of hashing threads (0 = auto-detect).
    #[builder(default = "0")]
    pub workers: usize,
}

impl HashConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.chunk_size_bytes == Some(0) {
            return Err("chunk_size_bytes must be positive".to_string());
        }
        let min = self.hash_min_bytes.unwrap_or(DEFAULT_HASH_MIN_BYTES);
        let max = self.hash_max_bytes.unwrap_or(DEFAULT_HASH_MAX_BYTES);
        if min > max {
            return Err(format!(
                "hash_min_bytes ({min}) must not exceed hash_max_bytes ({max})"
            ));
        }
        Ok(())
    }
}

impl HashConfig {
    /// Create a new hash config builder.
    pub fn builder() -> HashConfigBuilder {
        HashConfigBuilder::default()
    }

    /// Whether a file of this size falls in the hashed range.
    pub fn in_range(&self, size: u64) -> bool {
        (self.hash_min_bytes..=self.hash_max_bytes).contains(&size)
    }
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            hash_min_bytes: DEFAULT_HASH_MIN_BYTES,
            hash_max_bytes: DEFAULT_HASH_MAX_BYTES,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
            workers: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::builder()
            .roots(vec![PathBuf::from("/home/user")])
            .workers(4usize)
            .mode(ScanMode::Tree)
            .build()
            .unwrap();

        assert_eq!(config.roots, vec![PathBuf::from("/home/user")]);
        assert_eq!(config.workers, 4);
        assert_eq!(config.unit_depth(), 0);
    }

    #[test]
    fn test_config_requires_root() {
        assert!(ScanConfig::builder().build().is_err());
        assert!(ScanConfig::builder().roots(Vec::<PathBuf>::new()).build().is_err());
    }

    #[test]
    fn test_resolve_workers() {
        assert_eq!(resolve_workers(3), 3);
        assert!(resolve_workers(0) >= 1);
    }

    #[test]
    fn test_config_simple() {
        let config = ScanConfig::new("/home/user");
        assert_eq!(config.mode, ScanMode::Survey);
        assert_eq!(config.unit_depth(), DEFAULT_SURVEY_DEPTH);
        assert_eq!(config.workers, 0);
    }

    #[test]
    fn test_filter_defaults() {
        let filter = FilterConfig::default();
        assert!(filter.skip_names.iter().any(|n| n == "node_modules"));
        assert!(filter.skip_prefixes.iter().any(|n| n == "Organized_"));
        assert!(filter.case_insensitive);

        let built = FilterConfig::builder().build().unwrap();
        assert_eq!(built.skip_names, filter.skip_names);
    }

    #[test]
    fn test_classifier_defaults() {
        let config = ClassifierConfig::default();
        assert_eq!(config.media_ratio_threshold, 0.30);
        assert_eq!(config.document_count_threshold, 20);
        assert_eq!(config.mixed_file_count_threshold, 50);
        assert_eq!(config.mixed_distinct_ext_threshold, 5);

        assert!(ClassifierConfig::builder()
            .media_ratio_threshold(f64::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn test_hash_config_validation() {
        assert!(HashConfig::builder().chunk_size_bytes(0usize).build().is_err());
        assert!(HashConfig::builder()
            .hash_min_bytes(500u64)
            .hash_max_bytes(100u64)
            .build()
            .is_err());

        let config = HashConfig::default();
        assert!(!config.in_range(99));
        assert!(config.in_range(100));
        assert!(config.in_range(DEFAULT_HASH_MAX_BYTES));
        assert!(!config.in_range(DEFAULT_HASH_MAX_BYTES + 1));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: HashConfig = serde_json::from_str(r#"{"hash_min_bytes": 1}"#).unwrap();
        assert_eq!(config.hash_min_bytes, 1);
        assert_eq!(config.chunk_size_bytes, DEFAULT_CHUNK_SIZE_BYTES);
    }
}
