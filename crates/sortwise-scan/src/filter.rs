//! Directory pruning rules.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use sortwise_core::{FilterConfig, ScanError, SkipReason};

/// Decides whether a directory is a candidate for profiling.
///
/// Checks run in a fixed order: deny-listed names and prefixes, name
/// patterns, the "already organized" marker file, then the package
/// heuristic. The filter fails open: anything it cannot read is considered.
#[derive(Debug, Clone)]
pub struct PathFilter {
    names: HashSet<String>,
    prefixes: Vec<String>,
    patterns: GlobSet,
    markers: Vec<String>,
    package_indicators: Vec<String>,
    package_extensions: HashSet<String>,
    package_sample_size: usize,
    package_ratio: f64,
    case_insensitive: bool,
}

impl PathFilter {
    /// Compile a filter from configuration.
    pub fn new(config: &FilterConfig) -> Result<Self, ScanError> {
        let ci = config.case_insensitive;
        let fold = |s: &String| if ci { s.to_lowercase() } else { s.clone() };

        let mut builder = GlobSetBuilder::new();
        for pattern in &config.skip_patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(ci)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    ScanError::invalid_config(format!("invalid skip pattern '{pattern}': {e}"))
                })?;
            builder.add(glob);
        }
        let patterns = builder
            .build()
            .map_err(|e| ScanError::invalid_config(format!("invalid skip patterns: {e}")))?;

        Ok(Self {
            names: config.skip_names.iter().map(fold).collect(),
            prefixes: config.skip_prefixes.iter().map(fold).collect(),
            patterns,
            markers: config.marker_files.clone(),
            package_indicators: config
                .package_indicators
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            package_extensions: config
                .package_extensions
                .iter()
                .map(|s| s.trim_start_matches('.').to_lowercase())
                .collect(),
            package_sample_size: config.package_sample_size,
            package_ratio: config.package_ratio,
            case_insensitive: ci,
        })
    }

    /// A filter that considers every directory.
    pub fn permissive() -> Self {
        Self {
            names: HashSet::new(),
            prefixes: Vec::new(),
            patterns: GlobSet::empty(),
            markers: Vec::new(),
            package_indicators: Vec::new(),
            package_extensions: HashSet::new(),
            package_sample_size: 0,
            package_ratio: 1.0,
            case_insensitive: true,
        }
    }

    /// Whether the directory should be pruned.
    pub fn should_skip(&self, path: &Path) -> bool {
        self.evaluate(path).is_some()
    }

    /// The rule that prunes the directory, if any.
    pub fn evaluate(&self, path: &Path) -> Option<SkipReason> {
        let name = path.file_name()?.to_str()?;
        let folded = self.fold(name);

        if self.names.contains(folded.as_ref())
            || self.prefixes.iter().any(|p| folded.starts_with(p.as_str()))
        {
            return Some(SkipReason::SystemName);
        }

        if self.patterns.is_match(name) {
            return Some(SkipReason::NamePattern);
        }

        if self.has_marker(path) {
            return Some(SkipReason::OrganizedMarker);
        }

        if self.looks_like_package(path, &name.to_lowercase()) {
            return Some(SkipReason::PackageDirectory);
        }

        None
    }

    fn fold<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if self.case_insensitive {
            Cow::Owned(name.to_lowercase())
        } else {
            Cow::Borrowed(name)
        }
    }

    fn has_marker(&self, path: &Path) -> bool {
        self.markers
            .iter()
            .any(|marker| path.join(marker).try_exists().unwrap_or(false))
    }

    /// Peek at up to `package_sample_size` entries when the name hints at an
    /// installed package.
    fn looks_like_package(&self, path: &Path, lower_name: &str) -> bool {
        if self.package_sample_size == 0
            || !self
                .package_indicators
                .iter()
                .any(|indicator| lower_name.contains(indicator.as_str()))
        {
            return false;
        }

        let Ok(entries) = fs::read_dir(path) else {
            return false;
        };

        let mut sampled = 0usize;
        let mut package_files = 0usize;
        for entry in entries.flatten().take(self.package_sample_size) {
            sampled += 1;
            let entry_path = entry.path();
            let is_package_file = entry_path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| self.package_extensions.contains(&ext.to_lowercase()));
            if is_package_file {
                package_files += 1;
            }
        }

        sampled > 0 && package_files as f64 > sampled as f64 * self.package_ratio
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        // The built-in patterns are known to compile.
        Self::new(&FilterConfig::default()).unwrap_or_else(|_| Self::permissive())
    }
}
