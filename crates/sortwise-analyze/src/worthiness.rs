//! Directory worthiness classification.
//!
//! A directory is worth organizing when any one of three rules fires:
//!
//! - at least `media_ratio_threshold` of its files are media,
//! - it holds at least `document_count_threshold` documents,
//! - it holds at least `mixed_file_count_threshold` files spread over at
//!   least `mixed_distinct_ext_threshold` distinct extensions.
//!
//! All thresholds are inclusive. The rules form a plain disjunction, so the
//! order they are checked in never changes the verdict.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::Display;

use sortwise_core::{ClassifierConfig, DirectoryProfile, FileCategory, ScanResult};

/// Verdict for one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Worthiness {
    /// Worth organizing.
    Organize,
    /// Leave alone.
    Skip,
}

/// Rule that made a directory worth organizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrganizeReason {
    /// Media fraction reached the threshold.
    MediaRich,
    /// Document count reached the threshold.
    DocumentHeavy,
    /// Many files with many distinct extensions.
    MixedContent,
}

/// Why a directory was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipCause {
    /// No files at all.
    Empty,
    /// Files present but no rule fired.
    NotBeneficial,
}

/// Verdict plus the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Directory assessed.
    #[serde(serialize_with = "sortwise_core::serde_path::lossy")]
    pub path: PathBuf,
    /// Final verdict.
    pub worthiness: Worthiness,
    /// Every rule that fired, in rule order. Empty when skipped.
    pub reasons: Vec<OrganizeReason>,
    /// Set when the verdict is `Skip`.
    pub skip_cause: Option<SkipCause>,
    /// Fraction of media files.
    pub media_ratio: f64,
    /// Files in the profile.
    pub total_files: u64,
    /// Bytes in the profile.
    pub total_bytes: u64,
}

impl Assessment {
    /// Whether the directory is worth organizing.
    pub fn is_organize(&self) -> bool {
        self.worthiness == Worthiness::Organize
    }
}

/// Pure classifier over directory profiles.
#[derive(Debug, Clone, Default)]
pub struct WorthinessClassifier {
    config: ClassifierConfig,
}

impl WorthinessClassifier {
    /// Create a classifier with the given thresholds.
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify a single profile.
    pub fn classify(&self, profile: &DirectoryProfile) -> Worthiness {
        self.assess(profile).worthiness
    }

    /// Classify a profile and report every rule that fired.
    pub fn assess(&self, profile: &DirectoryProfile) -> Assessment {
        let media_ratio = profile.media_ratio();
        let mut reasons = Vec::new();

        if !profile.is_empty() {
            if media_ratio >= self.config.media_ratio_threshold {
                reasons.push(OrganizeReason::MediaRich);
            }
            if profile.count(FileCategory::Document) >= self.config.document_count_threshold {
                reasons.push(OrganizeReason::DocumentHeavy);
            }
            if profile.total_files >= self.config.mixed_file_count_threshold
                && profile.distinct_extension_count >= self.config.mixed_distinct_ext_threshold
            {
                reasons.push(OrganizeReason::MixedContent);
            }
        }

        let (worthiness, skip_cause) = if profile.is_empty() {
            (Worthiness::Skip, Some(SkipCause::Empty))
        } else if reasons.is_empty() {
            (Worthiness::Skip, Some(SkipCause::NotBeneficial))
        } else {
            (Worthiness::Organize, None)
        };

        Assessment {
            path: profile.path.clone(),
            worthiness,
            reasons,
            skip_cause,
            media_ratio,
            total_files: profile.total_files,
            total_bytes: profile.total_bytes,
        }
    }

    /// Assess every profile of a scan, in path order.
    pub fn classify_all(&self, result: &ScanResult) -> Vec<Assessment> {
        result.profiles.values().map(|p| self.assess(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sortwise_core::FileRecord;
    use std::time::SystemTime;

    fn profile(names: &[String]) -> DirectoryProfile {
        let records: Vec<FileRecord> = names
            .iter()
            .map(|n| FileRecord::new(format!("/d/{n}"), 1, SystemTime::UNIX_EPOCH))
            .collect();
        DirectoryProfile::from_records("/d", 0, &records)
    }

    fn named(prefix: &str, ext: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{prefix}{i}.{ext}")).collect()
    }

    #[test]
    fn test_empty_is_skipped() {
        let assessment = WorthinessClassifier::default().assess(&profile(&[]));
        assert_eq!(assessment.worthiness, Worthiness::Skip);
        assert_eq!(assessment.skip_cause, Some(SkipCause::Empty));
        assert_eq!(assessment.media_ratio, 0.0);
    }

    #[test]
    fn test_zero_thresholds_still_skip_empty() {
        let config = ClassifierConfig {
            media_ratio_threshold: 0.0,
            document_count_threshold: 0,
            mixed_file_count_threshold: 0,
            mixed_distinct_ext_threshold: 0,
        };
        let classifier = WorthinessClassifier::new(config);
        assert_eq!(classifier.classify(&profile(&[])), Worthiness::Skip);
    }

    #[test]
    fn test_all_reasons_reported() {
        let mut names = named("img", "jpg", 30);
        names.extend(named("doc", "pdf", 20));
        names.extend(named("a", "py", 1));
        names.extend(named("b", "zip", 1));
        names.extend(named("c", "csv", 1));

        let assessment = WorthinessClassifier::default().assess(&profile(&names));
        assert!(assessment.is_organize());
        assert_eq!(
            assessment.reasons,
            vec![
                OrganizeReason::MediaRich,
                OrganizeReason::DocumentHeavy,
                OrganizeReason::MixedContent
            ]
        );
        assert!(assessment.skip_cause.is_none());
    }

    #[test]
    fn test_not_beneficial() {
        let names = named("script", "py", 10);
        let assessment = WorthinessClassifier::default().assess(&profile(&names));
        assert_eq!(assessment.worthiness, Worthiness::Skip);
        assert_eq!(assessment.skip_cause, Some(SkipCause::NotBeneficial));
    }
}
