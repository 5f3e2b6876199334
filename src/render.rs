//! Output rendering for the CLI.
//!
//! The library crates only produce data; a [`Renderer`] chosen at startup
//! decides how it is shown.

use std::io::Write;
use std::path::Path;

use color_eyre::eyre::Result;
use serde::Serialize;

use sortwise_analyze::{Assessment, DuplicateReport, Worthiness};
use sortwise_core::{ScanResult, ScanSummary};

/// Presents scan, survey and duplicate results.
pub trait Renderer {
    /// Totals, categories, extensions and largest files of a scan.
    fn scan(&self, out: &mut dyn Write, result: &ScanResult, top_n: usize) -> Result<()>;

    /// Worthiness verdicts for surveyed directories.
    fn survey(
        &self,
        out: &mut dyn Write,
        result: &ScanResult,
        assessments: &[Assessment],
    ) -> Result<()>;

    /// Duplicate groups and unverified buckets.
    fn duplicates(
        &self,
        out: &mut dyn Write,
        result: &ScanResult,
        report: &DuplicateReport,
        top_n: usize,
    ) -> Result<()>;
}

/// Plain text for terminals.
pub struct TextRenderer;

/// Pretty-printed JSON.
pub struct JsonRenderer;

impl Renderer for TextRenderer {
    fn scan(&self, out: &mut dyn Write, result: &ScanResult, top_n: usize) -> Result<()> {
        let summary = result.summary(top_n);
        header(out, &format!("Scan of {}", roots_label(result)))?;
        write_totals(out, result, &summary)?;

        writeln!(out, " Categories:")?;
        let max_count = summary.category_counts.values().copied().max().unwrap_or(1);
        for (category, count) in &summary.category_counts {
            writeln!(
                out,
                "   {:<12} {:>8} files  {}",
                category.as_ref(),
                count,
                make_bar(*count as f64 / max_count as f64, 30)
            )?;
        }
        writeln!(out)?;

        if !summary.top_extensions.is_empty() {
            writeln!(out, " Top extensions:")?;
            for (ext, count) in &summary.top_extensions {
                let ext = if ext.is_empty() { "(none)" } else { ext.as_str() };
                writeln!(out, "   {ext:<12} {count:>8}")?;
            }
            writeln!(out)?;
        }

        if !summary.largest_files.is_empty() {
            writeln!(out, " Largest files:")?;
            for (path, size) in &summary.largest_files {
                writeln!(out, "   {:>10}  {}", format_size(*size), path.display())?;
            }
            writeln!(out)?;
        }

        if !summary.empty_directories.is_empty() {
            writeln!(out, " Empty directories ({}):", summary.empty_directories.len())?;
            for path in summary.empty_directories.iter().take(top_n) {
                writeln!(out, "   {}", path.display())?;
            }
            let remaining = summary.empty_directories.len().saturating_sub(top_n);
            if remaining > 0 {
                writeln!(out, "   ... and {remaining} more")?;
            }
            writeln!(out)?;
        }

        write_issues(out, result)
    }

    fn survey(
        &self,
        out: &mut dyn Write,
        result: &ScanResult,
        assessments: &[Assessment],
    ) -> Result<()> {
        let summary = result.summary(0);
        header(out, &format!("Survey of {}", roots_label(result)))?;
        write_totals(out, result, &summary)?;

        let (organize, skip): (Vec<&Assessment>, Vec<&Assessment>) = assessments
            .iter()
            .partition(|a| a.worthiness == Worthiness::Organize);

        if organize.is_empty() {
            writeln!(out, " No directories worth organizing.")?;
        } else {
            writeln!(out, " Worth organizing ({}):", organize.len())?;
            for assessment in &organize {
                let reasons: Vec<String> =
                    assessment.reasons.iter().map(ToString::to_string).collect();
                writeln!(
                    out,
                    "   {:<40} {:>6} files {:>10} {:>5.1}% media  {}",
                    truncate(&display_name(&assessment.path), 40),
                    assessment.total_files,
                    format_size(assessment.total_bytes),
                    assessment.media_ratio * 100.0,
                    reasons.join(", ")
                )?;
            }
        }
        writeln!(out)?;

        if !skip.is_empty() {
            writeln!(out, " Left alone ({}):", skip.len())?;
            for assessment in &skip {
                let cause = assessment
                    .skip_cause
                    .map(|c| c.to_string())
                    .unwrap_or_default();
                writeln!(
                    out,
                    "   {:<40} {:>6} files  {}",
                    truncate(&display_name(&assessment.path), 40),
                    assessment.total_files,
                    cause
                )?;
            }
            writeln!(out)?;
        }

        if !result.skipped.is_empty() {
            writeln!(out, " Pruned by filter ({}):", result.skipped.len())?;
            for skipped in &result.skipped {
                writeln!(
                    out,
                    "   {:<40} {}",
                    truncate(&display_name(&skipped.path), 40),
                    skipped.reason
                )?;
            }
            writeln!(out)?;
        }

        write_issues(out, result)
    }

    fn duplicates(
        &self,
        out: &mut dyn Write,
        result: &ScanResult,
        report: &DuplicateReport,
        top_n: usize,
    ) -> Result<()> {
        header(out, "Duplicate File Report")?;

        if !report.has_duplicates() {
            writeln!(out, " No duplicate files found.")?;
        } else {
            writeln!(
                out,
                " Found {} duplicate groups ({} files)",
                report.groups.len(),
                report.total_duplicate_files()
            )?;
            writeln!(
                out,
                " Total wasted space: {}",
                format_size(report.total_wasted_bytes)
            )?;
            writeln!(out)?;

            for (i, group) in report.groups.iter().take(top_n).enumerate() {
                writeln!(
                    out,
                    " Group {} ({} files, {} each, {} wasted)",
                    i + 1,
                    group.count(),
                    format_size(group.file_size),
                    format_size(group.wasted_bytes())
                )?;
                for path in &group.members {
                    writeln!(out, "   {}", path.display())?;
                }
                writeln!(out)?;
            }

            let remaining = report.groups.len().saturating_sub(top_n);
            if remaining > 0 {
                writeln!(out, " ... and {remaining} more groups")?;
                writeln!(out)?;
            }
        }

        if !report.unverified.is_empty() {
            writeln!(
                out,
                " {} same-size files outside the hashed range were not checked:",
                report.total_unverified_files()
            )?;
            for group in &report.unverified {
                writeln!(
                    out,
                    "   {} files of {} ({})",
                    group.members.len(),
                    format_size(group.file_size),
                    group.reason
                )?;
            }
            writeln!(out)?;
        }

        writeln!(
            out,
            " Hashed {} of {} files ({})",
            report.files_hashed,
            report.files_considered,
            format_size(report.bytes_hashed)
        )?;
        if report.cancelled {
            writeln!(out, " Hashing was interrupted; groups may be incomplete.")?;
        }
        if !report.errors.is_empty() {
            writeln!(out, " {} file(s) could not be hashed", report.errors.len())?;
        }
        writeln!(out)?;

        write_issues(out, result)
    }
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    summary: ScanSummary,
    result: &'a ScanResult,
}

#[derive(Serialize)]
struct SurveyOutput<'a> {
    summary: ScanSummary,
    assessments: &'a [Assessment],
    skipped: &'a [sortwise_core::SkippedDirectory],
    errors: &'a [sortwise_core::ScanIssue],
    partial: bool,
}

#[derive(Serialize)]
struct DuplicatesOutput<'a> {
    report: &'a DuplicateReport,
    scan_errors: &'a [sortwise_core::ScanIssue],
    partial: bool,
}

impl Renderer for JsonRenderer {
    fn scan(&self, out: &mut dyn Write, result: &ScanResult, top_n: usize) -> Result<()> {
        write_json(
            out,
            &ScanOutput {
                summary: result.summary(top_n),
                result,
            },
        )
    }

    fn survey(
        &self,
        out: &mut dyn Write,
        result: &ScanResult,
        assessments: &[Assessment],
    ) -> Result<()> {
        write_json(
            out,
            &SurveyOutput {
                summary: result.summary(0),
                assessments,
                skipped: &result.skipped,
                errors: &result.errors,
                partial: result.is_partial(),
            },
        )
    }

    fn duplicates(
        &self,
        out: &mut dyn Write,
        result: &ScanResult,
        report: &DuplicateReport,
        _top_n: usize,
    ) -> Result<()> {
        write_json(
            out,
            &DuplicatesOutput {
                report,
                scan_errors: &result.errors,
                partial: result.is_partial() || report.cancelled,
            },
        )
    }
}

fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn header(out: &mut dyn Write, title: &str) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "─".repeat(70))?;
    writeln!(out, " {title}")?;
    writeln!(out, "{}", "─".repeat(70))?;
    writeln!(out)?;
    Ok(())
}

fn write_totals(out: &mut dyn Write, result: &ScanResult, summary: &ScanSummary) -> Result<()> {
    writeln!(
        out,
        " {} files, {} in {} directories ({} pruned)",
        summary.total_files,
        format_size(summary.total_bytes),
        summary.directories_profiled,
        summary.directories_skipped
    )?;
    writeln!(out, " Scanned in {:.2}s", result.duration.as_secs_f64())?;
    if summary.partial {
        writeln!(out, " Scan was interrupted; results are partial.")?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_issues(out: &mut dyn Write, result: &ScanResult) -> Result<()> {
    for failed in &result.failed_roots {
        writeln!(out, " Root skipped: {} ({})", failed.path.display(), failed.message)?;
    }
    if !result.errors.is_empty() {
        writeln!(out, " {} path(s) could not be read", result.errors.len())?;
    }
    Ok(())
}

fn roots_label(result: &ScanResult) -> String {
    result
        .roots
        .iter()
        .map(|r| r.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Keep the tail of a string, which is the informative end of a path.
fn truncate(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(count - (max_len - 1)).collect();
        format!("…{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sortwise_core::{DirectoryProfile, FileRecord, ScanMode, ScanState, UnitOutcome};
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn sample_result() -> ScanResult {
        let records = vec![
            FileRecord::new("/r/a/one.jpg", 2048, SystemTime::UNIX_EPOCH),
            FileRecord::new("/r/a/two.pdf", 10, SystemTime::UNIX_EPOCH),
        ];
        let mut result = ScanResult::new(vec![PathBuf::from("/r")], ScanMode::Survey);
        result.merge(UnitOutcome {
            profile: Some(DirectoryProfile::from_records("/r/a", 2, &records)),
            records,
            errors: Vec::new(),
            skipped: Vec::new(),
        });
        result.status = ScanState::Completed;
        result
    }

    #[test]
    fn test_truncate_keeps_tail() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("/a/very/long/path", 6), "…/path");
    }

    #[test]
    fn test_text_survey() {
        let result = sample_result();
        let assessments =
            sortwise_analyze::WorthinessClassifier::default().classify_all(&result);

        let mut out = Vec::new();
        TextRenderer.survey(&mut out, &result, &assessments).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Survey of /r"));
        assert!(text.contains("Worth organizing (1)"));
        assert!(text.contains("media_rich"));
    }

    #[test]
    fn test_json_survey_is_valid() {
        let result = sample_result();
        let assessments =
            sortwise_analyze::WorthinessClassifier::default().classify_all(&result);

        let mut out = Vec::new();
        JsonRenderer.survey(&mut out, &result, &assessments).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["assessments"][0]["worthiness"], "organize");
        assert_eq!(value["summary"]["total_files"], 2);
        assert_eq!(value["partial"], false);
    }

    #[test]
    fn test_text_scan_lists_empty_directories() {
        let mut result = sample_result();
        result.mode = ScanMode::Tree;
        result.merge(UnitOutcome {
            profile: Some(DirectoryProfile::new("/r/blank", 0)),
            ..Default::default()
        });

        let mut out = Vec::new();
        TextRenderer.scan(&mut out, &result, 10).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Empty directories (1):"));
        assert!(text.contains("/r/blank"));

        let mut out = Vec::new();
        JsonRenderer.scan(&mut out, &result, 10).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["summary"]["empty_directories"][0], "/r/blank");
    }

    #[test]
    fn test_text_duplicates_empty() {
        let result = sample_result();
        let report = DuplicateReport::default();

        let mut out = Vec::new();
        TextRenderer.duplicates(&mut out, &result, &report, 10).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("No duplicate files found."));
    }
}
