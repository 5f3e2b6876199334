//! sortwise - finds directories worth organizing and duplicate files.
//!
//! Nothing on disk is ever moved, renamed or deleted.
//!
//! Usage:
//!   sortwise survey [PATH...]       Which directories are worth organizing
//!   sortwise scan [PATH...]         Full tree summary
//!   sortwise duplicates [PATH...]   Find duplicate files
//!   sortwise export [PATH...]       Export a full scan to JSON
//!   sortwise --help                 Show help

mod progress;
mod render;

use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use sortwise_analyze::{DuplicateDetector, WorthinessClassifier};
use sortwise_core::{
    CancelToken, ClassifierConfig, DEFAULT_CHUNK_SIZE_BYTES, DEFAULT_DOCUMENT_COUNT_THRESHOLD,
    DEFAULT_MEDIA_RATIO_THRESHOLD, DEFAULT_MIXED_DISTINCT_EXT_THRESHOLD,
    DEFAULT_MIXED_FILE_COUNT_THRESHOLD, DEFAULT_SURVEY_DEPTH, FilterConfig, HashConfig,
    ProgressEvent, ScanConfig, ScanMode, ScanResult,
};
use sortwise_scan::ConcurrentScanner;

use progress::PhaseProgress;
use render::{JsonRenderer, Renderer, TextRenderer};

#[derive(Parser)]
#[command(
    name = "sortwise",
    version,
    about = "Finds directories worth organizing and duplicate files",
    long_about = "sortwise profiles directories, decides which ones are worth \
                  organizing and finds duplicate files by content. It only \
                  reads; nothing is ever moved or deleted.\n\n\
                  Set RUST_LOG (e.g. RUST_LOG=sortwise_scan=debug) for detailed logs."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Don't print progress to stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify the child directories of each path
    Survey {
        #[command(flatten)]
        scan: ScanArgs,

        /// Levels below each candidate directory to profile
        #[arg(short, long, default_value_t = DEFAULT_SURVEY_DEPTH)]
        depth: u32,

        #[command(flatten)]
        thresholds: ThresholdArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Walk the whole tree and show a summary
    Scan {
        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        tree: TreeArgs,

        /// Number of top extensions and largest files to show
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Find duplicate files
    Duplicates {
        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        tree: TreeArgs,

        /// Smallest file to hash (e.g., "100B", "4KB")
        #[arg(long, default_value = "100B")]
        min_size: String,

        /// Largest file to hash (e.g., "100MB", "1GB")
        #[arg(long, default_value = "100MB")]
        max_size: String,

        /// Read size while hashing (e.g., "128KB")
        #[arg(long)]
        chunk_size: Option<String>,

        /// Maximum number of duplicate groups to show
        #[arg(short = 'n', long, default_value = "20")]
        top: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Export a full scan to JSON
    Export {
        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        tree: TreeArgs,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Options shared by every command that scans.
#[derive(Args)]
struct ScanArgs {
    /// Paths to scan
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Worker threads (0 = one per CPU)
    #[arg(short, long, default_value = "0")]
    workers: usize,

    /// Extra directory names to skip
    #[arg(long = "skip", value_name = "NAME")]
    skip: Vec<String>,

    /// Don't skip system, package or already organized directories
    #[arg(long)]
    no_filter: bool,

    /// Match skip names case-sensitively
    #[arg(long)]
    case_sensitive: bool,
}

/// Options for commands that walk the whole tree.
#[derive(Args)]
struct TreeArgs {
    /// Deepest directory level to descend into
    #[arg(long)]
    max_depth: Option<u32>,
}

/// Overrides for the worthiness rules.
#[derive(Args)]
struct ThresholdArgs {
    /// Media fraction that makes a directory worth organizing
    #[arg(long, default_value_t = DEFAULT_MEDIA_RATIO_THRESHOLD)]
    media_ratio: f64,

    /// Document count that makes a directory worth organizing
    #[arg(long, default_value_t = DEFAULT_DOCUMENT_COUNT_THRESHOLD)]
    documents: u64,

    /// File count for the mixed-content rule
    #[arg(long, default_value_t = DEFAULT_MIXED_FILE_COUNT_THRESHOLD)]
    mixed_files: u64,

    /// Distinct extension count for the mixed-content rule
    #[arg(long, default_value_t = DEFAULT_MIXED_DISTINCT_EXT_THRESHOLD)]
    mixed_extensions: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    fn renderer(self) -> Box<dyn Renderer> {
        match self {
            OutputFormat::Text => Box::new(TextRenderer),
            OutputFormat::Json => Box::new(JsonRenderer),
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("Failed to install Ctrl+C handler")?;

    let quiet = cli.quiet;
    match cli.command {
        Command::Survey {
            scan,
            depth,
            thresholds,
            format,
        } => run_survey(&scan, depth, &thresholds, format, &cancel, quiet),
        Command::Scan {
            scan,
            tree,
            top,
            format,
        } => run_scan(&scan, &tree, top, format, &cancel, quiet),
        Command::Duplicates {
            scan,
            tree,
            min_size,
            max_size,
            chunk_size,
            top,
            format,
        } => {
            let config = HashConfig::builder()
                .hash_min_bytes(parse_size(&min_size)?)
                .hash_max_bytes(parse_size(&max_size)?)
                .chunk_size_bytes(match chunk_size {
                    Some(s) => usize::try_from(parse_size(&s)?)?,
                    None => DEFAULT_CHUNK_SIZE_BYTES,
                })
                .workers(scan.workers)
                .build()
                .context("Invalid hashing options")?;
            run_duplicates(&scan, &tree, config, top, format, &cancel, quiet)
        }
        Command::Export { scan, tree, output } => {
            run_export(&scan, &tree, output, &cancel, quiet)
        }
    }
}

/// Log to stderr; `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .without_time(),
        )
        .with(filter)
        .init();
}

/// Classify candidate directories.
fn run_survey(
    args: &ScanArgs,
    depth: u32,
    thresholds: &ThresholdArgs,
    format: OutputFormat,
    cancel: &CancelToken,
    quiet: bool,
) -> Result<()> {
    let classifier_config = ClassifierConfig::builder()
        .media_ratio_threshold(thresholds.media_ratio)
        .document_count_threshold(thresholds.documents)
        .mixed_file_count_threshold(thresholds.mixed_files)
        .mixed_distinct_ext_threshold(thresholds.mixed_extensions)
        .build()
        .context("Invalid threshold")?;

    let mut config = scan_config(args, ScanMode::Survey, None)?;
    config.depth_limit = depth;
    let result = run_scanner(config, cancel, quiet)?;

    let assessments = WorthinessClassifier::new(classifier_config).classify_all(&result);
    let mut out = io::stdout().lock();
    format.renderer().survey(&mut out, &result, &assessments)?;
    out.flush()?;
    Ok(())
}

/// Walk the whole tree and summarize it.
fn run_scan(
    args: &ScanArgs,
    tree: &TreeArgs,
    top_n: usize,
    format: OutputFormat,
    cancel: &CancelToken,
    quiet: bool,
) -> Result<()> {
    let result = run_scanner(tree_config(args, tree)?, cancel, quiet)?;

    let mut out = io::stdout().lock();
    format.renderer().scan(&mut out, &result, top_n)?;
    out.flush()?;
    Ok(())
}

/// Run duplicate detection over a full walk.
fn run_duplicates(
    args: &ScanArgs,
    tree: &TreeArgs,
    hash_config: HashConfig,
    top_n: usize,
    format: OutputFormat,
    cancel: &CancelToken,
    quiet: bool,
) -> Result<()> {
    let result = run_scanner(tree_config(args, tree)?, cancel, quiet)?;

    let report = if cancel.is_cancelled() {
        // Interrupted while scanning; don't start hashing.
        sortwise_analyze::DuplicateReport {
            files_considered: result.total_files(),
            cancelled: true,
            ..Default::default()
        }
    } else {
        if !quiet {
            eprintln!("Finding duplicates...");
        }
        let detector = DuplicateDetector::new(hash_config);
        let progress = (!quiet).then(|| spawn_hash_progress(detector.subscribe()));
        let report = detector.find_duplicates(&result.records, cancel);
        // Dropping the detector closes the channel and ends the bar.
        drop(detector);
        if let Some(handle) = progress {
            let _ = handle.join();
        }
        report
    };

    let mut out = io::stdout().lock();
    format
        .renderer()
        .duplicates(&mut out, &result, &report, top_n)?;
    out.flush()?;
    Ok(())
}

/// Export scan results to JSON.
fn run_export(
    args: &ScanArgs,
    tree: &TreeArgs,
    output: Option<PathBuf>,
    cancel: &CancelToken,
    quiet: bool,
) -> Result<()> {
    let result = run_scanner(tree_config(args, tree)?, cancel, quiet)?;
    let json = serde_json::to_string_pretty(&result)?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            if !quiet {
                eprintln!("Exported to {}", output_path.display());
            }
        }
        None => {
            println!("{json}");
        }
    }

    Ok(())
}

fn tree_config(args: &ScanArgs, tree: &TreeArgs) -> Result<ScanConfig> {
    scan_config(args, ScanMode::Tree, tree.max_depth)
}

fn scan_config(args: &ScanArgs, mode: ScanMode, max_depth: Option<u32>) -> Result<ScanConfig> {
    let mut filter = if args.no_filter {
        FilterConfig::permissive()
    } else {
        FilterConfig::default()
    };
    filter.skip_names.extend(args.skip.iter().cloned());
    filter.case_insensitive = !args.case_sensitive;

    ScanConfig::builder()
        .roots(args.paths.clone())
        .mode(mode)
        .max_depth(max_depth)
        .workers(args.workers)
        .filter(filter)
        .build()
        .context("Invalid scan options")
}

fn run_scanner(config: ScanConfig, cancel: &CancelToken, quiet: bool) -> Result<ScanResult> {
    if !quiet {
        let roots: Vec<String> = config.roots.iter().map(|r| r.display().to_string()).collect();
        eprintln!("Scanning {}...", roots.join(", "));
    }

    let scanner = ConcurrentScanner::new(config).context("Invalid scan options")?;
    let mut progress = PhaseProgress::new(quiet);
    let result = scanner
        .scan_with(cancel, |event| progress.update(event))
        .context("Scan failed")?;
    progress.finish();

    if !quiet && result.is_partial() {
        eprintln!("Interrupted; showing partial results.");
    }
    debug!(state = %scanner.state(), "scanner finished");

    Ok(result)
}

/// Drive a hashing bar from the detector's broadcast until it closes.
fn spawn_hash_progress(
    mut rx: tokio::sync::broadcast::Receiver<ProgressEvent>,
) -> thread::JoinHandle<()> {
    use tokio::sync::broadcast::error::RecvError;

    thread::spawn(move || {
        let mut progress = PhaseProgress::new(false);
        loop {
            match rx.blocking_recv() {
                Ok(event) => progress.update(&event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        progress.finish();
    })
}

/// Parse a size string (e.g., "1KB", "10MB", "1GB").
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (num, unit) = s.split_at(split);

    let num: f64 = num
        .parse()
        .with_context(|| format!("Invalid size '{s}'"))?;
    let multiplier: u64 = match unit.trim() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => 1024,
        "M" | "MB" | "MIB" => 1024 * 1024,
        "G" | "GB" | "GIB" => 1024 * 1024 * 1024,
        other => return Err(eyre!("Unknown size unit '{other}'")),
    };

    Ok((num * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("100").unwrap(), 100);
        assert_eq!(parse_size("100B").unwrap(), 100);
        assert_eq!(parse_size("128KB").unwrap(), 128 * 1024);
        assert_eq!(parse_size("100mb").unwrap(), 100 * 1024 * 1024);
        assert_eq!(parse_size("1.5G").unwrap(), 1536 * 1024 * 1024);
        assert!(parse_size("12XB").is_err());
        assert!(parse_size("MB").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "sortwise",
            "duplicates",
            "/tmp",
            "--min-size",
            "1KB",
            "-w",
            "4",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Command::Duplicates { scan, min_size, format, .. } => {
                assert_eq!(scan.paths, vec![PathBuf::from("/tmp")]);
                assert_eq!(scan.workers, 4);
                assert_eq!(min_size, "1KB");
                assert!(matches!(format, OutputFormat::Json));
            }
            _ => panic!("expected duplicates"),
        }
    }

    #[test]
    fn test_scan_config_from_args() {
        let args = ScanArgs {
            paths: vec![PathBuf::from("/data")],
            workers: 2,
            skip: vec!["Archive".to_string()],
            no_filter: true,
            case_sensitive: false,
        };
        let config = tree_config(&args, &TreeArgs { max_depth: Some(3) }).unwrap();
        assert_eq!(config.mode, ScanMode::Tree);
        assert_eq!(config.max_depth, Some(3));
        assert_eq!(config.filter.skip_names, vec!["Archive".to_string()]);
    }

    #[test]
    fn test_max_depth_only_for_tree_commands() {
        assert!(Cli::try_parse_from(["sortwise", "scan", "/tmp", "--max-depth", "2"]).is_ok());
        assert!(Cli::try_parse_from(["sortwise", "survey", "/tmp", "--max-depth", "2"]).is_err());
        assert!(Cli::try_parse_from(["sortwise", "survey", "/tmp", "--depth", "2"]).is_ok());
    }
}
