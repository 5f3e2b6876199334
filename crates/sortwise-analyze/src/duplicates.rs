//! Duplicate file detection using selective content hashing.
//!
//! 1. Bucket files by size (no I/O); buckets with a single file are dropped.
//! 2. Buckets outside the configured size range are reported as unverified
//!    instead of hashed.
//! 3. Every remaining file is streamed through SHA-256 in fixed-size chunks.
//!    Files hash in parallel; each file is read sequentially.
//! 4. Files sharing a size and a digest form a duplicate group.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::Display;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use sortwise_core::{
    CancelToken, ContentHash, FileRecord, HashConfig, Phase, ProgressEvent, ScanIssue,
    resolve_workers,
};

/// A group of files with identical content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash shared by all members.
    pub hash: ContentHash,

    /// Size of each member in bytes.
    pub file_size: u64,

    /// Paths of all members, sorted. Always at least two.
    #[serde(serialize_with = "sortwise_core::serde_path::lossy_seq")]
    pub members: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Get the number of duplicate files.
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Check if keeping one file, how many could be deleted.
    pub fn deletable_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Space reclaimable by keeping a single copy.
    pub fn wasted_bytes(&self) -> u64 {
        self.file_size * self.deletable_count() as u64
    }
}

/// Why a same-size bucket was not hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnverifiedReason {
    /// Smaller than `hash_min_bytes`.
    BelowMinimum,
    /// Larger than `hash_max_bytes`.
    AboveMaximum,
}

/// Files of equal size that were never content-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnverifiedGroup {
    /// Shared size in bytes.
    pub file_size: u64,
    /// Paths, sorted.
    #[serde(serialize_with = "sortwise_core::serde_path::lossy_seq")]
    pub members: Vec<PathBuf>,
    /// Which end of the range excluded them.
    pub reason: UnverifiedReason,
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Duplicate groups, sorted by wasted space descending.
    pub groups: Vec<DuplicateGroup>,

    /// Same-size buckets outside the hashed range, sorted by size descending.
    pub unverified: Vec<UnverifiedGroup>,

    /// Files that could not be hashed.
    pub errors: Vec<ScanIssue>,

    /// Records passed in.
    pub files_considered: u64,

    /// Files whose digest was computed.
    pub files_hashed: u64,

    /// Bytes read while hashing.
    pub bytes_hashed: u64,

    /// Sum of `wasted_bytes` over all groups.
    pub total_wasted_bytes: u64,

    /// Whether hashing stopped early. Groups then only cover files hashed
    /// before the stop.
    pub cancelled: bool,
}

impl DuplicateReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Get total number of duplicate files across all groups.
    pub fn total_duplicate_files(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }

    /// Get total number of files in unverified buckets.
    pub fn total_unverified_files(&self) -> usize {
        self.unverified.iter().map(|g| g.members.len()).sum()
    }
}

/// One file queued for hashing.
struct HashJob<'a> {
    path: &'a Path,
    size: u64,
}

/// What hashing one file produced.
enum HashOutcome {
    Hashed { size: u64, hash: ContentHash },
    Failed(ScanIssue),
    NotStarted,
}

/// Duplicate file detector.
pub struct DuplicateDetector {
    config: HashConfig,
    progress_tx: broadcast::Sender<ProgressEvent>,
}

impl DuplicateDetector {
    /// Create a detector with the given hashing configuration.
    pub fn new(config: HashConfig) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            progress_tx,
        }
    }

    /// Override the number of hashing threads (0 = auto-detect).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &HashConfig {
        &self.config
    }

    /// Subscribe to hashing progress.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress_tx.subscribe()
    }

    /// Find exact duplicates among `records`.
    ///
    /// Records are expected to be unique by path. Per-file failures are
    /// collected in the report and never abort the pass.
    pub fn find_duplicates(
        &self,
        records: &[FileRecord],
        cancel: &CancelToken,
    ) -> DuplicateReport {
        let start = Instant::now();
        let mut report = DuplicateReport {
            files_considered: records.len() as u64,
            ..Default::default()
        };

        // Phase 1: bucket by size
        let mut buckets: BTreeMap<u64, Vec<&Path>> = BTreeMap::new();
        for record in records {
            buckets.entry(record.size_bytes).or_default().push(&record.path);
        }
        buckets.retain(|_, paths| paths.len() > 1);

        // Phase 2: split off buckets outside the hashed range
        let mut jobs = Vec::new();
        for (size, mut paths) in buckets.into_iter().rev() {
            if self.config.in_range(size) {
                jobs.extend(paths.into_iter().map(|path| HashJob { path, size }));
                continue;
            }
            paths.sort();
            report.unverified.push(UnverifiedGroup {
                file_size: size,
                members: paths.into_iter().map(Path::to_path_buf).collect(),
                reason: if size < self.config.hash_min_bytes {
                    UnverifiedReason::BelowMinimum
                } else {
                    UnverifiedReason::AboveMaximum
                },
            });
        }

        info!(
            files = records.len(),
            to_hash = jobs.len(),
            unverified = report.total_unverified_files(),
            "starting duplicate detection"
        );

        // Phase 3: hash
        let outcomes = self.hash_jobs(&jobs, cancel, start);

        // Phase 4: group by (size, digest)
        let mut by_digest: HashMap<(u64, ContentHash), Vec<PathBuf>> = HashMap::new();
        for (job, outcome) in jobs.iter().zip(outcomes) {
            match outcome {
                HashOutcome::Hashed { size, hash } => {
                    report.files_hashed += 1;
                    report.bytes_hashed += size;
                    by_digest
                        .entry((size, hash))
                        .or_default()
                        .push(job.path.to_path_buf());
                }
                HashOutcome::Failed(issue) => report.errors.push(issue),
                HashOutcome::NotStarted => report.cancelled = true,
            }
        }

        report.groups = by_digest
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|((file_size, hash), mut members)| {
                members.sort();
                DuplicateGroup {
                    hash,
                    file_size,
                    members,
                }
            })
            .sorted_by(|a, b| {
                b.wasted_bytes()
                    .cmp(&a.wasted_bytes())
                    .then_with(|| a.members.cmp(&b.members))
            })
            .collect();
        report.total_wasted_bytes = report.groups.iter().map(|g| g.wasted_bytes()).sum();

        info!(
            groups = report.groups.len(),
            hashed = report.files_hashed,
            errors = report.errors.len(),
            wasted = report.total_wasted_bytes,
            cancelled = report.cancelled,
            elapsed = ?start.elapsed(),
            "duplicate detection finished"
        );

        report
    }

    /// Compute the SHA-256 digest of a file, reading it in chunks.
    pub fn hash_file(&self, path: &Path) -> io::Result<ContentHash> {
        self.stream_hash(path).map(|(hash, _)| hash)
    }

    /// Hash every job on a dedicated pool, returning outcomes in job order.
    fn hash_jobs(
        &self,
        jobs: &[HashJob<'_>],
        cancel: &CancelToken,
        start: Instant,
    ) -> Vec<HashOutcome> {
        let total = jobs.len() as u64;
        let completed = AtomicU64::new(0);
        let failed = AtomicU64::new(0);

        let run = || -> Vec<HashOutcome> {
            jobs.par_iter()
                .map(|job| {
                    if cancel.is_cancelled() {
                        return HashOutcome::NotStarted;
                    }
                    let outcome = self.hash_job(job);
                    if matches!(outcome, HashOutcome::Failed(_)) {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    let _ = self.progress_tx.send(ProgressEvent {
                        phase: Phase::Hashing,
                        completed: done,
                        total,
                        current_path: Some(job.path.to_path_buf()),
                        errors_count: failed.load(Ordering::Relaxed),
                        elapsed: start.elapsed(),
                    });
                    outcome
                })
                .collect()
        };

        let workers = resolve_workers(self.config.workers);
        match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sortwise-hash-{i}"))
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!(error = %e, "could not start hashing pool, using the global pool");
                run()
            }
        }
    }

    fn hash_job(&self, job: &HashJob<'_>) -> HashOutcome {
        match self.stream_hash(job.path) {
            Ok((hash, read)) if read == job.size => HashOutcome::Hashed { size: read, hash },
            Ok((_, read)) => {
                let err = io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("size changed from {} to {read} bytes", job.size),
                );
                debug!(path = %job.path.display(), "file changed while hashing");
                HashOutcome::Failed(ScanIssue::hash_failed(job.path, &err))
            }
            Err(err) => {
                debug!(path = %job.path.display(), error = %err, "hash failed");
                HashOutcome::Failed(ScanIssue::hash_failed(job.path, &err))
            }
        }
    }

    /// Digest plus the number of bytes actually read.
    fn stream_hash(&self, path: &Path) -> io::Result<(ContentHash, u64)> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.config.chunk_size_bytes.max(1)];
        let mut read_total = 0u64;

        loop {
            let bytes_read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..bytes_read]);
            read_total += bytes_read as u64;
        }

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Ok((ContentHash::new(bytes), read_total))
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(HashConfig::default())
    }
}
