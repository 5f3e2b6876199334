//! Concurrent scan driver.
//!
//! Directories are profiled on a fixed-size rayon pool. Workers never touch
//! the aggregate: each finished unit is sent back over a channel and merged
//! by the thread that called [`ConcurrentScanner::scan`], which is the only
//! writer of the [`ScanResult`].

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use crossbeam_channel::unbounded;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use sortwise_core::{
    CancelToken, ErrorKind, Phase, ProgressEvent, ScanConfig, ScanError, ScanIssue, ScanMode,
    ScanResult, ScanState, SkippedDirectory, UnitOutcome, resolve_workers,
};

use crate::filter::PathFilter;
use crate::profiler::DirectoryProfiler;

/// One directory waiting to be profiled.
#[derive(Debug, Clone)]
struct Unit {
    path: PathBuf,
    /// Depth below the root it was discovered under.
    depth: u32,
}

/// A unit's outcome plus the subdirectories it wants queued.
struct FinishedUnit {
    path: PathBuf,
    outcome: UnitOutcome,
    queued: Vec<Unit>,
}

/// How workers treat a unit; copied into every job.
#[derive(Debug, Clone, Copy)]
struct UnitPlan {
    mode: ScanMode,
    depth_limit: u32,
    max_depth: Option<u32>,
}

/// Lock-free holder for the scanner's lifecycle state.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: ScanState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn set(&self, state: ScanState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    fn get(&self) -> ScanState {
        match self.0.load(Ordering::SeqCst) {
            0 => ScanState::Idle,
            1 => ScanState::Running,
            2 => ScanState::Completed,
            3 => ScanState::Cancelled,
            _ => ScanState::Failed,
        }
    }
}

/// Profiles many directories in parallel and aggregates the results.
pub struct ConcurrentScanner {
    config: ScanConfig,
    filter: Arc<PathFilter>,
    profiler: DirectoryProfiler,
    progress_tx: broadcast::Sender<ProgressEvent>,
    state: StateCell,
}

impl ConcurrentScanner {
    /// Create a scanner for the given configuration.
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        if config.roots.is_empty() {
            return Err(ScanError::invalid_config("at least one root is required"));
        }
        let filter = PathFilter::new(&config.filter)?;
        Ok(Self::with_filter(config, filter))
    }

    /// Create a scanner with a pre-built filter.
    pub fn with_filter(config: ScanConfig, filter: PathFilter) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            filter: Arc::new(filter),
            profiler: DirectoryProfiler::new(),
            progress_tx,
            state: StateCell::new(ScanState::Idle),
        }
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress_tx.subscribe()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ScanState {
        self.state.get()
    }

    /// Configuration in use.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Run a scan until every unit is merged or `cancel` trips.
    pub fn scan(&self, cancel: &CancelToken) -> Result<ScanResult, ScanError> {
        self.scan_with(cancel, |_| {})
    }

    /// Run a scan, calling `on_checkpoint` on the merging thread after each
    /// unit is merged. The aggregate is consistent at every checkpoint.
    pub fn scan_with<F>(
        &self,
        cancel: &CancelToken,
        mut on_checkpoint: F,
    ) -> Result<ScanResult, ScanError>
    where
        F: FnMut(&ProgressEvent),
    {
        let start = Instant::now();
        self.state.set(ScanState::Running);

        let (roots, failed_roots, last_error) = self.resolve_roots();
        if roots.is_empty() {
            self.state.set(ScanState::Failed);
            warn!(count = failed_roots.len(), "no scan root was accessible");
            return Err(match last_error {
                Some(err) if failed_roots.len() == 1 => err,
                _ => ScanError::AllRootsFailed {
                    count: failed_roots.len(),
                },
            });
        }

        let mut result = ScanResult::new(roots.clone(), self.config.mode);
        result.failed_roots = failed_roots;

        let seeds = self.seed_units(&roots, &mut result);
        let workers = resolve_workers(self.config.workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sortwise-scan-{i}"))
            .build()
            .map_err(|e| {
                self.state.set(ScanState::Failed);
                ScanError::WorkerPool {
                    message: e.to_string(),
                }
            })?;

        info!(
            roots = roots.len(),
            units = seeds.len(),
            workers,
            mode = ?self.config.mode,
            "starting scan"
        );

        let plan = UnitPlan {
            mode: self.config.mode,
            depth_limit: self.config.unit_depth(),
            max_depth: self.config.max_depth,
        };
        let (tx, rx) = unbounded::<FinishedUnit>();
        let mut queue: VecDeque<Unit> = seeds.into();
        let mut total = queue.len() as u64;
        let mut in_flight = 0usize;
        let mut cancelled = false;

        loop {
            if !cancelled && cancel.is_cancelled() {
                cancelled = true;
                info!(in_flight, queued = queue.len(), "cancellation requested");
            }

            while !cancelled && in_flight < workers {
                let Some(unit) = queue.pop_front() else {
                    break;
                };
                let tx = tx.clone();
                let filter = Arc::clone(&self.filter);
                let profiler = self.profiler;
                pool.spawn(move || {
                    let finished = run_unit(&profiler, &filter, unit, plan);
                    // The receiver outlives every job.
                    let _ = tx.send(finished);
                });
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }

            let Ok(finished) = rx.recv() else {
                break;
            };
            in_flight -= 1;

            if cancelled || cancel.is_cancelled() {
                cancelled = true;
                result.units_discarded += 1;
                continue;
            }

            // Merge step: the only place the aggregate is mutated.
            total += finished.queued.len() as u64;
            queue.extend(finished.queued);
            debug!(
                path = %finished.path.display(),
                files = finished.outcome.records.len(),
                errors = finished.outcome.errors.len(),
                "merged unit"
            );
            result.merge(finished.outcome);

            let event = ProgressEvent {
                phase: Phase::Profiling,
                completed: result.units_completed,
                total,
                current_path: Some(finished.path),
                errors_count: result.errors.len() as u64,
                elapsed: start.elapsed(),
            };
            let _ = self.progress_tx.send(event.clone());
            on_checkpoint(&event);
        }

        let final_state = if cancelled {
            ScanState::Cancelled
        } else {
            ScanState::Completed
        };
        result.status = final_state;
        result.duration = start.elapsed();
        self.state.set(final_state);

        info!(
            state = %final_state,
            units = result.units_completed,
            discarded = result.units_discarded,
            files = result.records.len(),
            errors = result.errors.len(),
            elapsed = ?result.duration,
            "scan finished"
        );

        Ok(result)
    }

    /// Canonicalize roots, drop nested duplicates and record the ones that
    /// cannot be read.
    fn resolve_roots(&self) -> (Vec<PathBuf>, Vec<ScanIssue>, Option<ScanError>) {
        let mut roots = Vec::new();
        let mut failed = Vec::new();
        let mut last_error = None;

        for root in &self.config.roots {
            match check_root(root) {
                Ok(path) => roots.push(path),
                Err(err) => {
                    warn!(root = %root.display(), error = %err, "root inaccessible");
                    failed.push(root_issue(root, &err));
                    last_error = Some(err);
                }
            }
        }

        roots.sort();
        roots.dedup();
        let mut kept: Vec<PathBuf> = Vec::with_capacity(roots.len());
        for root in roots {
            if !kept.iter().any(|k| root.starts_with(k)) {
                kept.push(root);
            }
        }

        (kept, failed, last_error)
    }

    /// Turn roots into the initial work queue.
    fn seed_units(&self, roots: &[PathBuf], result: &mut ScanResult) -> Vec<Unit> {
        match self.config.mode {
            ScanMode::Tree => roots
                .iter()
                .map(|root| Unit {
                    path: root.clone(),
                    depth: 0,
                })
                .collect(),
            ScanMode::Survey => {
                let mut units = Vec::new();
                for root in roots {
                    let mut seed = UnitOutcome::default();
                    let candidates = list_subdirectories(root, &mut seed.errors);
                    for dir in candidates {
                        match self.filter.evaluate(&dir) {
                            Some(reason) => {
                                seed.skipped.push(SkippedDirectory { path: dir, reason })
                            }
                            None => units.push(Unit { path: dir, depth: 1 }),
                        }
                    }
                    result.errors.extend(seed.errors);
                    result.skipped.extend(seed.skipped);
                }
                units.sort_by(|a, b| a.path.cmp(&b.path));
                units
            }
        }
    }
}

/// Profile one unit and pick which of its subdirectories to queue.
fn run_unit(
    profiler: &DirectoryProfiler,
    filter: &PathFilter,
    unit: Unit,
    plan: UnitPlan,
) -> FinishedUnit {
    let profiled = profiler.profile(&unit.path, plan.depth_limit);

    let mut skipped = Vec::new();
    let mut queued = Vec::new();
    if plan.mode == ScanMode::Tree {
        let child_depth = unit.depth + 1;
        let within_limit = plan.max_depth.is_none_or(|max| child_depth <= max);
        if within_limit {
            for dir in profiled.unexpanded {
                match filter.evaluate(&dir) {
                    Some(reason) => skipped.push(SkippedDirectory { path: dir, reason }),
                    None => queued.push(Unit {
                        path: dir,
                        depth: child_depth,
                    }),
                }
            }
        }
    }

    FinishedUnit {
        path: unit.path,
        outcome: UnitOutcome {
            profile: profiled.listed.then_some(profiled.profile),
            records: profiled.records,
            errors: profiled.errors,
            skipped,
        },
        queued,
    }
}

/// Resolve a root to a canonical, listable directory.
fn check_root(root: &Path) -> Result<PathBuf, ScanError> {
    let path = root.canonicalize().map_err(|e| ScanError::io(root, e))?;
    let metadata = fs::metadata(&path).map_err(|e| ScanError::io(&path, e))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory { path });
    }
    fs::read_dir(&path).map_err(|e| ScanError::io(&path, e))?;
    Ok(path)
}

fn root_issue(root: &Path, err: &ScanError) -> ScanIssue {
    let kind = match err {
        ScanError::PermissionDenied { .. } => ErrorKind::AccessDenied,
        ScanError::NotFound { .. } => ErrorKind::PathNotFound,
        _ => ErrorKind::IoError,
    };
    ScanIssue::new(root, kind, err.to_string())
}

/// Immediate, non-symlink subdirectories of `dir`, sorted by path.
fn list_subdirectories(dir: &Path, errors: &mut Vec<ScanIssue>) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            errors.push(ScanIssue::from_io(dir, &err));
            return Vec::new();
        }
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                errors.push(ScanIssue::from_io(dir, &err));
                continue;
            }
        };
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => dirs.push(entry.path()),
            Ok(_) => {}
            Err(err) => errors.push(ScanIssue::from_io(entry.path(), &err)),
        }
    }
    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use sortwise_core::{FilterConfig, SkipReason};
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("photos")).unwrap();
        fs::create_dir(root.join("photos/2020")).unwrap();
        fs::create_dir(root.join("docs")).unwrap();
        fs::create_dir(root.join("node_modules")).unwrap();

        fs::write(root.join("loose.txt"), "loose").unwrap();
        fs::write(root.join("photos/a.jpg"), "aaaa").unwrap();
        fs::write(root.join("photos/2020/b.jpg"), "bbbb").unwrap();
        fs::write(root.join("docs/c.pdf"), "cccc").unwrap();
        fs::write(root.join("node_modules/d.js"), "dddd").unwrap();

        temp
    }

    #[test]
    fn test_tree_scan() {
        let temp = create_test_tree();
        let scanner = ConcurrentScanner::new(ScanConfig::tree(temp.path())).unwrap();
        let result = scanner.scan(&CancelToken::new()).unwrap();

        assert_eq!(scanner.state(), ScanState::Completed);
        assert_eq!(result.status, ScanState::Completed);
        // root, photos, photos/2020, docs
        assert_eq!(result.profiles.len(), 4);
        assert_eq!(result.records.len(), 4);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].reason, SkipReason::SystemName);

        for (path, profile) in &result.profiles {
            assert_eq!(result.direct_children(path).count() as u64, profile.total_files);
        }
    }

    #[test]
    fn test_survey_scan() {
        let temp = create_test_tree();
        let scanner = ConcurrentScanner::new(ScanConfig::new(temp.path())).unwrap();
        let result = scanner.scan(&CancelToken::new()).unwrap();

        let root = temp.path().canonicalize().unwrap();
        assert_eq!(result.profiles.len(), 2);
        let photos = &result.profiles[&root.join("photos")];
        assert_eq!(photos.depth_limit, 0);
        assert_eq!(photos.total_files, 1);
        assert_eq!(photos.subdirectory_count, 1);
        // loose root files are not part of any candidate
        assert_eq!(result.records.len(), 2);

        for (path, profile) in &result.profiles {
            assert_eq!(result.direct_children(path).count() as u64, profile.total_files);
        }
    }

    #[test]
    fn test_deeper_survey_separates_direct_files() {
        let temp = create_test_tree();
        let mut config = ScanConfig::new(temp.path());
        config.depth_limit = 2;
        let result = ConcurrentScanner::new(config)
            .unwrap()
            .scan(&CancelToken::new())
            .unwrap();

        let root = temp.path().canonicalize().unwrap();
        let photos = &result.profiles[&root.join("photos")];
        assert_eq!(photos.total_files, 2);
        assert_eq!(photos.direct_files, 1);
        for (path, profile) in &result.profiles {
            assert_eq!(result.direct_children(path).count() as u64, profile.direct_files);
        }
    }

    #[test]
    fn test_missing_root_fails() {
        let temp = TempDir::new().unwrap();
        let scanner = ConcurrentScanner::new(ScanConfig::tree(temp.path().join("nope"))).unwrap();
        let err = scanner.scan(&CancelToken::new()).unwrap_err();

        assert!(matches!(err, ScanError::NotFound { .. }));
        assert_eq!(scanner.state(), ScanState::Failed);
    }

    #[test]
    fn test_file_root_is_not_a_directory() {
        let temp = create_test_tree();
        let config = ScanConfig::tree(temp.path().join("loose.txt"));
        let scanner = ConcurrentScanner::new(config).unwrap();
        assert!(matches!(
            scanner.scan(&CancelToken::new()),
            Err(ScanError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_one_bad_root_is_not_fatal() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .roots(vec![temp.path().join("docs"), temp.path().join("missing")])
            .mode(ScanMode::Tree)
            .build()
            .unwrap();
        let result = ConcurrentScanner::new(config)
            .unwrap()
            .scan(&CancelToken::new())
            .unwrap();

        assert_eq!(result.failed_roots.len(), 1);
        assert_eq!(result.failed_roots[0].kind, ErrorKind::PathNotFound);
        assert_eq!(result.records.len(), 1);
    }

    #[test]
    fn test_nested_roots_collapse() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .roots(vec![temp.path().to_path_buf(), temp.path().join("photos")])
            .mode(ScanMode::Tree)
            .filter(FilterConfig::permissive())
            .build()
            .unwrap();
        let result = ConcurrentScanner::new(config)
            .unwrap()
            .scan(&CancelToken::new())
            .unwrap();

        assert_eq!(result.roots.len(), 1);
        assert_eq!(result.records.len(), 5);
    }

    #[test]
    fn test_max_depth_stops_queueing() {
        let temp = create_test_tree();
        let mut config = ScanConfig::tree(temp.path());
        config.max_depth = Some(1);
        let result = ConcurrentScanner::new(config)
            .unwrap()
            .scan(&CancelToken::new())
            .unwrap();

        // root, photos, docs; photos/2020 is counted but not expanded
        assert_eq!(result.profiles.len(), 3);
        let root = temp.path().canonicalize().unwrap();
        assert_eq!(result.profiles[&root.join("photos")].subdirectory_count, 1);
    }

    #[test]
    fn test_cancel_before_start() {
        let temp = create_test_tree();
        let cancel = CancelToken::new();
        cancel.cancel();

        let scanner = ConcurrentScanner::new(ScanConfig::tree(temp.path())).unwrap();
        let result = scanner.scan(&cancel).unwrap();

        assert!(result.is_partial());
        assert!(result.profiles.is_empty());
        assert_eq!(scanner.state(), ScanState::Cancelled);
    }

    #[cfg(unix)]
    #[test]
    fn test_survey_ignores_symlinked_directories() {
        let temp = create_test_tree();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("e.jpg"), "eeee").unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("linked")).unwrap();

        let result = ConcurrentScanner::new(ScanConfig::new(temp.path()))
            .unwrap()
            .scan(&CancelToken::new())
            .unwrap();

        let root = temp.path().canonicalize().unwrap();
        assert!(!result.profiles.contains_key(&root.join("linked")));
        assert!(result.skipped.iter().all(|s| !s.path.ends_with("linked")));
        assert_eq!(result.profiles.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_tree_scan_survives_symlink_loop() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(temp.path(), temp.path().join("photos/back")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("photos"), temp.path().join("photos/2020/up"))
            .unwrap();

        let scanner = ConcurrentScanner::new(ScanConfig::tree(temp.path())).unwrap();
        let result = scanner.scan(&CancelToken::new()).unwrap();

        assert_eq!(scanner.state(), ScanState::Completed);
        assert_eq!(result.profiles.len(), 4);
        assert_eq!(result.records.len(), 4);
        let root = temp.path().canonicalize().unwrap();
        assert_eq!(result.profiles[&root.join("photos")].subdirectory_count, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_still_export() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(OsStr::from_bytes(b"caf\xe9.jpg")), "jpeg").unwrap();

        let result = ConcurrentScanner::new(ScanConfig::tree(temp.path()))
            .unwrap()
            .scan(&CancelToken::new())
            .unwrap();
        assert_eq!(result.records.len(), 1);

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("caf\u{fffd}.jpg"));
    }

    #[test]
    fn test_empty_directories_from_tree_scan() {
        let temp = create_test_tree();
        fs::create_dir_all(temp.path().join("hollow/inner/deepest")).unwrap();
        fs::create_dir(temp.path().join("photos/blank")).unwrap();

        let result = ConcurrentScanner::new(ScanConfig::tree(temp.path()))
            .unwrap()
            .scan(&CancelToken::new())
            .unwrap();

        let root = temp.path().canonicalize().unwrap();
        assert_eq!(
            result.empty_directories(),
            vec![
                root.join("hollow"),
                root.join("hollow/inner"),
                root.join("hollow/inner/deepest"),
                root.join("photos/blank"),
            ]
        );
    }

    #[test]
    fn test_progress_broadcast() {
        let temp = create_test_tree();
        let scanner = ConcurrentScanner::new(ScanConfig::tree(temp.path())).unwrap();
        let mut rx = scanner.subscribe();
        let result = scanner.scan(&CancelToken::new()).unwrap();

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.phase, Phase::Profiling);
            last = Some(event);
        }
        let last = last.unwrap();
        assert_eq!(last.completed, result.units_completed);
        assert_eq!(last.completed, last.total);
    }
}
