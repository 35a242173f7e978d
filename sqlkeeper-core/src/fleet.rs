//! Fleet maintenance: write-ahead-log checkpointing across a directory tree
//!
//! A sweep discovers every database file beneath a root directory and runs a
//! checkpoint against each one in isolation: one locked or corrupt file is
//! recorded as a failure and the sweep moves on. Results fold into a
//! [`SweepSummary`]; nothing is persisted between runs, and re-running the
//! sweep is the retry mechanism.

use crate::config::FleetConfig;
use crate::db::open_connection;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Instant;

/// Frame counts reported by the store's checkpoint primitive.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CheckpointStats {
    /// Frames in the write-ahead log before the checkpoint
    pub log_frames: i64,
    /// Frames merged into the main file
    pub checkpointed_frames: i64,
}

/// Outcome of one unit of fleet work.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MaintenanceOutcome {
    Success { stats: CheckpointStats },
    Failure { error: String },
}

/// One candidate file and what happened to it.
#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceResult {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: MaintenanceOutcome,
}

impl MaintenanceResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, MaintenanceOutcome::Success { .. })
    }
}

/// Aggregated outcome of one sweep.
///
/// For a sweep that ran to completion, `succeeded + failed` equals the number
/// of candidates discovered, each counted exactly once; `skipped` counts the
/// non-candidate files that were seen and never opened. A cancelled sweep
/// reports only the candidates processed before the cancellation point.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<MaintenanceResult>,
}

/// Checkpoint a single database file.
///
/// Opens a scoped connection, merges the write-ahead log into the main file
/// and truncates the log, then releases the connection. Idempotent: a file
/// with no pending WAL content is a no-op success. A log locked by another
/// connection is [`Error::CheckpointBusy`].
pub fn checkpoint_file(path: &Path) -> Result<CheckpointStats> {
    let conn = open_connection(path)?;

    let (busy, log_frames, checkpointed_frames): (i64, i64, i64) = conn.query_row(
        "PRAGMA wal_checkpoint(TRUNCATE)",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    if busy != 0 {
        return Err(Error::CheckpointBusy {
            path: path.to_path_buf(),
        });
    }

    Ok(CheckpointStats {
        log_frames,
        checkpointed_frames,
    })
}

/// Sweeps a directory tree, checkpointing every recognized database file.
///
/// Candidates are matched by file extension against a configurable
/// allow-list. Each candidate is processed through its own connection; with
/// `jobs > 1` a fixed-size worker pool claims candidates from an immutable
/// work list, which is safe because distinct files are distinct lock domains.
pub struct Checkpointer {
    extensions: Vec<String>,
    jobs: usize,
    cancel: Arc<AtomicBool>,
}

impl Checkpointer {
    pub fn new(config: &FleetConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            jobs: config.jobs.max(1),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared cancellation flag.
    ///
    /// Setting it stops the sweep before the next candidate is claimed; a
    /// checkpoint already in flight runs to completion first. The flag is
    /// sticky: build a new `Checkpointer` for a fresh sweep.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Sweep `root`, returning the folded summary.
    pub fn sweep(&self, root: &Path) -> Result<SweepSummary> {
        self.sweep_with_progress(root, |_, _, _| {})
    }

    /// Sweep with a progress callback.
    ///
    /// `on_progress(completed, total, path)` is invoked after each candidate
    /// finishes, in completion order.
    pub fn sweep_with_progress<F>(&self, root: &Path, mut on_progress: F) -> Result<SweepSummary>
    where
        F: FnMut(usize, usize, &Path),
    {
        let started = Instant::now();
        let (candidates, skipped) = self.discover(root)?;

        tracing::info!(
            root = %root.display(),
            candidates = candidates.len(),
            skipped,
            jobs = self.jobs,
            "Starting checkpoint sweep"
        );

        let results = if self.jobs > 1 && candidates.len() > 1 {
            self.run_pool(&candidates, &mut on_progress)
        } else {
            self.run_sequential(&candidates, &mut on_progress)
        };

        let mut summary = SweepSummary {
            succeeded: 0,
            failed: 0,
            skipped,
            duration_ms: started.elapsed().as_millis() as u64,
            finished_at: Utc::now(),
            results,
        };
        for result in &summary.results {
            if result.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            duration_ms = summary.duration_ms,
            "Checkpoint sweep finished"
        );

        Ok(summary)
    }

    /// Walk the tree under `root`, splitting files into candidates and
    /// skipped non-candidates. Non-candidates are never opened.
    fn discover(&self, root: &Path) -> Result<(Vec<PathBuf>, usize)> {
        if !root.is_dir() {
            let message = if root.exists() {
                "not a directory".to_string()
            } else {
                "no such directory".to_string()
            };
            return Err(Error::Traversal {
                root: root.to_path_buf(),
                message,
            });
        }

        let pattern = root.join("**").join("*");
        let entries = glob::glob(&pattern.to_string_lossy()).map_err(|e| Error::Traversal {
            root: root.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut candidates = Vec::new();
        let mut skipped = 0usize;
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable entry during sweep discovery");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            if self.is_candidate(&path) {
                candidates.push(path);
            } else {
                skipped += 1;
            }
        }

        Ok((candidates, skipped))
    }

    /// A file is a candidate iff its extension is on the allow-list.
    fn is_candidate(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false)
    }

    fn run_sequential<F>(&self, candidates: &[PathBuf], on_progress: &mut F) -> Vec<MaintenanceResult>
    where
        F: FnMut(usize, usize, &Path),
    {
        let total = candidates.len();
        let mut results = Vec::with_capacity(total);

        for (i, path) in candidates.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                tracing::info!(processed = i, total, "Sweep cancelled");
                break;
            }
            results.push(process_candidate(path));
            on_progress(i + 1, total, path);
        }

        results
    }

    fn run_pool<F>(&self, candidates: &[PathBuf], on_progress: &mut F) -> Vec<MaintenanceResult>
    where
        F: FnMut(usize, usize, &Path),
    {
        let total = candidates.len();
        let workers = self.jobs.min(total);
        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<MaintenanceResult>();
        let mut results = Vec::with_capacity(total);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                let cancel = &self.cancel;
                scope.spawn(move || loop {
                    if cancel.load(Ordering::SeqCst) {
                        break;
                    }
                    let i = cursor.fetch_add(1, Ordering::SeqCst);
                    if i >= total {
                        break;
                    }
                    if tx.send(process_candidate(&candidates[i])).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            let mut done = 0usize;
            for result in rx {
                done += 1;
                on_progress(done, total, &result.path);
                results.push(result);
            }
        });

        results
    }
}

/// Run the unit operation on one candidate, capturing any error as that
/// file's failure.
fn process_candidate(path: &Path) -> MaintenanceResult {
    match checkpoint_file(path) {
        Ok(stats) => {
            tracing::debug!(
                path = %path.display(),
                log_frames = stats.log_frames,
                checkpointed_frames = stats.checkpointed_frames,
                "Checkpointed"
            );
            MaintenanceResult {
                path: path.to_path_buf(),
                outcome: MaintenanceOutcome::Success { stats },
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Checkpoint failed");
            MaintenanceResult {
                path: path.to_path_buf(),
                outcome: MaintenanceOutcome::Failure {
                    error: e.to_string(),
                },
            }
        }
    }
}
