//! Retention for accumulated runs
//!
//! Runs are never deleted by the pipeline itself. This module removes old
//! runs on request, by count (`keep_last`) and/or by age (`older_than`),
//! judged by the timestamp encoded in the run id rather than file times.

use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::error::{StorageError, StorageResult};
use super::run::RunId;
use super::ArtifactStore;

/// Which runs a cleanup pass may remove
#[derive(Debug, Clone, Default)]
pub struct RetentionPolicy {
    /// Always keep this many of the newest runs
    pub keep_last: Option<usize>,
    /// Only remove runs started longer ago than this
    pub older_than: Option<Duration>,
    /// Preview what would be removed without deleting anything
    pub dry_run: bool,
}

impl RetentionPolicy {
    pub fn keep_last(count: usize) -> Self {
        Self {
            keep_last: Some(count),
            ..Self::default()
        }
    }

    /// A policy with neither bound removes nothing
    pub fn is_noop(&self) -> bool {
        self.keep_last.is_none() && self.older_than.is_none()
    }
}

/// Statistics from a cleanup pass
#[derive(Debug, Clone, Default)]
pub struct CleanupStats {
    /// Number of runs inspected
    pub runs_scanned: usize,
    /// Runs removed (or that would be removed in dry-run mode)
    pub removed: Vec<RunId>,
    /// Bytes reclaimed from cleanup
    pub bytes_reclaimed: u64,
    /// Errors encountered during cleanup
    pub errors: Vec<String>,
}

impl CleanupStats {
    pub fn runs_removed(&self) -> usize {
        self.removed.len()
    }

    /// Format bytes as human-readable string
    pub fn format_bytes(bytes: u64) -> String {
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.2} KB", bytes as f64 / 1024.0)
        } else if bytes < 1024 * 1024 * 1024 {
            format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
        } else {
            format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
        }
    }
}

/// Remove runs outside the retention policy
///
/// The newest run is never removed, whatever the policy says.
pub fn cleanup_runs(
    store: &ArtifactStore,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> StorageResult<CleanupStats> {
    let runs = store.list_runs()?;
    let mut stats = CleanupStats {
        runs_scanned: runs.len(),
        ..CleanupStats::default()
    };

    if policy.is_noop() || runs.is_empty() {
        return Ok(stats);
    }

    let protected = policy.keep_last.unwrap_or(0).max(1);
    let candidates = runs.len().saturating_sub(protected);
    let cutoff = policy.older_than.map(|age| now - age);

    for run in runs.into_iter().take(candidates) {
        if let Some(cutoff) = cutoff {
            if run.id().timestamp() >= cutoff {
                debug!("Keeping run {}: newer than cutoff", run.id());
                continue;
            }
        }

        let size = calculate_dir_size(run.dir()).unwrap_or(0);
        if policy.dry_run {
            info!("[dry-run] Would remove run {}", run.id());
        } else if let Err(e) = fs::remove_dir_all(run.dir()) {
            warn!("Failed to remove run {}: {}", run.id(), e);
            stats.errors.push(format!("{}: {}", run.id(), e));
            continue;
        } else {
            info!("Removed run {}", run.id());
        }
        stats.bytes_reclaimed += size;
        stats.removed.push(run.id().clone());
    }

    Ok(stats)
}

/// Total size of the files below a directory
pub fn calculate_dir_size(path: &Path) -> StorageResult<u64> {
    let mut total = 0;
    let entries = fs::read_dir(path).map_err(|e| StorageError::io(path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(path, e))?;
        let meta = entry
            .metadata()
            .map_err(|e| StorageError::io(entry.path(), e))?;
        if meta.is_dir() {
            total += calculate_dir_size(&entry.path())?;
        } else {
            total += meta.len();
        }
    }
    Ok(total)
}
