//! Artifact store for pipeline runs
//!
//! Every pipeline invocation owns one timestamped directory under the
//! artifact root. This module allocates those directories, resolves the
//! latest one for out-of-band readers (prediction, CLI), and computes the
//! canonical sub-paths each stage writes.

pub mod cleanup;
pub mod error;
pub mod layout;
pub mod run;


pub use cleanup::{cleanup_runs, CleanupStats, RetentionPolicy};
pub use error::{StorageError, StorageResult};
pub use layout::{ArtifactPaths, Stage};
pub use run::{RunHandle, RunId, RUN_ID_FORMAT};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default artifact root, relative to the working directory
pub const DEFAULT_ARTIFACT_ROOT: &str = "artifacts";

/// File-system artifact store rooted at one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store; nothing is touched on disk until a run is created
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the artifact root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a new run named after the current UTC time
    pub fn create_run(&self) -> StorageResult<RunHandle> {
        self.create_run_at(Utc::now())
    }

    /// Allocate a new run for the given start time
    ///
    /// Identifiers never go backwards: when `at` does not sort after the
    /// latest existing run, the new id is one second after that run.
    pub fn create_run_at(&self, at: DateTime<Utc>) -> StorageResult<RunHandle> {
        ensure_dir(&self.root)?;

        let mut id = RunId::from_datetime(at);
        if let Some(latest) = self.scan_runs()?.pop() {
            if latest >= id {
                debug!(
                    "Run id {} does not follow latest run {}, advancing",
                    id, latest
                );
                id = latest.successor();
            }
        }

        let dir = self.root.join(id.as_str());
        fs::create_dir(&dir).map_err(|e| StorageError::io(&dir, e))?;
        info!("Created run {} at {}", id, dir.display());
        Ok(RunHandle::new(id, dir))
    }

    /// The run whose identifier sorts greatest
    pub fn latest_run(&self) -> StorageResult<RunHandle> {
        let latest = self.scan_runs()?.pop().ok_or_else(|| {
            StorageError::not_found(format!(
                "no runs found under artifact root {}",
                self.root.display()
            ))
        })?;
        Ok(self.handle(latest))
    }

    /// The newest run satisfying `accept`, scanning ids in descending order
    pub fn latest_run_with<F>(&self, accept: F) -> StorageResult<RunHandle>
    where
        F: Fn(&RunHandle) -> bool,
    {
        let runs = self.scan_runs()?;
        let total = runs.len();
        runs.into_iter()
            .rev()
            .map(|id| self.handle(id))
            .find(|run| {
                let accepted = accept(run);
                if !accepted {
                    debug!("Passing over run {}", run.id());
                }
                accepted
            })
            .ok_or_else(|| {
                StorageError::not_found(format!(
                    "no matching run among {} runs under artifact root {}",
                    total,
                    self.root.display()
                ))
            })
    }

    /// All runs, oldest first
    pub fn list_runs(&self) -> StorageResult<Vec<RunHandle>> {
        Ok(self
            .scan_runs()?
            .into_iter()
            .map(|id| self.handle(id))
            .collect())
    }

    /// Resolve a run by identifier
    pub fn open_run(&self, id: &str) -> StorageResult<RunHandle> {
        let id: RunId = id.parse()?;
        let dir = self.root.join(id.as_str());
        if !dir.is_dir() {
            return Err(StorageError::not_found(format!(
                "run {} not found under {}",
                id,
                self.root.display()
            )));
        }
        Ok(RunHandle::new(id, dir))
    }

    /// Join a stage-relative path inside a run; never touches the filesystem
    pub fn path_for(&self, run: &RunHandle, stage: Stage, parts: &[&str]) -> PathBuf {
        parts
            .iter()
            .fold(self.root.join(run.id().as_str()).join(stage.dir_name()), |acc, part| {
                acc.join(part)
            })
    }

    fn handle(&self, id: RunId) -> RunHandle {
        let dir = self.root.join(id.as_str());
        RunHandle::new(id, dir)
    }

    /// Sorted identifiers of every run directory under the root
    fn scan_runs(&self) -> StorageResult<Vec<RunId>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root).map_err(|e| StorageError::io(&self.root, e))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.root, e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| StorageError::io(entry.path(), e))?
                .is_dir();
            if !is_dir {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(RunId::parse) {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }
}

/// Create a directory and its parents; idempotent
pub fn ensure_dir(path: &Path) -> StorageResult<()> {
    fs::create_dir_all(path).map_err(|e| StorageError::io(path, e))
}

fn ensure_parent(path: &Path) -> StorageResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Serialize a value as YAML, creating parent directories
pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    ensure_parent(path)?;
    let content = serde_yaml::to_string(value)?;
    fs::write(path, content).map_err(|e| StorageError::io(path, e))
}

/// Serialize a value as pretty JSON, creating parent directories
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    ensure_parent(path)?;
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).map_err(|e| StorageError::io(path, e))
}

/// Read a JSON document written by [`write_json`]
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<T> {
    let content = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        StorageError::serialization(format!("{}: {}", path.display(), e))
    })
}

/// Read a YAML document written by [`write_yaml`]
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> StorageResult<T> {
    let content = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
    serde_yaml::from_str(&content).map_err(|e| {
        StorageError::serialization(format!("{}: {}", path.display(), e))
    })
}
