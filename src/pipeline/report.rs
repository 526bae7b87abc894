//! Outcome of one pipeline invocation

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage::RunId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Succeeded => f.write_str("ok"),
            StageStatus::Failed => f.write_str("FAILED"),
            StageStatus::Skipped => f.write_str("skipped"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub name: String,
    pub status: StageStatus,
    #[serde(with = "humantime_serde")]
    pub duration: Option<Duration>,
    /// Stage summary on success, error text on failure
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: RunId,
    pub run_dir: PathBuf,
    pub succeeded: bool,
    pub stages: Vec<StageReport>,
    pub failed_stage: Option<String>,
    pub error: Option<String>,
    /// Runs removed by automatic retention after this run
    pub runs_removed: usize,
}

impl PipelineReport {
    /// One-line outcome, as shown by the HTTP `/train` endpoint
    pub fn message(&self) -> String {
        if self.succeeded {
            format!("Training completed successfully. Run {}", self.run_id)
        } else {
            format!(
                "Training failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} ({})", self.run_id, self.run_dir.display())?;
        for stage in &self.stages {
            let took = stage
                .duration
                .map(|d| format!(" in {:.2}s", d.as_secs_f64()))
                .unwrap_or_default();
            write!(f, "  {:<15} {}{}", stage.name, stage.status, took)?;
            if let Some(detail) = &stage.detail {
                write!(f, ": {}", detail)?;
            }
            writeln!(f)?;
        }
        write!(f, "{}", self.message())
    }
}
