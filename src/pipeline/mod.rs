//! Stage orchestration
//!
//! A pipeline run creates one timestamped run directory and executes the
//! stages in order against it. The first failing stage halts the run; later
//! stages are reported as skipped. Artifacts written before the failure stay
//! on disk.

pub mod report;
pub mod stages;


pub use report::{PipelineReport, StageReport, StageStatus};
pub use stages::{
    default_stages, EvaluationStage, IngestionStage, TrainingStage, TransformationStage,
    ValidationStage,
};

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn, Instrument, Span};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::schema::{load_schema, Schema};
use crate::source::{self, DocumentSource};
use crate::storage::{cleanup_runs, ArtifactStore, RunHandle, Stage};

/// Everything a stage may read; the run handle is the only channel
/// between stages
pub struct StageContext<'a> {
    pub config: &'a PipelineConfig,
    pub schema: &'a Schema,
    pub run: &'a RunHandle,
    pub source: &'a dyn DocumentSource,
}

/// Run blocking or CPU-bound work on tokio's blocking pool
///
/// The closure runs inside the caller's tracing span, so stage logs keep
/// their `stage` and `run_id` fields.
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let span = Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(work)).await?
}

/// One step of the pipeline
#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn stage(&self) -> Stage;

    fn name(&self) -> &'static str {
        self.stage().name()
    }

    /// Run the stage, returning a short summary for the report
    async fn run(&self, ctx: &StageContext<'_>) -> Result<String>;
}

pub struct Pipeline {
    config: PipelineConfig,
    source: Arc<dyn DocumentSource>,
    store: ArtifactStore,
    stages: Vec<Box<dyn PipelineStage>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, source: Arc<dyn DocumentSource>) -> Self {
        let store = ArtifactStore::new(config.artifact_root.clone());
        Self {
            config,
            source,
            store,
            stages: default_stages(),
        }
    }

    /// Build with the source named by the configuration
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let source: Arc<dyn DocumentSource> = Arc::from(source::from_config(&config.source)?);
        Ok(Self::new(config, source))
    }

    /// Replace the stage list
    pub fn with_stages(mut self, stages: Vec<Box<dyn PipelineStage>>) -> Self {
        self.stages = stages;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute all stages against a fresh run
    ///
    /// Configuration, schema and run-directory problems are returned as
    /// errors before any stage starts. A failing stage is not an error of
    /// this call: the returned report has `succeeded == false`.
    pub async fn run(&self) -> Result<PipelineReport> {
        self.config.validate()?;
        let schema = load_schema(&self.config.schema_path)?;
        schema.check_feature_groups()?;
        let run = self.store.create_run()?;

        info!(
            "Starting run {} with {} stages from {}",
            run.id(),
            self.stages.len(),
            self.source.describe()
        );

        let ctx = StageContext {
            config: &self.config,
            schema: &schema,
            run: &run,
            source: self.source.as_ref(),
        };

        let mut report = PipelineReport {
            run_id: run.id().clone(),
            run_dir: run.dir().to_path_buf(),
            succeeded: true,
            stages: Vec::with_capacity(self.stages.len()),
            failed_stage: None,
            error: None,
            runs_removed: 0,
        };

        for stage in &self.stages {
            if !report.succeeded {
                report.stages.push(StageReport {
                    name: stage.name().to_string(),
                    status: StageStatus::Skipped,
                    duration: None,
                    detail: None,
                });
                continue;
            }

            let span = tracing::info_span!("stage", name = %stage.name(), run_id = %run.id());
            let started = Instant::now();
            let result = async {
                info!("Stage started");
                stage.run(&ctx).await
            }
            .instrument(span.clone())
            .await;
            let duration = started.elapsed();

            match result {
                Ok(summary) => {
                    span.in_scope(|| info!("Stage finished in {:.2?}: {}", duration, summary));
                    report.stages.push(StageReport {
                        name: stage.name().to_string(),
                        status: StageStatus::Succeeded,
                        duration: Some(duration),
                        detail: Some(summary),
                    });
                }
                Err(e) => {
                    span.in_scope(|| error!("Stage failed: {}", e));
                    report.succeeded = false;
                    report.failed_stage = Some(stage.name().to_string());
                    report.error = Some(e.to_string());
                    report.stages.push(StageReport {
                        name: stage.name().to_string(),
                        status: StageStatus::Failed,
                        duration: Some(duration),
                        detail: Some(e.user_message()),
                    });
                }
            }
        }

        if report.succeeded {
            info!("Run {} completed", run.id());
            if self.config.retention.is_enabled() {
                report.runs_removed = self.apply_retention();
            }
        } else {
            warn!(
                "Run {} halted at stage {}",
                run.id(),
                report.failed_stage.as_deref().unwrap_or("?")
            );
        }

        Ok(report)
    }

    /// Prune old runs; problems are logged, never fatal to the run
    fn apply_retention(&self) -> usize {
        let policy = match self.config.retention.policy() {
            Ok(policy) => policy,
            Err(e) => {
                warn!("Skipping retention: {}", e);
                return 0;
            }
        };
        match cleanup_runs(&self.store, &policy, Utc::now()) {
            Ok(stats) => {
                if stats.runs_removed() > 0 {
                    info!("Retention removed {} old runs", stats.runs_removed());
                }
                stats.runs_removed()
            }
            Err(e) => {
                warn!("Retention failed: {}", e);
                0
            }
        }
    }
}
