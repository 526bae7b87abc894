//! The five standard stages

use async_trait::async_trait;
use tracing::info;

use super::{run_blocking, PipelineStage, StageContext};
use crate::error::{PipelineError, Result};
use crate::storage::Stage;
use crate::{evaluation, ingestion, training, transform, validation};

/// Fetch, split and persist raw data
pub struct IngestionStage;

#[async_trait]
impl PipelineStage for IngestionStage {
    fn stage(&self) -> Stage {
        Stage::Ingestion
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<String> {
        let out = ingestion::ingest(
            ctx.source,
            &ctx.config.source.collection,
            ctx.run,
            ctx.config.split_ratio,
            ctx.config.seed()?,
        )
        .await?;
        Ok(format!(
            "{} rows -> {} train / {} test",
            out.raw_rows, out.train_rows, out.test_rows
        ))
    }
}

/// Check both splits against the schema; a failing report halts the run
pub struct ValidationStage;

#[async_trait]
impl PipelineStage for ValidationStage {
    fn stage(&self) -> Stage {
        Stage::Validation
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<String> {
        let run = ctx.run.clone();
        let schema = ctx.schema.clone();
        let (report, path) = run_blocking(move || {
            let report = validation::check(&run, &schema)?;
            let path = validation::save_report(&run, &report)?;
            Ok((report, path))
        })
        .await?;
        if !report.ok {
            let message = match &report.error {
                Some(error) => error.clone(),
                None => format!(
                    "splits do not match the schema: {}",
                    report.failed_splits().join(", ")
                ),
            };
            return Err(PipelineError::validation_failed(message, Some(path)));
        }
        Ok(format!("report at {}", path.display()))
    }
}

/// Fit the preprocessor on train and encode both splits
pub struct TransformationStage;

#[async_trait]
impl PipelineStage for TransformationStage {
    fn stage(&self) -> Stage {
        Stage::Transformation
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<String> {
        let run = ctx.run.clone();
        let schema = ctx.schema.clone();
        let steps = ctx.config.feature_steps.clone();
        let out = run_blocking(move || transform::transform_split(&run, &schema, &steps)).await?;
        Ok(format!(
            "{} encoded features, train {} rows, test {} rows",
            out.preprocessor.encoder.width(),
            out.train.rows(),
            out.test.rows()
        ))
    }
}

/// Fit and persist the forest
pub struct TrainingStage;

#[async_trait]
impl PipelineStage for TrainingStage {
    fn stage(&self) -> Stage {
        Stage::Training
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<String> {
        let params = ctx.config.hyperparameters()?;
        let run = ctx.run.clone();
        let (model, path) = run_blocking(move || training::train_run(&run, &params)).await?;
        info!("Trained {} trees over {} classes", model.n_trees(), model.classes().len());
        Ok(format!("model at {}", path.display()))
    }
}

/// Score the model on the test split
pub struct EvaluationStage;

#[async_trait]
impl PipelineStage for EvaluationStage {
    fn stage(&self) -> Stage {
        Stage::Evaluation
    }

    async fn run(&self, ctx: &StageContext<'_>) -> Result<String> {
        let run = ctx.run.clone();
        let (report, _) = run_blocking(move || evaluation::evaluate_run(&run)).await?;
        Ok(format!(
            "accuracy {:.4}, precision {:.4}",
            report.accuracy, report.precision
        ))
    }
}

/// Stages in execution order
pub fn default_stages() -> Vec<Box<dyn PipelineStage>> {
    vec![
        Box::new(IngestionStage),
        Box::new(ValidationStage),
        Box::new(TransformationStage),
        Box::new(TrainingStage),
        Box::new(EvaluationStage),
    ]
}
