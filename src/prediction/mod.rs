//! Online prediction against a persisted run
//!
//! A [`Predictor`] pairs the model of one run with the preprocessor fitted in
//! the same run, so live records are encoded exactly as the training split
//! was. Runs that predate the persisted preprocessor are served by refitting
//! it from the run's own training CSV.

use serde_json::{Number, Value};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{ErrorCode, PipelineError, Result};
use crate::model::RandomForest;
use crate::schema::load_schema;
use crate::source::Document;
use crate::storage::{ArtifactStore, RunHandle, RunId, StorageError};
use crate::table::{from_records, read_csv};
use crate::training::load_model;
use crate::transform::{separate_target, Preprocessor, StepConfig};

/// Settings used only when a run has no persisted preprocessor
#[derive(Debug, Clone)]
pub struct RefitSettings<'a> {
    pub schema_path: &'a Path,
    pub steps: &'a StepConfig,
}

#[derive(Debug, Clone)]
pub struct Predictor {
    run_id: RunId,
    model: RandomForest,
    preprocessor: Preprocessor,
}

impl Predictor {
    /// Serve the newest run of the store that produced a model
    ///
    /// Runs that halted before training are passed over, so a failed run
    /// never hides the last good model.
    pub fn from_latest(store: &ArtifactStore, refit: &RefitSettings<'_>) -> Result<Self> {
        let run = store
            .latest_run_with(|run| run.paths().model().exists())
            .map_err(|e| match e {
                StorageError::NotFound(_) => StorageError::not_found(format!(
                    "no trained run found under artifact root {}",
                    store.root().display()
                )),
                other => other,
            })?;
        Self::load(&run, refit)
    }

    /// Serve a specific run
    pub fn for_run(store: &ArtifactStore, id: &str, refit: &RefitSettings<'_>) -> Result<Self> {
        let run = store.open_run(id)?;
        Self::load(&run, refit)
    }

    pub fn load(run: &RunHandle, refit: &RefitSettings<'_>) -> Result<Self> {
        let paths = run.paths();
        let model = load_model(&paths.model())?;

        let preprocessor = match Preprocessor::load(&paths.preprocessor()) {
            Ok(preprocessor) => preprocessor,
            Err(e) if e.is_not_found() => {
                warn!(
                    "Run {} has no persisted preprocessor; refitting from its training split",
                    run.id()
                );
                refit_preprocessor(run, refit)?
            }
            Err(e) => return Err(e),
        };

        if preprocessor.encoder.width() != model.n_features() {
            return Err(PipelineError::invalid_input_with_code(
                ErrorCode::DATA_SHAPE_MISMATCH,
                format!(
                    "preprocessor yields {} features but the model expects {}",
                    preprocessor.encoder.width(),
                    model.n_features()
                ),
                Some(run.id().to_string()),
            ));
        }

        info!("Loaded model of run {} ({} trees)", run.id(), model.n_trees());
        Ok(Self {
            run_id: run.id().clone(),
            model,
            preprocessor,
        })
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Predict one label per record
    ///
    /// Records are raw feature documents; a target field, if sent, is ignored.
    pub fn predict(&self, records: &[Document]) -> Result<Vec<f64>> {
        if records.is_empty() {
            return Err(PipelineError::invalid_input_with_code(
                ErrorCode::DATA_INVALID,
                "no records to predict",
                None,
            ));
        }
        let mut table = from_records(records)?;
        if table.drop_column(&self.preprocessor.target_column).is_some() {
            debug!("Ignoring target column in prediction input");
        }
        let encoded = self.preprocessor.transform(&table)?;
        self.model.predict(&encoded)
    }

    /// Predict from a JSON object or array of objects
    pub fn predict_value(&self, input: &Value) -> Result<Vec<Value>> {
        let records = records_from_value(input)?;
        Ok(self
            .predict(&records)?
            .into_iter()
            .map(label_to_json)
            .collect())
    }
}

/// Accept a single record object or an array of them
pub fn records_from_value(input: &Value) -> Result<Vec<Document>> {
    match input {
        Value::Object(record) => Ok(vec![record.clone()]),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                item.as_object().cloned().ok_or_else(|| {
                    PipelineError::invalid_input_with_code(
                        ErrorCode::DATA_INVALID,
                        format!("record {} is not a JSON object", idx),
                        None,
                    )
                })
            })
            .collect(),
        _ => Err(PipelineError::invalid_input_with_code(
            ErrorCode::DATA_INVALID,
            "expected a JSON object or an array of objects",
            None,
        )),
    }
}

/// Labels are emitted as integers when integral
pub fn label_to_json(label: f64) -> Value {
    if label.fract() == 0.0 && label.abs() < i64::MAX as f64 {
        Value::from(label as i64)
    } else {
        Number::from_f64(label).map_or(Value::Null, Value::Number)
    }
}

fn refit_preprocessor(run: &RunHandle, refit: &RefitSettings<'_>) -> Result<Preprocessor> {
    let schema = load_schema(refit.schema_path)?;
    let target = schema.target_column()?;
    let train = read_csv(&run.paths().train_csv())?;
    let (features, _) = separate_target(&train, target, "train")?;
    Preprocessor::fit(&features, &schema, refit.steps, target)
}
