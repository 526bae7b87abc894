//! Feature transformation
//!
//! Turns the persisted train/test CSVs of a run into numeric arrays with the
//! target as the last column, and stores the fitted [`Preprocessor`] so the
//! same transformation can be replayed on live records.

pub mod encoder;
pub mod steps;

pub use encoder::{fit_encoder, ColumnScale, Encoder};
pub use steps::{
    align, categorical_levels, one_hot, Alignment, CategoryLevels, CustomSteps, RenameRule,
    StepConfig,
};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::array::{write_npy, Matrix};
use crate::error::{ErrorCode, PipelineError, Result};
use crate::schema::Schema;
use crate::storage::{self, RunHandle};
use crate::table::{read_csv, Table};

/// Everything needed to encode raw feature records the way training did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub target_column: String,
    pub steps: CustomSteps,
    /// Categorical levels seen in the training split
    pub levels: Vec<CategoryLevels>,
    /// Columns produced by the custom steps on the training split
    pub feature_columns: Vec<String>,
    pub encoder: Encoder,
}

impl Preprocessor {
    /// Fit on raw training features (target already removed)
    pub fn fit(
        train_features: &Table,
        schema: &Schema,
        step_config: &StepConfig,
        target_column: &str,
    ) -> Result<Self> {
        let steps = CustomSteps::new(step_config.clone(), schema.drop_columns.clone());
        let (engineered, levels) = steps.apply(train_features)?;
        let encoder = fit_encoder(&engineered, schema)?;
        Ok(Self {
            target_column: target_column.to_string(),
            steps,
            levels,
            feature_columns: engineered.column_names(),
            encoder,
        })
    }

    /// Encode raw feature records
    pub fn transform(&self, features: &Table) -> Result<Matrix> {
        let engineered = self.steps.apply_with_levels(features, &self.levels)?;
        let (aligned, alignment) = align(&engineered, &self.feature_columns)?;
        if !alignment.filled.is_empty() {
            warn!(
                "Input lacks {} expected column(s), filled with 0: {}",
                alignment.filled.len(),
                alignment.filled.join(", ")
            );
        }
        if !alignment.dropped.is_empty() {
            info!("Ignoring unexpected input column(s): {}", alignment.dropped.join(", "));
        }
        self.encoder.transform(&aligned)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        storage::write_json(path, self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::not_found(
                "preprocessor artifact not found",
                Some(path.to_path_buf()),
            ));
        }
        Ok(storage::read_json(path)?)
    }
}

/// Encoded splits of one run
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub train: Matrix,
    pub test: Matrix,
    pub preprocessor: Preprocessor,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub preprocessor_path: PathBuf,
}

/// Remove the target from a split, returning features and numeric labels
pub fn separate_target(table: &Table, target: &str, split: &str) -> Result<(Table, Vec<f64>)> {
    let mut features = table.clone();
    let column = features
        .drop_column(target)
        .ok_or_else(|| PipelineError::missing_target(target, split))?;
    let labels = column.to_f64().map_err(|_| {
        PipelineError::invalid_input_with_code(
            ErrorCode::DATA_NON_NUMERIC,
            format!("target column in {} split is not numeric", split),
            Some(target.to_string()),
        )
    })?;
    Ok((features, labels))
}

/// Encode a run's train and test splits and persist the arrays
pub fn transform_split(
    run: &RunHandle,
    schema: &Schema,
    step_config: &StepConfig,
) -> Result<TransformOutput> {
    let paths = run.paths();
    let target = schema.target_column()?;

    let train = read_csv(&paths.train_csv())?;
    let test = read_csv(&paths.test_csv())?;
    let (train_features, train_y) = separate_target(&train, target, "train")?;
    let (test_features, test_y) = separate_target(&test, target, "test")?;

    let preprocessor = Preprocessor::fit(&train_features, schema, step_config, target)?;
    let train_encoded = preprocessor.transform(&train_features)?.with_last_column(&train_y)?;
    let test_encoded = preprocessor.transform(&test_features)?.with_last_column(&test_y)?;

    let train_path = paths.train_array();
    let test_path = paths.test_array();
    let preprocessor_path = paths.preprocessor();
    write_npy(&train_path, &train_encoded)?;
    write_npy(&test_path, &test_encoded)?;
    preprocessor.save(&preprocessor_path)?;

    info!(
        "Transformed splits: train {}x{}, test {}x{}",
        train_encoded.rows(),
        train_encoded.cols(),
        test_encoded.rows(),
        test_encoded.cols()
    );

    Ok(TransformOutput {
        train: train_encoded,
        test: test_encoded,
        preprocessor,
        train_path,
        test_path,
        preprocessor_path,
    })
}
