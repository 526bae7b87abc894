//! Canonical layout of a run directory
//!
//! ```text
//! <root>/<run_id>/
//!   dataingestion/raw/raw_data.csv
//!   dataingestion/split/train/train.csv
//!   dataingestion/split/test/test.csv
//!   data_validation/validation_report.yaml
//!   data_transformation/{train.npy,test.npy,preprocessor.json}
//!   model_trainer/random_forest_model.json
//!   model_evaluation/model_evaluation_report.yaml
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const RAW_DATA_FILE: &str = "raw_data.csv";
pub const TRAIN_CSV_FILE: &str = "train.csv";
pub const TEST_CSV_FILE: &str = "test.csv";
pub const VALIDATION_REPORT_FILE: &str = "validation_report.yaml";
pub const TRAIN_ARRAY_FILE: &str = "train.npy";
pub const TEST_ARRAY_FILE: &str = "test.npy";
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const MODEL_FILE: &str = "random_forest_model.json";
pub const EVALUATION_REPORT_FILE: &str = "model_evaluation_report.yaml";

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingestion,
    Validation,
    Transformation,
    Training,
    Evaluation,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Ingestion,
        Stage::Validation,
        Stage::Transformation,
        Stage::Training,
        Stage::Evaluation,
    ];

    /// Name of the stage's artifact-set directory inside a run
    pub fn dir_name(self) -> &'static str {
        match self {
            Stage::Ingestion => "dataingestion",
            Stage::Validation => "data_validation",
            Stage::Transformation => "data_transformation",
            Stage::Training => "model_trainer",
            Stage::Evaluation => "model_evaluation",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Ingestion => "ingestion",
            Stage::Validation => "validation",
            Stage::Transformation => "transformation",
            Stage::Training => "training",
            Stage::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every artifact path of one run; pure path arithmetic
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    run_dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(run_dir: PathBuf) -> Self {
        Self { run_dir }
    }

    fn stage(&self, stage: Stage) -> PathBuf {
        self.run_dir.join(stage.dir_name())
    }

    pub fn raw_data(&self) -> PathBuf {
        self.stage(Stage::Ingestion).join("raw").join(RAW_DATA_FILE)
    }

    pub fn train_csv(&self) -> PathBuf {
        self.stage(Stage::Ingestion)
            .join("split")
            .join("train")
            .join(TRAIN_CSV_FILE)
    }

    pub fn test_csv(&self) -> PathBuf {
        self.stage(Stage::Ingestion)
            .join("split")
            .join("test")
            .join(TEST_CSV_FILE)
    }

    pub fn validation_report(&self) -> PathBuf {
        self.stage(Stage::Validation).join(VALIDATION_REPORT_FILE)
    }

    pub fn train_array(&self) -> PathBuf {
        self.stage(Stage::Transformation).join(TRAIN_ARRAY_FILE)
    }

    pub fn test_array(&self) -> PathBuf {
        self.stage(Stage::Transformation).join(TEST_ARRAY_FILE)
    }

    pub fn preprocessor(&self) -> PathBuf {
        self.stage(Stage::Transformation).join(PREPROCESSOR_FILE)
    }

    pub fn model(&self) -> PathBuf {
        self.stage(Stage::Training).join(MODEL_FILE)
    }

    pub fn evaluation_report(&self) -> PathBuf {
        self.stage(Stage::Evaluation).join(EVALUATION_REPORT_FILE)
    }
}
