//! Shared fixtures for integration tests
#![allow(dead_code)]

use anyhow::Result;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tabflow::config::PipelineConfig;
use tabflow::source::Document;
use tempfile::TempDir;

pub const COLLECTION: &str = "insurance";

/// Schema matching [`insurance_documents`]
pub const SCHEMA: &str = r#"
columns:
  - Gender: object
  - Age: int
  - Vehicle_Age: object
  - Vehicle_Damage: object
  - Annual_Premium: float
  - Response: int
numerical_columns:
  - Age
  - Annual_Premium
categorical_columns:
  - Gender
  - Vehicle_Age
  - Vehicle_Damage
num_features:
  - Age
mm_columns:
  - Annual_Premium
target_column: Response
"#;

/// Ten insurance cross-sell records with a store-internal `_id`
pub fn insurance_documents() -> Vec<Document> {
    let rows = json!([
        {"_id": "a1", "Gender": "Male", "Age": 44, "Vehicle_Age": "> 2 Years", "Vehicle_Damage": "Yes", "Annual_Premium": 40454.0, "Response": 1},
        {"_id": "a2", "Gender": "Male", "Age": 76, "Vehicle_Age": "1-2 Year", "Vehicle_Damage": "No", "Annual_Premium": 33536.0, "Response": 0},
        {"_id": "a3", "Gender": "Female", "Age": 47, "Vehicle_Age": "> 2 Years", "Vehicle_Damage": "Yes", "Annual_Premium": 38294.0, "Response": 1},
        {"_id": "a4", "Gender": "Male", "Age": 21, "Vehicle_Age": "< 1 Year", "Vehicle_Damage": "No", "Annual_Premium": 28619.0, "Response": 0},
        {"_id": "a5", "Gender": "Female", "Age": 29, "Vehicle_Age": "< 1 Year", "Vehicle_Damage": "No", "Annual_Premium": 27496.0, "Response": 0},
        {"_id": "a6", "Gender": "Female", "Age": 24, "Vehicle_Age": "< 1 Year", "Vehicle_Damage": "Yes", "Annual_Premium": 2630.0, "Response": 0},
        {"_id": "a7", "Gender": "Male", "Age": 23, "Vehicle_Age": "< 1 Year", "Vehicle_Damage": "Yes", "Annual_Premium": 23367.0, "Response": 0},
        {"_id": "a8", "Gender": "Female", "Age": 56, "Vehicle_Age": "1-2 Year", "Vehicle_Damage": "Yes", "Annual_Premium": 32031.0, "Response": 1},
        {"_id": "a9", "Gender": "Female", "Age": 24, "Vehicle_Age": "< 1 Year", "Vehicle_Damage": "No", "Annual_Premium": 27619.0, "Response": 0},
        {"_id": "a10", "Gender": "Male", "Age": 32, "Vehicle_Age": "1-2 Year", "Vehicle_Damage": "Yes", "Annual_Premium": 28771.0, "Response": 1}
    ]);
    as_documents(rows)
}

pub fn as_documents(value: Value) -> Vec<Document> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
        .unwrap_or_default()
}

/// Builder for an isolated pipeline workspace
pub struct PipelineFixtureBuilder {
    temp_dir: TempDir,
    schema: String,
    documents: Vec<Document>,
    n_estimators: usize,
    seed: u64,
}

impl PipelineFixtureBuilder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
            schema: SCHEMA.to_string(),
            documents: insurance_documents(),
            n_estimators: 5,
            seed: 42,
        })
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_documents(mut self, documents: Vec<Document>) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Write the schema and a JSON export directory, and build a config
    /// whose source points at that directory
    pub fn build(self) -> Result<PipelineFixture> {
        let root = self.temp_dir.path().to_path_buf();
        let export_dir = root.join("export");
        fs::create_dir_all(&export_dir)?;
        fs::write(
            export_dir.join(format!("{}.json", COLLECTION)),
            serde_json::to_string_pretty(&self.documents)?,
        )?;
        let schema_path = root.join("schema.yaml");
        fs::write(&schema_path, &self.schema)?;

        let mut config = PipelineConfig::default();
        config.source.connection_url = format!("file://{}", export_dir.display());
        config.source.collection = COLLECTION.to_string();
        config.seed = Some(self.seed);
        config.split_ratio = 0.3;
        config.artifact_root = root.join("artifacts");
        config.schema_path = schema_path;
        config.training.n_estimators = self.n_estimators;

        Ok(PipelineFixture {
            temp_dir: self.temp_dir,
            config,
        })
    }
}

pub struct PipelineFixture {
    temp_dir: TempDir,
    pub config: PipelineConfig,
}

impl PipelineFixture {
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }
}
