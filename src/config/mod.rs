//! Pipeline configuration
//!
//! Values come from built-in defaults, then an optional YAML file, then the
//! environment (after `.env` has been loaded). See [`ConfigLoader`].

pub mod loader;


pub use loader::{ConfigLoader, DEFAULT_CONFIG_FILE};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ErrorCode, PipelineError, Result};
use crate::model::{Criterion, Hyperparameters};
use crate::storage::{RetentionPolicy, DEFAULT_ARTIFACT_ROOT};
use crate::transform::StepConfig;

/// Top-level configuration of one pipeline deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub source: SourceConfig,

    /// Fraction of rows held out for the test split
    #[serde(default = "default_split_ratio")]
    pub split_ratio: f64,

    /// Seed for the split shuffle and the forest; required
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,

    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,

    #[serde(default)]
    pub training: TrainingConfig,

    #[serde(default)]
    pub feature_steps: StepConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Where raw documents come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// `http(s)://` data API, `file://` directory, or a bare directory path
    #[serde(default)]
    pub connection_url: String,

    /// Extra PEM CA certificate trusted by the HTTP source
    #[serde(default)]
    pub tls_ca_file: Option<PathBuf>,

    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub collection: String,

    #[serde(with = "humantime_serde", default = "default_source_timeout")]
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            connection_url: String::new(),
            tls_ca_file: None,
            database: String::new(),
            collection: String::new(),
            timeout: default_source_timeout(),
        }
    }
}

/// Forest hyperparameters; the seed lives at the top level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    #[serde(default)]
    pub max_depth: Option<usize>,

    #[serde(default)]
    pub criterion: Criterion,

    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,

    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: None,
            criterion: Criterion::default(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
        }
    }
}

impl TrainingConfig {
    pub fn hyperparameters(&self, seed: u64) -> Hyperparameters {
        Hyperparameters {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            criterion: self.criterion,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            random_seed: seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Automatic retention applied after a successful run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default)]
    pub keep_last: Option<usize>,

    #[serde(with = "humantime_serde", default)]
    pub older_than: Option<Duration>,
}

impl RetentionConfig {
    pub fn is_enabled(&self) -> bool {
        self.keep_last.is_some()
    }

    pub fn policy(&self) -> Result<RetentionPolicy> {
        let older_than = self
            .older_than
            .map(|age| {
                chrono::Duration::from_std(age).map_err(|_| {
                    PipelineError::config_with_code(
                        ErrorCode::CONFIG_INVALID_VALUE,
                        "retention age out of range",
                        Some("retention.older_than".to_string()),
                    )
                })
            })
            .transpose()?;
        Ok(RetentionPolicy {
            keep_last: self.keep_last,
            older_than,
            dry_run: false,
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            split_ratio: default_split_ratio(),
            seed: None,
            artifact_root: default_artifact_root(),
            schema_path: default_schema_path(),
            training: TrainingConfig::default(),
            feature_steps: StepConfig::default(),
            server: ServerConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// The required seed
    pub fn seed(&self) -> Result<u64> {
        self.seed.ok_or_else(|| {
            PipelineError::config_with_code(
                ErrorCode::CONFIG_MISSING_REQUIRED,
                "a random seed is required (set `seed` or PIPELINE_SEED)",
                Some("seed".to_string()),
            )
        })
    }

    pub fn hyperparameters(&self) -> Result<Hyperparameters> {
        Ok(self.training.hyperparameters(self.seed()?))
    }

    /// Check everything a pipeline run depends on
    pub fn validate(&self) -> Result<()> {
        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            return Err(invalid(
                "split_ratio",
                format!("must be strictly between 0 and 1, got {}", self.split_ratio),
            ));
        }
        self.seed()?;
        if self.source.collection.trim().is_empty() {
            return Err(PipelineError::config_with_code(
                ErrorCode::CONFIG_MISSING_REQUIRED,
                "no collection configured (set source.collection or COLLECTION_NAME)",
                Some("source.collection".to_string()),
            ));
        }
        if self.training.n_estimators == 0 {
            return Err(invalid("training.n_estimators", "must be at least 1"));
        }
        if self.training.min_samples_split < 2 {
            return Err(invalid("training.min_samples_split", "must be at least 2"));
        }
        if self.training.min_samples_leaf < 1 {
            return Err(invalid("training.min_samples_leaf", "must be at least 1"));
        }
        if self.training.max_depth == Some(0) {
            return Err(invalid("training.max_depth", "must be at least 1 when set"));
        }
        Ok(())
    }

    /// Apply environment overrides through `lookup`
    pub fn merge_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CONNECTION_URL") {
            self.source.connection_url = url;
        }
        if let Some(ca) = lookup("TLS_CA_FILE") {
            self.source.tls_ca_file = Some(PathBuf::from(ca));
        }
        if let Some(db) = lookup("DB_NAME") {
            self.source.database = db;
        }
        if let Some(collection) = lookup("COLLECTION_NAME") {
            self.source.collection = collection;
        }
        if let Some(secs) = lookup("SOURCE_TIMEOUT_SECS") {
            self.source.timeout = Duration::from_secs(parse_env("SOURCE_TIMEOUT_SECS", &secs)?);
        }
        if let Some(ratio) = lookup("TRAIN_TEST_SPLIT_RATIO") {
            self.split_ratio = parse_env("TRAIN_TEST_SPLIT_RATIO", &ratio)?;
        }
        if let Some(seed) = lookup("PIPELINE_SEED") {
            self.seed = Some(parse_env("PIPELINE_SEED", &seed)?);
        }
        if let Some(root) = lookup("ARTIFACT_ROOT") {
            self.artifact_root = PathBuf::from(root);
        }
        if let Some(schema) = lookup("SCHEMA_PATH") {
            self.schema_path = PathBuf::from(schema);
        }
        if let Some(host) = lookup("APP_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("APP_PORT") {
            self.server.port = parse_env("APP_PORT", &port)?;
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.merge_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        PipelineError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("cannot parse {:?}", raw),
            Some(key.to_string()),
        )
    })
}

fn invalid(field: &str, message: impl Into<String>) -> PipelineError {
    PipelineError::config_with_code(
        ErrorCode::CONFIG_INVALID_VALUE,
        message,
        Some(field.to_string()),
    )
}

// Default value functions for serde
fn default_split_ratio() -> f64 {
    0.2
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACT_ROOT)
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("schema.yaml")
}

fn default_source_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_n_estimators() -> usize {
    100
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}
