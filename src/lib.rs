//! # tabflow
//!
//! A timestamped-run machine-learning pipeline for tabular data. Each run
//! ingests documents from a source, validates the splits against a schema,
//! encodes them, trains a random forest and evaluates it, writing every
//! artifact under `artifacts/<run_id>/`.
//!
//! ## Usage
//!
//! ```bash
//! tabflow run                      # one pipeline run
//! tabflow serve --port 5000        # /train, /predict, /health
//! tabflow predict -i records.json  # predict with the latest run
//! tabflow runs clean --keep-last 5
//! ```
//!
//! ## Modules
//!
//! - `pipeline` - Stage orchestration with halt-on-first-failure
//! - `ingestion`, `validation`, `transform`, `training`, `evaluation` - the five stages
//! - `storage` - Run identifiers, artifact layout and retention
//! - `source` - Document sources (HTTP data API, JSON export directory, in-memory)
//! - `schema` - Schema document parsing
//! - `table`, `array` - Tabular and dense numeric data with CSV / `.npy` persistence
//! - `model` - Decision trees and random forests
//! - `prediction` - Online prediction against a persisted run
//! - `server` - HTTP front end
//! - `config` - Layered pipeline configuration
pub mod app;
pub mod array;
pub mod cli;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod ingestion;
pub mod model;
pub mod pipeline;
pub mod prediction;
pub mod schema;
pub mod server;
pub mod source;
pub mod storage;
pub mod table;
pub mod training;
pub mod transform;
pub mod validation;

pub use error::{PipelineError, Result};
