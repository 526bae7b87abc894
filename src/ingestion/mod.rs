//! Raw data ingestion
//!
//! Pulls every document of a collection, writes the raw table and a seeded
//! train/test split under the run's `dataingestion` artifact set.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{ErrorCode, PipelineError, Result};
use crate::pipeline::run_blocking;
use crate::source::DocumentSource;
use crate::storage::RunHandle;
use crate::table::{from_records, write_csv, Table};

/// Row counts and paths written by ingestion
#[derive(Debug, Clone, Serialize)]
pub struct IngestionOutput {
    pub raw_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub raw_path: PathBuf,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
}

/// Fetch a whole collection as a table
pub async fn fetch_raw(source: &dyn DocumentSource, collection: &str) -> Result<Table> {
    debug!("Fetching collection {} from {}", collection, source.describe());
    let documents = source.fetch(collection).await?;
    let table = from_records(&documents)?;
    info!(
        "Fetched {} rows x {} columns from collection {}",
        table.n_rows(),
        table.n_cols(),
        collection
    );
    Ok(table)
}

/// Number of test rows for `n` rows at `ratio`: `ceil(ratio * n)`
pub fn test_size(n: usize, ratio: f64) -> usize {
    // Guard against products like 0.2 * 100 = 20.000000000000004
    let raw = ratio * n as f64;
    (raw - 1e-9).ceil().max(0.0) as usize
}

/// Seeded shuffle, then the first `ceil(ratio * n)` rows become the test split
pub fn split(table: &Table, ratio: f64, seed: u64) -> Result<(Table, Table)> {
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(PipelineError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("split ratio must be strictly between 0 and 1, got {}", ratio),
            Some("split_ratio".to_string()),
        ));
    }

    let n = table.n_rows();
    let n_test = test_size(n, ratio);
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(PipelineError::invalid_input_with_code(
            ErrorCode::DATA_TOO_SMALL,
            format!(
                "{} row(s) cannot be split at ratio {} into non-empty train and test sets",
                n, ratio
            ),
            None,
        ));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let test = table.take_rows(&order[..n_test]);
    let train = table.take_rows(&order[n_test..]);
    Ok((train, test))
}

/// Write raw, train and test CSVs under the run
pub fn persist(run: &RunHandle, raw: &Table, train: &Table, test: &Table) -> Result<IngestionOutput> {
    let paths = run.paths();
    let output = IngestionOutput {
        raw_rows: raw.n_rows(),
        train_rows: train.n_rows(),
        test_rows: test.n_rows(),
        raw_path: paths.raw_data(),
        train_path: paths.train_csv(),
        test_path: paths.test_csv(),
    };
    write_csv(&output.raw_path, raw)?;
    write_csv(&output.train_path, train)?;
    write_csv(&output.test_path, test)?;
    info!(
        "Saved raw ({} rows), train ({} rows) and test ({} rows) to {}",
        output.raw_rows,
        output.train_rows,
        output.test_rows,
        run.dir().display()
    );
    Ok(output)
}

/// Fetch, split and persist in one go
///
/// The split and the CSV writes run on the blocking pool.
pub async fn ingest(
    source: &dyn DocumentSource,
    collection: &str,
    run: &RunHandle,
    ratio: f64,
    seed: u64,
) -> Result<IngestionOutput> {
    let raw = fetch_raw(source, collection).await?;
    let run = run.clone();
    run_blocking(move || {
        let (train, test) = split(&raw, ratio, seed)?;
        persist(&run, &raw, &train, &test)
    })
    .await
}
