//! `tabflow predict`

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::io::Read;
use std::path::Path;

use crate::app::{load_pipeline_config, AppConfig};
use crate::prediction::{Predictor, RefitSettings};
use crate::storage::ArtifactStore;

pub fn execute(app: &AppConfig, input: Option<&Path>, run: Option<&str>) -> Result<()> {
    let config = load_pipeline_config(app, false)?;
    let raw = match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read records from stdin")?;
            buffer
        }
    };
    let records: Value = serde_json::from_str(&raw).context("Input is not valid JSON")?;

    let store = ArtifactStore::new(config.artifact_root.clone());
    let refit = RefitSettings {
        schema_path: &config.schema_path,
        steps: &config.feature_steps,
    };
    let predictor = match run {
        Some(id) => Predictor::for_run(&store, id, &refit)?,
        None => Predictor::from_latest(&store, &refit)?,
    };
    let predictions = predictor.predict_value(&records)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "run_id": predictor.run_id(),
            "predictions": predictions,
        }))?
    );
    Ok(())
}
