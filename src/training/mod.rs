//! Model training on the encoded training array

use std::path::{Path, PathBuf};
use tracing::info;

use crate::array::{read_npy, Matrix};
use crate::error::{PipelineError, Result};
use crate::model::{Hyperparameters, RandomForest};
use crate::storage::{self, RunHandle};

/// Fit a forest on an encoded split whose last column is the target
pub fn fit(train_encoded: &Matrix, params: &Hyperparameters) -> Result<RandomForest> {
    let (features, target) = train_encoded.split_last_column()?;
    info!(
        "Training random forest: {} trees, criterion {}, seed {}, on {} rows x {} features",
        params.n_estimators,
        params.criterion,
        params.random_seed,
        features.rows(),
        features.cols()
    );
    RandomForest::fit(&features, &target, params)
}

/// Persist a fitted model in the run's training artifact set
pub fn save(run: &RunHandle, model: &RandomForest) -> Result<PathBuf> {
    let path = run.paths().model();
    storage::write_json(&path, model)?;
    info!("Model saved at {}", path.display());
    Ok(path)
}

/// Load and sanity-check a persisted model
pub fn load_model(path: &Path) -> Result<RandomForest> {
    if !path.exists() {
        return Err(PipelineError::not_found(
            "model artifact not found",
            Some(path.to_path_buf()),
        ));
    }
    let model: RandomForest = storage::read_json(path)?;
    model
        .check_integrity()
        .map_err(|e| e.with_context(path.display()))?;
    Ok(model)
}

/// Read the run's training array, fit, and save
pub fn train_run(run: &RunHandle, params: &Hyperparameters) -> Result<(RandomForest, PathBuf)> {
    let train = read_npy(&run.paths().train_array())?;
    let model = fit(&train, params)?;
    let path = save(run, &model)?;
    Ok((model, path))
}
