//! Model evaluation on the encoded test array

pub mod metrics;

pub use metrics::{classification_report, compute, AverageMetrics, ClassMetrics, Metrics};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::array::{read_npy, Matrix};
use crate::error::Result;
use crate::model::RandomForest;
use crate::storage::{self, RunHandle, RunId};
use crate::training;

/// Predictions and scores for one test array
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub y_true: Vec<f64>,
    pub y_pred: Vec<f64>,
    pub metrics: Metrics,
}

/// Persisted evaluation document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub run_id: RunId,
    pub accuracy: f64,
    pub precision: f64,
    pub per_class: Vec<ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub classification_report: String,
    pub model_path: PathBuf,
    pub test_array_path: PathBuf,
}

/// Score a model on an encoded split whose last column is the target
pub fn evaluate(model: &RandomForest, test_encoded: &Matrix) -> Result<Evaluation> {
    let (features, y_true) = test_encoded.split_last_column()?;
    let y_pred = model.predict(&features)?;
    let metrics = compute(&y_true, &y_pred)?;
    Ok(Evaluation {
        y_true,
        y_pred,
        metrics,
    })
}

/// Write the report in the run's evaluation artifact set
pub fn save(run: &RunHandle, report: &EvaluationReport) -> Result<PathBuf> {
    let path = run.paths().evaluation_report();
    storage::write_yaml(&path, report)?;
    info!("Evaluation report saved at {}", path.display());
    Ok(path)
}

/// Load the run's model and test array, evaluate, and save the report
pub fn evaluate_run(run: &RunHandle) -> Result<(EvaluationReport, PathBuf)> {
    let paths = run.paths();
    let model_path = paths.model();
    let test_array_path = paths.test_array();

    let model = training::load_model(&model_path)?;
    let test = read_npy(&test_array_path)?;
    let evaluation = evaluate(&model, &test)?;
    let metrics = evaluation.metrics;

    let text = classification_report(&metrics);
    info!("Accuracy: {:.4}", metrics.accuracy);
    info!("Precision: {:.4}", metrics.precision);
    info!("Classification report:\n{}", text);

    let report = EvaluationReport {
        run_id: run.id().clone(),
        accuracy: metrics.accuracy,
        precision: metrics.precision,
        per_class: metrics.per_class,
        macro_avg: metrics.macro_avg,
        weighted_avg: metrics.weighted_avg,
        classification_report: text,
        model_path,
        test_array_path,
    };
    let path = save(run, &report)?;
    Ok((report, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::write_npy;
    use crate::model::Hyperparameters;
    use crate::storage::ArtifactStore;
    use tempfile::TempDir;

    #[test]
    fn test_evaluate_recovers_target_from_last_column() {
        let train = Matrix::from_rows(&[vec![0.0, 0.0], vec![1.0, 1.0], vec![0.1, 0.0], vec![0.9, 1.0]]).unwrap();
        let (x, y) = train.split_last_column().unwrap();
        let model = RandomForest::fit(&x, &y, &Hyperparameters { n_estimators: 3, ..Hyperparameters::with_seed(0) }).unwrap();

        let test = Matrix::from_rows(&[vec![0.2, 1.0], vec![0.8, 0.0], vec![0.5, 1.0]]).unwrap();
        let evaluation = evaluate(&model, &test).unwrap();
        assert_eq!(evaluation.y_true, vec![1.0, 0.0, 1.0]);
        assert_eq!(evaluation.y_pred.len(), 3);
        assert!((0.0..=1.0).contains(&evaluation.metrics.accuracy));
    }

    #[test]
    fn test_evaluate_run_writes_report_with_provenance() {
        let temp = TempDir::new().unwrap();
        let run = ArtifactStore::new(temp.path()).create_run().unwrap();
        let data = Matrix::from_rows(&[vec![0.0, 0.0], vec![1.0, 1.0], vec![0.1, 0.0], vec![0.9, 1.0]]).unwrap();
        write_npy(&run.paths().train_array(), &data).unwrap();
        write_npy(&run.paths().test_array(), &data).unwrap();
        training::train_run(&run, &Hyperparameters { n_estimators: 3, ..Hyperparameters::with_seed(1) }).unwrap();

        let (report, path) = evaluate_run(&run).unwrap();
        assert_eq!(&report.run_id, run.id());
        assert_eq!(report.model_path, run.paths().model());
        assert_eq!(report.test_array_path, run.paths().test_array());

        let back: EvaluationReport = storage::read_yaml(&path).unwrap();
        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.per_class.len(), report.per_class.len());
        assert!(back.classification_report.contains("accuracy"));
    }

    #[test]
    fn test_evaluate_run_without_model() {
        let temp = TempDir::new().unwrap();
        let run = ArtifactStore::new(temp.path()).create_run().unwrap();
        assert!(evaluate_run(&run).unwrap_err().is_not_found());
    }
}
