//! Bagged random forest classifier
//!
//! Each tree is grown on a bootstrap sample of the rows and draws
//! `floor(sqrt(n_features))` candidate features per split. Predictions
//! average the trees' leaf distributions. Tree seeds are derived from the
//! forest seed, so a fixed seed gives an identical forest.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::params::Hyperparameters;
use super::tree::{DecisionTree, TreeParams};
use crate::array::Matrix;
use crate::error::{ErrorCode, PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: Hyperparameters,
    /// Sorted distinct target values seen in training
    classes: Vec<f64>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit on a feature matrix and numeric class labels
    pub fn fit(x: &Matrix, y: &[f64], params: &Hyperparameters) -> Result<Self> {
        if x.rows() == 0 {
            return Err(PipelineError::invalid_input_with_code(
                ErrorCode::DATA_TOO_SMALL,
                "cannot fit a forest on zero rows",
                None,
            ));
        }
        if y.len() != x.rows() {
            return Err(PipelineError::invalid_input_with_code(
                ErrorCode::DATA_SHAPE_MISMATCH,
                format!("{} labels for {} rows", y.len(), x.rows()),
                None,
            ));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::invalid_input_with_code(
                ErrorCode::DATA_INVALID,
                "target contains missing or non-finite values",
                Some("target".to_string()),
            ));
        }
        if params.n_estimators == 0 {
            return Err(PipelineError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "n_estimators must be at least 1",
                Some("n_estimators".to_string()),
            ));
        }

        let mut classes = y.to_vec();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        let labels: Vec<usize> = y
            .iter()
            .map(|v| classes.partition_point(|c| c < v))
            .collect();

        let tree_params = TreeParams {
            criterion: params.criterion,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
            min_samples_leaf: params.min_samples_leaf.max(1),
            max_features: ((x.cols() as f64).sqrt().floor() as usize).max(1),
        };

        let n = x.rows();
        let mut master = StdRng::seed_from_u64(params.random_seed);
        let mut trees = Vec::with_capacity(params.n_estimators);
        for _ in 0..params.n_estimators {
            let mut rng = StdRng::seed_from_u64(master.random::<u64>());
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
            trees.push(DecisionTree::fit(
                x,
                &labels,
                classes.len(),
                bootstrap,
                &tree_params,
                &mut rng,
            ));
        }
        debug!(
            "Fitted {} trees on {} rows x {} features, {} classes",
            trees.len(),
            n,
            x.cols(),
            classes.len()
        );

        Ok(Self {
            params: params.clone(),
            classes,
            n_features: x.cols(),
            trees,
        })
    }

    /// Mean class distribution per row, columns ordered as [`Self::classes`]
    pub fn predict_proba(&self, x: &Matrix) -> Result<Vec<Vec<f64>>> {
        self.check_width(x)?;
        let n_trees = self.trees.len() as f64;
        Ok((0..x.rows())
            .map(|r| {
                let row = x.row(r);
                let mut sum = vec![0.0; self.classes.len()];
                for tree in &self.trees {
                    for (acc, p) in sum.iter_mut().zip(tree.predict_proba_row(row)) {
                        *acc += p;
                    }
                }
                sum.iter_mut().for_each(|p| *p /= n_trees);
                sum
            })
            .collect())
    }

    /// Most probable class label per row; ties go to the smaller label
    pub fn predict(&self, x: &Matrix) -> Result<Vec<f64>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|proba| {
                let best = proba
                    .iter()
                    .enumerate()
                    .fold(0, |best, (idx, p)| if *p > proba[best] { idx } else { best });
                self.classes[best]
            })
            .collect())
    }

    fn check_width(&self, x: &Matrix) -> Result<()> {
        if x.cols() != self.n_features {
            return Err(PipelineError::invalid_input_with_code(
                ErrorCode::DATA_SHAPE_MISMATCH,
                format!(
                    "model expects {} features, input has {}",
                    self.n_features,
                    x.cols()
                ),
                None,
            ));
        }
        Ok(())
    }

    /// Reject a deserialized model whose structure is inconsistent
    pub fn check_integrity(&self) -> Result<()> {
        if self.trees.is_empty() || self.classes.is_empty() {
            return Err(PipelineError::storage_with_code(
                ErrorCode::STORAGE_CORRUPTED,
                "model has no trees or no classes",
                None,
            ));
        }
        let n_classes = self.classes.len();
        let consistent = |tree: &DecisionTree| {
            tree.n_classes() == n_classes && tree.is_well_formed(self.n_features)
        };
        if !self.trees.iter().all(consistent) {
            return Err(PipelineError::storage_with_code(
                ErrorCode::STORAGE_CORRUPTED,
                "model contains a malformed tree",
                None,
            ));
        }
        Ok(())
    }

    pub fn params(&self) -> &Hyperparameters {
        &self.params
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
