//! Forest hyperparameters

use serde::{Deserialize, Serialize};
use std::fmt;

/// Split quality measure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    #[default]
    Gini,
    Entropy,
}

impl Criterion {
    /// Impurity of a node given per-class counts
    pub fn impurity(self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        match self {
            Criterion::Gini => {
                1.0 - counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum::<f64>()
            }
            Criterion::Entropy => counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    -p * p.log2()
                })
                .sum(),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Gini => f.write_str("gini"),
            Criterion::Entropy => f.write_str("entropy"),
        }
    }
}

/// Hyperparameters of a random forest; the seed has no default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub criterion: Criterion,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_seed: u64,
}

impl Hyperparameters {
    /// Library defaults around a caller-supplied seed
    pub fn with_seed(random_seed: u64) -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            criterion: Criterion::Gini,
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impurity_of_pure_and_balanced_nodes() {
        assert_eq!(Criterion::Gini.impurity(&[4, 0], 4), 0.0);
        assert_eq!(Criterion::Entropy.impurity(&[4, 0], 4), 0.0);
        assert!((Criterion::Gini.impurity(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert!((Criterion::Entropy.impurity(&[2, 2], 4) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_criterion_serde_names() {
        assert_eq!(serde_json::to_string(&Criterion::Entropy).unwrap(), "\"entropy\"");
        let c: Criterion = serde_yaml::from_str("gini").unwrap();
        assert_eq!(c, Criterion::Gini);
    }
}
