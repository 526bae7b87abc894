//! CART classification tree
//!
//! Nodes live in a flat vector; children are referenced by index. Rows whose
//! feature value is `<= threshold` go left, everything else (NaN included)
//! goes right.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::params::Criterion;
use crate::array::Matrix;

/// Growth limits of a single tree
#[derive(Debug, Clone)]
pub struct TreeParams {
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Candidate features drawn per split
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Training samples per class that reached this leaf
        counts: Vec<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    n_classes: usize,
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Grow a tree on the given sample indices (repeats allowed)
    ///
    /// `y` holds class indices in `0..n_classes` for every row of `x`.
    pub fn fit(
        x: &Matrix,
        y: &[usize],
        n_classes: usize,
        samples: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = DecisionTree {
            n_classes,
            nodes: vec![Node::Leaf { counts: Vec::new() }],
        };
        let mut features: Vec<usize> = (0..x.cols()).collect();
        let mut pending = vec![(0usize, samples, 0usize)];

        while let Some((slot, samples, depth)) = pending.pop() {
            let counts = class_counts(y, &samples, n_classes);
            let impurity = params.criterion.impurity(&counts, samples.len());

            let may_split = samples.len() >= params.min_samples_split
                && params.max_depth.map_or(true, |max| depth < max)
                && impurity > f64::EPSILON;

            let split = if may_split {
                features.shuffle(rng);
                best_split(x, y, &samples, &counts, &features, params)
            } else {
                None
            };

            match split {
                Some(split) => {
                    let (left, right): (Vec<usize>, Vec<usize>) = samples
                        .iter()
                        .partition(|&&row| x.get(row, split.feature) <= split.threshold);
                    let left_slot = tree.push_placeholder();
                    let right_slot = tree.push_placeholder();
                    tree.nodes[slot] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left: left_slot,
                        right: right_slot,
                    };
                    pending.push((right_slot, right, depth + 1));
                    pending.push((left_slot, left, depth + 1));
                }
                None => tree.nodes[slot] = Node::Leaf { counts },
            }
        }

        tree
    }

    fn push_placeholder(&mut self) -> usize {
        self.nodes.push(Node::Leaf { counts: Vec::new() });
        self.nodes.len() - 1
    }

    /// Class distribution of the leaf a row falls into
    pub fn predict_proba_row(&self, row: &[f64]) -> Vec<f64> {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { counts } => {
                    let total: usize = counts.iter().sum();
                    if total == 0 {
                        return vec![0.0; self.n_classes];
                    }
                    return counts.iter().map(|&c| c as f64 / total as f64).collect();
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Longest root-to-leaf path, counted in edges
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Split { left, right, .. } => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
                Node::Leaf { .. } => max = max.max(depth),
            }
        }
        max
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Whether prediction over rows of `n_features` values is safe
    ///
    /// Children must sit after their parent inside the node vector, which
    /// rules out cycles, and split features must index into the row.
    pub(crate) fn is_well_formed(&self, n_features: usize) -> bool {
        let n = self.nodes.len();
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(idx, node)| match node {
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    *feature < n_features && *left > idx && *right > idx && *left < n && *right < n
                }
                Node::Leaf { counts } => counts.len() == self.n_classes,
            })
    }
}

fn class_counts(y: &[usize], samples: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &row in samples {
        counts[y[row]] += 1;
    }
    counts
}

/// Best threshold over the shuffled features
///
/// The first `max_features` features are always inspected; the search only
/// continues past them while no valid partition has been found.
fn best_split(
    x: &Matrix,
    y: &[usize],
    samples: &[usize],
    parent_counts: &[usize],
    features: &[usize],
    params: &TreeParams,
) -> Option<SplitCandidate> {
    let n = samples.len();
    let mut best: Option<SplitCandidate> = None;
    let mut order = samples.to_vec();

    for (visited, &feature) in features.iter().enumerate() {
        if visited >= params.max_features && best.is_some() {
            break;
        }

        order.sort_by(|&a, &b| x.get(a, feature).total_cmp(&x.get(b, feature)));
        let mut left = vec![0usize; parent_counts.len()];
        let mut right = parent_counts.to_vec();

        for i in 0..n - 1 {
            let class = y[order[i]];
            left[class] += 1;
            right[class] -= 1;

            let value = x.get(order[i], feature);
            let next = x.get(order[i + 1], feature);
            if value.is_nan() || next.is_nan() || next <= value {
                continue;
            }
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
                continue;
            }

            let impurity = (n_left as f64 * params.criterion.impurity(&left, n_left)
                + n_right as f64 * params.criterion.impurity(&right, n_right))
                / n as f64;
            if best.as_ref().map_or(true, |b| impurity < b.impurity - 1e-12) {
                let mut threshold = value + (next - value) / 2.0;
                if threshold >= next {
                    threshold = value;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params() -> TreeParams {
        TreeParams {
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 1,
        }
    }

    #[test]
    fn test_separable_data_is_fit_exactly() {
        let x = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![10.0], vec![11.0]]).unwrap();
        let y = vec![0, 0, 1, 1];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&x, &y, 2, (0..4).collect(), &params(), &mut rng);

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict_proba_row(&[1.5]), vec![1.0, 0.0]);
        assert_eq!(tree.predict_proba_row(&[20.0]), vec![0.0, 1.0]);
        assert!(tree.is_well_formed(1));
        assert!(!tree.is_well_formed(0));
    }

    #[test]
    fn test_xor_needs_zero_gain_first_split() {
        let x = Matrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ])
        .unwrap();
        let y = vec![0, 1, 1, 0];
        let mut rng = StdRng::seed_from_u64(3);
        let tree = DecisionTree::fit(&x, &y, 2, (0..4).collect(), &params(), &mut rng);

        for (row, class) in [(0, 0), (1, 1), (2, 1), (3, 0)] {
            let proba = tree.predict_proba_row(x.row(row));
            assert_eq!(proba[class], 1.0);
        }
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        let y = vec![0, 1, 0, 1];
        let mut rng = StdRng::seed_from_u64(0);
        let limited = TreeParams {
            max_depth: Some(1),
            ..params()
        };
        let tree = DecisionTree::fit(&x, &y, 2, (0..4).collect(), &limited, &mut rng);
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let y = vec![0, 1, 1];
        let mut rng = StdRng::seed_from_u64(0);
        let p = TreeParams {
            min_samples_leaf: 2,
            ..params()
        };
        let tree = DecisionTree::fit(&x, &y, 2, (0..3).collect(), &p, &mut rng);
        // Any split would leave a single-sample side
        assert_eq!(tree.n_nodes(), 1);
    }

    #[test]
    fn test_constant_features_give_single_leaf() {
        let x = Matrix::from_rows(&[vec![5.0], vec![5.0], vec![5.0]]).unwrap();
        let y = vec![0, 1, 1];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&x, &y, 2, (0..3).collect(), &params(), &mut rng);
        assert_eq!(tree.n_leaves(), 1);
        let proba = tree.predict_proba_row(&[5.0]);
        assert!((proba[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_nan_values_route_right() {
        let x = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![f64::NAN], vec![f64::NAN]]).unwrap();
        let y = vec![0, 0, 1, 1];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&x, &y, 2, (0..4).collect(), &params(), &mut rng);
        // Without a finite threshold next to NaN the tree cannot separate them
        assert!(tree.is_well_formed(1));
        assert_eq!(tree.predict_proba_row(&[1.0]).len(), 2);
    }

    #[test]
    fn test_backward_child_is_malformed() {
        let split = |left, right| Node::Split {
            feature: 0,
            threshold: 0.5,
            left,
            right,
        };
        let leaf = Node::Leaf { counts: vec![1, 0] };

        let forward = DecisionTree {
            n_classes: 2,
            nodes: vec![split(1, 2), leaf.clone(), leaf.clone()],
        };
        assert!(forward.is_well_formed(1));

        let cyclic = DecisionTree {
            n_classes: 2,
            nodes: vec![split(1, 2), split(0, 2), leaf.clone()],
        };
        assert!(!cyclic.is_well_formed(1));

        let self_loop = DecisionTree {
            n_classes: 2,
            nodes: vec![split(0, 1), leaf],
        };
        assert!(!self_loop.is_well_formed(1));
    }
}
