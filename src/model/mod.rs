//! Random forest classifier
//!
//! CART trees and their bagged ensemble, serializable with serde so a fitted
//! model can be stored as a JSON artifact.

pub mod forest;
pub mod params;
pub mod tree;

pub use forest::RandomForest;
pub use params::{Criterion, Hyperparameters};
pub use tree::{DecisionTree, TreeParams};
