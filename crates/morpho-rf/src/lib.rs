//! Random forest classification for galaxy morphology: train, cross-validate, predict.
//!
//! Provides a CART-based random forest with Gini/Entropy split criteria,
//! exact and extremely-randomized split search, parallel training via rayon,
//! out-of-bag evaluation, stratified k-fold cross-validated prediction,
//! confusion matrices, feature importance and model serialization.

mod config;
mod confusion;
mod dataset;
mod error;
mod eval;
mod forest;
mod importance;
mod metrics;
mod node;
mod oob;
mod predict;
mod result;
mod serialize;
mod split;
mod tree;

pub use config::{MaxFeatures, OobMode, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::ForestError;
pub use eval::{CrossValidation, CrossValidationResult, FoldStrategy, holdout_split};
pub use forest::RandomForest;
pub use importance::RankedFeature;
pub use metrics::accuracy;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use oob::OobScore;
pub use predict::ClassDistribution;
pub use result::{RandomForestResult, TrainingMetadata};
pub use split::{SplitCriterion, SplitMethod};
pub use tree::{DecisionTree, DecisionTreeConfig};
