//! Configuration builder for random forest training.

use crate::error::ForestError;
use crate::result::RandomForestResult;
use crate::split::{SplitCriterion, SplitMethod};

/// Number of features each split considers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// `ceil(sqrt(n_features))`.
    Sqrt,
    /// `ceil(log2(n_features))`, at least 1.
    Log2,
    /// `ceil(n_features * f)` for `f` in (0, 1].
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// Every feature.
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete count for `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMaxFeatures`] when the count falls outside `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> Result<usize, ForestError> {
        let n = n_features as f64;
        let resolved = match self {
            MaxFeatures::Sqrt => n.sqrt().ceil() as usize,
            MaxFeatures::Log2 => n.log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) => (n * f).ceil() as usize,
            MaxFeatures::Fixed(count) => count,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Whether to score the forest on its out-of-bag samples after training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobMode {
    /// Compute OOB accuracy and confusion matrix.
    Enabled,
    /// Skip OOB evaluation.
    Disabled,
}

/// Configuration for random forest training.
///
/// # Defaults
///
/// | Parameter            | Default     |
/// |----------------------|-------------|
/// | `max_features`       | `Sqrt`      |
/// | `max_depth`          | `None`      |
/// | `min_samples_split`  | 2           |
/// | `min_samples_leaf`   | 1           |
/// | `criterion`          | `Gini`      |
/// | `split_method`       | `Exact`     |
/// | `n_classes`          | `None`      |
/// | `seed`               | 42          |
/// | `oob_mode`           | `Disabled`  |
/// | `bootstrap_fraction` | 1.0         |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) split_method: SplitMethod,
    pub(crate) n_classes: Option<usize>,
    pub(crate) seed: u64,
    pub(crate) oob_mode: OobMode,
    pub(crate) bootstrap_fraction: f64,
}

impl RandomForestConfig {
    /// Create a config for an ensemble of `n_trees` trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            split_method: SplitMethod::Exact,
            n_classes: None,
            seed: 42,
            oob_mode: OobMode::Disabled,
            bootstrap_fraction: 1.0,
        })
    }

    /// Set the per-split feature subsampling strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples in each child of a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the threshold search strategy.
    #[must_use]
    pub fn with_split_method(mut self, split_method: SplitMethod) -> Self {
        self.split_method = split_method;
        self
    }

    /// Fix the class count instead of deriving it from the training labels.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: Option<usize>) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Set the master random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the OOB evaluation mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Set the share of samples drawn (with replacement) for each tree.
    #[must_use]
    pub fn with_bootstrap_fraction(mut self, bootstrap_fraction: f64) -> Self {
        self.bootstrap_fraction = bootstrap_fraction;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the threshold search strategy.
    #[must_use]
    pub fn split_method(&self) -> SplitMethod {
        self.split_method
    }

    /// Return the master random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a forest.
    ///
    /// `features[sample][feature]` is row-major; `labels[sample]` is a zero-based class.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                                         |
    /// |--------------------------------------------|----------------------------------------------|
    /// | [`ForestError::EmptyDataset`]              | `features` is empty                          |
    /// | [`ForestError::ZeroFeatures`]              | rows have no columns                         |
    /// | [`ForestError::LabelCountMismatch`]        | row and label counts differ                  |
    /// | [`ForestError::FeatureCountMismatch`]      | rows have inconsistent widths                |
    /// | [`ForestError::NonFiniteValue`]            | any value is NaN or infinite                 |
    /// | [`ForestError::LabelOutOfRange`]           | a label is `>= n_classes`                    |
    /// | [`ForestError::InvalidMaxFeatures`]        | `max_features` resolves outside the columns  |
    /// | [`ForestError::InvalidBootstrapFraction`]  | fraction outside (0, 1]                      |
    /// | [`ForestError::OobEvaluationFailed`]       | OOB enabled but no sample was ever out of bag |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<RandomForestResult, ForestError> {
        crate::forest::train(self, features, labels, feature_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_thirteen_features() {
        assert_eq!(MaxFeatures::Sqrt.resolve(13).unwrap(), 4);
        assert_eq!(MaxFeatures::Log2.resolve(13).unwrap(), 4);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(13).unwrap(), 7);
        assert_eq!(MaxFeatures::All.resolve(13).unwrap(), 13);
        assert_eq!(MaxFeatures::Log2.resolve(1).unwrap(), 1);
    }

    #[test]
    fn resolve_rejects_out_of_range() {
        assert!(MaxFeatures::Fixed(0).resolve(13).is_err());
        assert!(MaxFeatures::Fixed(14).resolve(13).is_err());
        assert!(MaxFeatures::Fraction(0.0).resolve(13).is_err());
    }

    #[test]
    fn zero_trees_rejected() {
        assert!(matches!(
            RandomForestConfig::new(0).unwrap_err(),
            ForestError::InvalidTreeCount { n_trees: 0 }
        ));
    }
}
