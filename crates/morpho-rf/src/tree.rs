use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::ForestError;
use crate::dataset::{self, TrainingShape};
use crate::node::{Impurity, Node, NodeIndex};
use crate::split::{SplitCriterion, SplitMethod, SplitSearch};

/// Configuration for a single CART decision tree.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `split_method`      | `Exact`               |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `n_classes`         | `None` (from labels)  |
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) split_method: SplitMethod,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) n_classes: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a config with the defaults listed above.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            split_method: SplitMethod::Exact,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_classes: None,
            seed: 42,
        }
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

    /// Limit the depth of the tree; the root is depth 0.
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

    /// Set how many randomly chosen features each split considers.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Fix the number of classes instead of deriving it from the labels.
    ///
    /// Needed when a training subset may lack the highest class but leaf
    /// distributions must still cover every class.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: Option<usize>) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Train a tree on row-major `features` and zero-based `labels`.
    ///
    /// # Errors
    ///
    /// | Variant                                  | When                                         |
    /// |------------------------------------------|----------------------------------------------|
    /// | [`ForestError::EmptyDataset`]            | `features` is empty                          |
    /// | [`ForestError::ZeroFeatures`]            | rows have no columns                         |
    /// | [`ForestError::LabelCountMismatch`]      | row and label counts differ                  |
    /// | [`ForestError::FeatureCountMismatch`]    | rows have inconsistent widths                |
    /// | [`ForestError::NonFiniteValue`]          | any value is NaN or infinite                 |
    /// | [`ForestError::LabelOutOfRange`]         | a label is `>= n_classes`                    |
    /// | [`ForestError::InvalidMaxDepth`]         | `max_depth` is `Some(0)`                     |
    /// | [`ForestError::InvalidMinSamplesSplit`]  | `min_samples_split < 2`                      |
    /// | [`ForestError::InvalidMinSamplesLeaf`]   | `min_samples_leaf < 1`                       |
    /// | [`ForestError::InvalidMaxFeatures`]      | `max_features` outside `[1, n_features]`     |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, ForestError> {
        let shape = dataset::validate(features, labels, self.n_classes)?;
        self.validate_params(shape.n_features)?;

        let columns = dataset::to_columns(features, shape.n_features);
        let sample_indices: Vec<usize> = (0..shape.n_samples).collect();
        Ok(self.grow(&columns, labels, &sample_indices, shape))
    }

    pub(crate) fn validate_params(&self, n_features: usize) -> Result<usize, ForestError> {
        if self.max_depth == Some(0) {
            return Err(ForestError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(ForestError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(ForestError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(max_features)
    }

    /// Grow a tree over `sample_indices`, which may repeat (bootstrap draws).
    ///
    /// Inputs must already be validated.
    pub(crate) fn grow(
        &self,
        columns: &[Vec<f64>],
        labels: &[usize],
        sample_indices: &[usize],
        shape: TrainingShape,
    ) -> DecisionTree {
        let search = SplitSearch {
            columns,
            labels,
            n_classes: shape.n_classes,
            criterion: self.criterion,
            method: self.split_method,
            max_features: self.max_features.unwrap_or(shape.n_features),
            min_samples_leaf: self.min_samples_leaf,
        };
        let mut builder = TreeBuilder {
            config: self,
            search,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        builder.build(sample_indices, 0);

        debug!(n_nodes = builder.arena.len(), "decision tree built");

        DecisionTree {
            nodes: builder.arena,
            n_features: shape.n_features,
            n_classes: shape.n_classes,
        }
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct TreeBuilder<'a> {
    config: &'a DecisionTreeConfig,
    search: SplitSearch<'a>,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let n_samples = sample_indices.len();
        let mut class_counts = vec![0usize; self.search.n_classes];
        for &si in sample_indices {
            class_counts[self.search.labels[si]] += 1;
        }
        let impurity = self.config.criterion.impurity(&class_counts, n_samples);

        let depth_reached = self.config.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || impurity.is_pure() || n_samples < self.config.min_samples_split {
            return self.push_leaf(&class_counts, impurity, n_samples);
        }
        let Some(split) = self.search.find(sample_indices, &mut self.rng) else {
            return self.push_leaf(&class_counts, impurity, n_samples);
        };

        // Reserve the slot so the root stays at index 0; overwritten below.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction: 0,
            distribution: Vec::new(),
            impurity,
            n_samples,
        });
        let left = self.build(&split.left_indices, depth + 1);
        let right = self.build(&split.right_indices, depth + 1);
        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            impurity_decrease: split.impurity_decrease,
        };
        NodeIndex::new(node_idx)
    }

    fn push_leaf(&mut self, class_counts: &[usize], impurity: Impurity, n_samples: usize) -> NodeIndex {
        let total = n_samples.max(1) as f64;
        let distribution = class_counts.iter().map(|&c| c as f64 / total).collect();
        // Ties go to the lowest class index.
        let prediction = class_counts
            .iter()
            .enumerate()
            .fold((0, 0), |best, (class, &count)| if count > best.1 { (class, count) } else { best })
            .0;
        self.arena.push(Node::Leaf {
            prediction,
            distribution,
            impurity,
            n_samples,
        });
        NodeIndex::new(self.arena.len() - 1)
    }
}

/// A fitted CART decision tree stored as a node arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the class of a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when the sample width is wrong.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        match self.leaf(sample)? {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            Node::Split { .. } => unreachable!("traversal ends at a leaf"),
        }
    }

    /// Return the class distribution of the leaf a sample falls into.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when the sample width is wrong.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<&[f64], ForestError> {
        match self.leaf(sample)? {
            Node::Leaf { distribution, .. } => Ok(distribution),
            Node::Split { .. } => unreachable!("traversal ends at a leaf"),
        }
    }

    /// Mean decrease in impurity per feature, normalized to sum to 1.
    ///
    /// All zeros for a single-leaf tree.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split { feature, impurity_decrease, .. } = node {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the number of classes the leaf distributions cover.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the longest root-to-leaf path length; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut queue = VecDeque::from([(0usize, 0usize)]);
        while let Some((idx, d)) = queue.pop_front() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    fn leaf(&self, sample: &[f64]) -> Result<&Node, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut node = &self.nodes[0];
        while let Node::Split { feature, threshold, left, right, .. } = node {
            let next = if sample[feature.index()] <= *threshold { left } else { right };
            node = &self.nodes[next.index()];
        }
        Ok(node)
    }
}
