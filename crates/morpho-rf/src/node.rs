use std::fmt;

use serde::{Deserialize, Serialize};

/// Zero-based feature column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a node inside a tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the arena position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Impurity of a node under the tree's split criterion.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    pub(crate) fn is_pure(self) -> bool {
        self.0 <= 0.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Children are referenced by [`NodeIndex`]; the root is always at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    /// Interior node: samples with `x[feature] <= threshold` go left.
    Split {
        /// Column tested at this node.
        feature: FeatureIndex,
        /// Split point.
        threshold: f64,
        /// Left child.
        left: NodeIndex,
        /// Right child.
        right: NodeIndex,
        /// Impurity before splitting.
        impurity: Impurity,
        /// Training samples that reached this node.
        n_samples: usize,
        /// Weighted impurity decrease, accumulated into MDI importances.
        impurity_decrease: f64,
    },
    /// Terminal node holding the class distribution of its samples.
    Leaf {
        /// Majority class.
        prediction: usize,
        /// Class frequencies, summing to 1.
        distribution: Vec<f64>,
        /// Impurity of the leaf.
        impurity: Impurity,
        /// Training samples in the leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Return the impurity at this node.
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` for leaves.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impurity_display_has_six_decimals() {
        assert_eq!(Impurity::new(0.5).to_string(), "0.500000");
    }

    #[test]
    fn zero_impurity_is_pure() {
        assert!(Impurity::new(0.0).is_pure());
        assert!(!Impurity::new(0.1).is_pure());
    }

    #[test]
    fn accessors_cover_both_variants() {
        let leaf = Node::Leaf {
            prediction: 2,
            distribution: vec![0.0, 0.25, 0.75],
            impurity: Impurity::new(0.375),
            n_samples: 8,
        };
        let split = Node::Split {
            feature: FeatureIndex::new(4),
            threshold: 0.61,
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            impurity: Impurity::new(0.66),
            n_samples: 30,
            impurity_decrease: 4.2,
        };
        assert!(leaf.is_leaf());
        assert!(!split.is_leaf());
        assert_eq!(leaf.n_samples(), 8);
        assert_eq!(split.n_samples(), 30);
        assert!((split.impurity().value() - 0.66).abs() < f64::EPSILON);
    }
}
