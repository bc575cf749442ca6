//! Split criteria and best-split search for CART nodes.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute node impurity from class counts. An empty node is pure.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let probabilities = class_counts.iter().filter(|&&c| c > 0).map(|&c| c as f64 / n);
        let value = match self {
            SplitCriterion::Gini => 1.0 - probabilities.map(|p| p * p).sum::<f64>(),
            SplitCriterion::Entropy => -probabilities.map(|p| p * p.ln()).sum::<f64>(),
        };
        Impurity::new(value)
    }
}

/// How candidate thresholds are generated for a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitMethod {
    /// Sort the node's values and test every midpoint between distinct neighbours.
    Exact,
    /// Draw one uniform threshold between the node's min and max (extremely randomized trees).
    ExtraTrees,
}

/// The winning split of a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// `n·I(parent) - n_l·I(left) - n_r·I(right)`, the MDI contribution.
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Inputs shared by every split search in one tree.
///
/// `columns` is column-major: `columns[feature][sample]`.
pub(crate) struct SplitSearch<'a> {
    pub(crate) columns: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) n_classes: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) method: SplitMethod,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

impl SplitSearch<'_> {
    /// Find the best split of `sample_indices` over a random subset of
    /// `max_features` columns.
    ///
    /// Returns `None` when no candidate separates the samples while keeping
    /// `min_samples_leaf` on both sides.
    pub(crate) fn find(&self, sample_indices: &[usize], rng: &mut impl Rng) -> Option<SplitResult> {
        let n_features = self.columns.len();
        let n_samples = sample_indices.len();
        if n_samples < 2 || n_features == 0 {
            return None;
        }

        let mut parent_counts = vec![0usize; self.n_classes];
        for &si in sample_indices {
            parent_counts[self.labels[si]] += 1;
        }
        let parent_impurity = self.criterion.impurity(&parent_counts, n_samples);

        // Partial Fisher-Yates over the feature order.
        let mut feature_order: Vec<usize> = (0..n_features).collect();
        let take = self.max_features.min(n_features);
        for i in 0..take {
            let j = rng.gen_range(i..n_features);
            feature_order.swap(i, j);
        }

        let mut best: Option<(f64, usize, f64)> = None;
        for &feature in &feature_order[..take] {
            let candidate = match self.method {
                SplitMethod::Exact => {
                    self.best_exact(feature, sample_indices, &parent_counts, parent_impurity)
                }
                SplitMethod::ExtraTrees => {
                    self.random_threshold(feature, sample_indices, &parent_counts, parent_impurity, rng)
                }
            };
            if let Some((decrease, threshold)) = candidate
                && best.is_none_or(|(d, _, _)| decrease > d)
            {
                best = Some((decrease, feature, threshold));
            }
        }

        let (impurity_decrease, feature, threshold) = best?;
        let column = &self.columns[feature];
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) =
            sample_indices.iter().partition(|&&si| column[si] <= threshold);
        if left_indices.is_empty() || right_indices.is_empty() {
            return None;
        }

        Some(SplitResult {
            feature: FeatureIndex::new(feature),
            threshold,
            impurity_decrease,
            left_indices,
            right_indices,
        })
    }

    fn weighted_decrease(
        &self,
        parent_impurity: Impurity,
        left_counts: &[usize],
        n_left: usize,
        right_counts: &[usize],
        n_right: usize,
    ) -> f64 {
        let left = self.criterion.impurity(left_counts, n_left).value();
        let right = self.criterion.impurity(right_counts, n_right).value();
        (n_left + n_right) as f64 * parent_impurity.value()
            - n_left as f64 * left
            - n_right as f64 * right
    }

    fn best_exact(
        &self,
        feature: usize,
        sample_indices: &[usize],
        parent_counts: &[usize],
        parent_impurity: Impurity,
    ) -> Option<(f64, f64)> {
        let column = &self.columns[feature];
        let n_samples = sample_indices.len();

        let mut sorted: Vec<(f64, usize)> =
            sample_indices.iter().map(|&si| (column[si], self.labels[si])).collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_counts = vec![0usize; self.n_classes];
        let mut right_counts = parent_counts.to_vec();
        let mut best: Option<(f64, f64)> = None;

        for i in 0..n_samples - 1 {
            let (value, class) = sorted[i];
            left_counts[class] += 1;
            right_counts[class] -= 1;

            let next = sorted[i + 1].0;
            if value == next {
                continue;
            }
            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                continue;
            }

            let decrease =
                self.weighted_decrease(parent_impurity, &left_counts, n_left, &right_counts, n_right);
            if best.is_none_or(|(d, _)| decrease > d) {
                // Adjacent floats can have a midpoint that rounds up to `next`.
                let midpoint = (value + next) / 2.0;
                let threshold = if midpoint >= next { value } else { midpoint };
                best = Some((decrease, threshold));
            }
        }
        best
    }

    fn random_threshold(
        &self,
        feature: usize,
        sample_indices: &[usize],
        parent_counts: &[usize],
        parent_impurity: Impurity,
        rng: &mut impl Rng,
    ) -> Option<(f64, f64)> {
        let column = &self.columns[feature];
        let (lo, hi) = sample_indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &si| {
            (lo.min(column[si]), hi.max(column[si]))
        });
        if lo >= hi {
            return None;
        }
        let threshold = rng.gen_range(lo..hi);

        let mut left_counts = vec![0usize; self.n_classes];
        let mut n_left = 0usize;
        for &si in sample_indices {
            if column[si] <= threshold {
                left_counts[self.labels[si]] += 1;
                n_left += 1;
            }
        }
        let n_right = sample_indices.len() - n_left;
        if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
            return None;
        }
        let right_counts: Vec<usize> =
            parent_counts.iter().zip(&left_counts).map(|(&p, &l)| p - l).collect();

        let decrease =
            self.weighted_decrease(parent_impurity, &left_counts, n_left, &right_counts, n_right);
        Some((decrease, threshold))
    }
}
