//! Prediction methods for the random forest.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::ForestError;
use crate::forest::RandomForest;

/// Averaged class probabilities for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    /// Return the most probable class; ties go to the lowest index.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        self.probs
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (class, &p)| if p > best.1 { (class, p) } else { best })
            .0
    }

    /// Return the `k` most probable classes with their probabilities, descending.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<(usize, f64)> {
        let mut indexed: Vec<(usize, f64)> = self.probs.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
        indexed.truncate(k);
        indexed
    }

    /// Return the probabilities indexed by class.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl RandomForest {
    /// Predict the class of one sample by soft voting.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when the sample width is wrong.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        Ok(self.predict_proba(sample)?.predicted_class())
    }

    /// Average the leaf distributions of all trees for one sample.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when the sample width is wrong.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut probs = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in probs.iter_mut().zip(tree.predict_proba(sample)?) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        probs.iter_mut().for_each(|v| *v /= n);
        Ok(ClassDistribution { probs })
    }

    /// Predict classes for many samples in parallel, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] if any sample has the wrong width.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, ForestError> {
        features.into_par_iter().map(|sample| self.predict(sample)).collect()
    }

    /// Return class distributions for many samples in parallel, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] if any sample has the wrong width.
    pub fn predict_proba_batch(&self, features: &[Vec<f64>]) -> Result<Vec<ClassDistribution>, ForestError> {
        features.into_par_iter().map(|sample| self.predict_proba(sample)).collect()
    }

    /// Return the number of features the forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the class names, indexed by label.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }
}
