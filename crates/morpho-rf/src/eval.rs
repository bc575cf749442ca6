//! k-fold cross-validation and hold-out splitting.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::confusion::ConfusionMatrix;
use crate::dataset;
use crate::error::ForestError;
use crate::importance::{RankedFeature, aggregate_importances};
use crate::metrics::{accuracy, mean_std};

/// How samples are dealt into folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldStrategy {
    /// Shuffle within each class and deal round-robin, so every fold keeps
    /// the class proportions.
    Stratified,
    /// Shuffle all samples and cut into contiguous, near-equal folds.
    Shuffled,
}

/// Cross-validation settings.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    strategy: FoldStrategy,
    seed: u64,
}

/// Outcome of cross-validated prediction.
#[derive(Debug)]
pub struct CrossValidationResult {
    /// Out-of-fold prediction for every sample, in input order.
    pub predictions: Vec<usize>,
    /// Fold each sample was held out in.
    pub fold_assignments: Vec<usize>,
    /// Accuracy of each fold's held-out predictions.
    pub fold_accuracies: Vec<f64>,
    /// Accuracy over all out-of-fold predictions.
    pub accuracy: f64,
    /// Mean of the fold accuracies.
    pub mean_accuracy: f64,
    /// Population standard deviation of the fold accuracies.
    pub std_accuracy: f64,
    /// Confusion matrix of the out-of-fold predictions.
    pub confusion_matrix: ConfusionMatrix,
    /// Importances averaged over every tree of every fold.
    pub feature_importances: Vec<RankedFeature>,
    /// Number of folds.
    pub n_folds: usize,
    /// Number of samples.
    pub n_samples: usize,
    /// Number of classes.
    pub n_classes: usize,
}

impl CrossValidation {
    /// Create a stratified `n_folds`-fold cross-validation with seed 42.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidFoldCount`] if `n_folds < 2`.
    pub fn new(n_folds: usize) -> Result<Self, ForestError> {
        if n_folds < 2 {
            return Err(ForestError::InvalidFoldCount { n_folds });
        }
        Ok(Self {
            n_folds,
            strategy: FoldStrategy::Stratified,
            seed: 42,
        })
    }

    /// Set the seed used to shuffle samples into folds.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set how samples are dealt into folds.
    #[must_use]
    pub fn with_strategy(mut self, strategy: FoldStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Predict every sample with a forest trained on the other folds.
    ///
    /// Each fold's forest is seeded with `config.seed + fold` and trained
    /// with the global class count, so class probabilities stay aligned even
    /// when a training split lacks a class.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] and other validation errors | malformed input |
    /// | [`ForestError::TooFewSamplesForFolds`] | stratified and a class has fewer samples than folds |
    /// | [`ForestError::TooFewSamples`] | shuffled and fewer samples than folds |
    /// | Other forest errors | from training a fold |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_samples = features.len()))]
    pub fn cross_val_predict(
        &self,
        config: &RandomForestConfig,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<CrossValidationResult, ForestError> {
        let shape = dataset::validate(features, labels, config.n_classes)?;
        dataset::validate_feature_names(feature_names, shape.n_features)?;
        let fold_assignments = self.assign_folds(labels, shape.n_classes)?;

        let mut predictions = vec![0usize; shape.n_samples];
        let mut fold_accuracies = Vec::with_capacity(self.n_folds);
        let mut per_tree_importances = Vec::with_capacity(self.n_folds * config.n_trees);

        for fold in 0..self.n_folds {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..shape.n_samples).partition(|&i| fold_assignments[i] == fold);

            let train_features: Vec<Vec<f64>> = train.iter().map(|&i| features[i].clone()).collect();
            let train_labels: Vec<usize> = train.iter().map(|&i| labels[i]).collect();
            let test_features: Vec<Vec<f64>> = test.iter().map(|&i| features[i].clone()).collect();
            let test_labels: Vec<usize> = test.iter().map(|&i| labels[i]).collect();

            let fold_config = config
                .clone()
                .with_seed(config.seed.wrapping_add(fold as u64))
                .with_n_classes(Some(shape.n_classes));
            let result = fold_config.fit(&train_features, &train_labels, feature_names)?;
            let fold_predictions = result.forest().predict_batch(&test_features)?;

            let fold_accuracy = accuracy(&fold_predictions, &test_labels)?;
            info!(fold, n_test = test.len(), accuracy = fold_accuracy, "fold completed");
            fold_accuracies.push(fold_accuracy);

            for (&i, &p) in test.iter().zip(&fold_predictions) {
                predictions[i] = p;
            }
            per_tree_importances.extend(result.forest().trees().iter().map(|t| t.feature_importances()));
        }

        let overall = accuracy(&predictions, labels)?;
        let (mean_accuracy, std_accuracy) = mean_std(&fold_accuracies);
        let confusion_matrix = ConfusionMatrix::from_labels(labels, &predictions, shape.n_classes)?;
        let feature_importances = aggregate_importances(&per_tree_importances, feature_names);

        info!(accuracy = overall, mean_accuracy, std_accuracy, "cross-validation complete");

        Ok(CrossValidationResult {
            predictions,
            fold_assignments,
            fold_accuracies,
            accuracy: overall,
            mean_accuracy,
            std_accuracy,
            confusion_matrix,
            feature_importances,
            n_folds: self.n_folds,
            n_samples: shape.n_samples,
            n_classes: shape.n_classes,
        })
    }

    /// Assign each sample a fold in `0..n_folds`.
    fn assign_folds(&self, labels: &[usize], n_classes: usize) -> Result<Vec<usize>, ForestError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut assignments = vec![0usize; labels.len()];

        match self.strategy {
            FoldStrategy::Stratified => {
                let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
                for (i, &label) in labels.iter().enumerate() {
                    by_class[label].push(i);
                }
                for (class, members) in by_class.iter().enumerate() {
                    if !members.is_empty() && members.len() < self.n_folds {
                        return Err(ForestError::TooFewSamplesForFolds {
                            class,
                            count: members.len(),
                            n_folds: self.n_folds,
                        });
                    }
                }
                // Continue the round-robin across classes so fold sizes differ by at most one.
                let mut next = 0usize;
                for members in &mut by_class {
                    members.shuffle(&mut rng);
                    for &i in members.iter() {
                        assignments[i] = next % self.n_folds;
                        next += 1;
                    }
                }
            }
            FoldStrategy::Shuffled => {
                let n = labels.len();
                if n < self.n_folds {
                    return Err(ForestError::TooFewSamples {
                        n_samples: n,
                        n_folds: self.n_folds,
                    });
                }
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(&mut rng);
                // The first n % k folds get one extra sample.
                let (base, extra) = (n / self.n_folds, n % self.n_folds);
                let mut start = 0;
                for fold in 0..self.n_folds {
                    let len = base + usize::from(fold < extra);
                    for &i in &order[start..start + len] {
                        assignments[i] = fold;
                    }
                    start += len;
                }
            }
        }

        debug!(n_samples = labels.len(), strategy = ?self.strategy, "folds assigned");
        Ok(assignments)
    }
}

/// Shuffle `0..n_samples` and cut it into train and test index sets.
///
/// The train side gets `floor(n_samples * train_fraction)` samples.
///
/// # Errors
///
/// Returns [`ForestError::InvalidTrainFraction`] when either side would be empty.
pub fn holdout_split(
    n_samples: usize,
    train_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), ForestError> {
    let n_train = (n_samples as f64 * train_fraction).floor() as usize;
    if !(0.0..=1.0).contains(&train_fraction) || n_train == 0 || n_train >= n_samples {
        return Err(ForestError::InvalidTrainFraction {
            fraction: train_fraction,
            n_samples,
        });
    }
    let mut order: Vec<usize> = (0..n_samples).collect();
    order.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let test = order.split_off(n_train);
    Ok((order, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaxFeatures;

    fn three_groups(per_class: usize) -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for class in 0..3 {
            for i in 0..per_class {
                features.push(vec![class as f64 * 10.0 + i as f64 * 0.1, 0.5]);
                labels.push(class);
            }
        }
        (features, labels, vec!["x".into(), "y".into()])
    }

    #[test]
    fn stratified_predictions_cover_every_sample() {
        let (features, labels, names) = three_groups(30);
        let config = RandomForestConfig::new(15).unwrap().with_max_features(MaxFeatures::All);
        let result = CrossValidation::new(5)
            .unwrap()
            .cross_val_predict(&config, &features, &labels, &names)
            .unwrap();

        assert_eq!(result.predictions.len(), 90);
        assert_eq!(result.fold_accuracies.len(), 5);
        assert_eq!(result.confusion_matrix.total(), 90);
        assert!(result.accuracy > 0.9, "accuracy = {}", result.accuracy);
        assert!((result.confusion_matrix.accuracy() - result.accuracy).abs() < 1e-12);
        assert!((accuracy(&result.predictions, &labels).unwrap() - result.accuracy).abs() < 1e-12);
    }

    #[test]
    fn stratified_folds_balance_classes() {
        let (_, labels, _) = three_groups(10);
        let cv = CrossValidation::new(5).unwrap();
        let folds = cv.assign_folds(&labels, 3).unwrap();
        for fold in 0..5 {
            for class in 0..3 {
                let n = labels
                    .iter()
                    .zip(&folds)
                    .filter(|&(&l, &f)| l == class && f == fold)
                    .count();
                assert_eq!(n, 2, "fold {fold} class {class}");
            }
        }
    }

    #[test]
    fn shuffled_folds_are_near_equal() {
        let labels = vec![0usize; 23];
        let cv = CrossValidation::new(4).unwrap().with_strategy(FoldStrategy::Shuffled);
        let folds = cv.assign_folds(&labels, 1).unwrap();
        let mut sizes = [0usize; 4];
        for f in folds {
            sizes[f] += 1;
        }
        assert_eq!(sizes, [6, 6, 6, 5]);
    }

    #[test]
    fn shuffled_strategy_runs_end_to_end() {
        let (features, labels, names) = three_groups(12);
        let config = RandomForestConfig::new(10).unwrap();
        let result = CrossValidation::new(3)
            .unwrap()
            .with_strategy(FoldStrategy::Shuffled)
            .cross_val_predict(&config, &features, &labels, &names)
            .unwrap();
        assert_eq!(result.confusion_matrix.n_classes(), 3);
        assert_eq!(result.predictions.len(), 36);
    }

    #[test]
    fn fold_count_validated() {
        assert!(CrossValidation::new(0).is_err());
        assert!(CrossValidation::new(1).is_err());
        assert_eq!(CrossValidation::new(10).unwrap().n_folds(), 10);
    }

    #[test]
    fn sparse_class_rejected_for_stratified() {
        let features = vec![vec![1.0], vec![2.0], vec![10.0], vec![11.0], vec![12.0]];
        let labels = vec![0, 0, 1, 1, 1];
        let err = CrossValidation::new(3)
            .unwrap()
            .cross_val_predict(&RandomForestConfig::new(3).unwrap(), &features, &labels, &["x".to_string()])
            .unwrap_err();
        assert!(matches!(err, ForestError::TooFewSamplesForFolds { class: 0, count: 2, n_folds: 3 }));
    }

    #[test]
    fn feature_name_count_checked_before_folding() {
        let (features, labels, _) = three_groups(10);
        let err = CrossValidation::new(5)
            .unwrap()
            .cross_val_predict(&RandomForestConfig::new(3).unwrap(), &features, &labels, &["x".to_string()])
            .unwrap_err();
        assert!(matches!(err, ForestError::FeatureNameCountMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn too_few_samples_for_plain_folds() {
        let err = CrossValidation::new(4)
            .unwrap()
            .with_strategy(FoldStrategy::Shuffled)
            .assign_folds(&[0, 1, 0], 2)
            .unwrap_err();
        assert!(matches!(err, ForestError::TooFewSamples { n_samples: 3, n_folds: 4 }));
    }

    #[test]
    fn holdout_partitions_indices() {
        let (train, test) = holdout_split(10, 0.5, 7).unwrap();
        assert_eq!(train.len(), 5);
        assert_eq!(test.len(), 5);
        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn holdout_train_side_rounds_down() {
        let (train, test) = holdout_split(11, 0.5, 7).unwrap();
        assert_eq!(train.len(), 5);
        assert_eq!(test.len(), 6);
    }

    #[test]
    fn holdout_rejects_degenerate_fractions() {
        assert!(holdout_split(10, 0.0, 1).is_err());
        assert!(holdout_split(10, 1.0, 1).is_err());
        assert!(holdout_split(10, 1.5, 1).is_err());
        assert!(holdout_split(1, 0.5, 1).is_err());
    }
}
