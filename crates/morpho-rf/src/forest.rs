//! Random forest training with parallel tree construction.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::{OobMode, RandomForestConfig};
use crate::dataset;
use crate::error::ForestError;
use crate::importance::aggregate_importances;
use crate::oob::compute_oob;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// A fitted random forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
    pub(crate) class_names: Vec<String>,
}

impl RandomForest {
    /// Attach human-readable class names, indexed by class label.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::ClassNameCountMismatch`] unless exactly one name per class is given.
    pub fn with_class_names(mut self, class_names: Vec<String>) -> Result<Self, ForestError> {
        if class_names.len() != self.n_classes {
            return Err(ForestError::ClassNameCountMismatch {
                n_classes: self.n_classes,
                got: class_names.len(),
            });
        }
        self.class_names = class_names;
        Ok(self)
    }

    /// Return the trees of the ensemble.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

/// Default class names: the label indices as strings.
pub(crate) fn index_names(n_classes: usize) -> Vec<String> {
    (0..n_classes).map(|c| c.to_string()).collect()
}

/// Draw `draw_count` indices with replacement; return them with the never-drawn indices.
fn bootstrap_sample(n_samples: usize, draw_count: usize, rng: &mut impl Rng) -> (Vec<usize>, Vec<usize>) {
    let mut in_bag = vec![false; n_samples];
    let drawn: Vec<usize> = (0..draw_count)
        .map(|_| {
            let idx = rng.gen_range(0..n_samples);
            in_bag[idx] = true;
            idx
        })
        .collect();
    let out_of_bag = (0..n_samples).filter(|&i| !in_bag[i]).collect();
    (drawn, out_of_bag)
}

#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<RandomForestResult, ForestError> {
    let shape = dataset::validate(features, labels, config.n_classes)?;
    dataset::validate_feature_names(feature_names, shape.n_features)?;
    let max_features = config.max_features.resolve(shape.n_features)?;
    if config.bootstrap_fraction <= 0.0 || config.bootstrap_fraction > 1.0 {
        return Err(ForestError::InvalidBootstrapFraction {
            fraction: config.bootstrap_fraction,
        });
    }

    let tree_config = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_split_method(config.split_method)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features))
        .with_n_classes(Some(shape.n_classes));
    tree_config.validate_params(shape.n_features)?;

    let draw_count = ((shape.n_samples as f64) * config.bootstrap_fraction).ceil() as usize;
    info!(
        n_trees = config.n_trees,
        n_samples = shape.n_samples,
        n_features = shape.n_features,
        n_classes = shape.n_classes,
        max_features,
        draw_count,
        "training random forest"
    );

    let columns = dataset::to_columns(features, shape.n_features);

    // Per-tree seeds come from one master stream so the result does not
    // depend on how rayon schedules the trees.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let (trees, oob_indices_per_tree): (Vec<DecisionTree>, Vec<Vec<usize>>) = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (drawn, out_of_bag) = bootstrap_sample(shape.n_samples, draw_count, &mut rng);
            let tree = tree_config
                .clone()
                .with_seed(rng.r#gen())
                .grow(&columns, labels, &drawn, shape);
            (tree, out_of_bag)
        })
        .unzip();
    debug!(n_trees_trained = trees.len(), "tree training complete");

    let per_tree: Vec<Vec<f64>> = trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree, feature_names);

    let forest = RandomForest {
        trees,
        n_features: shape.n_features,
        n_classes: shape.n_classes,
        feature_names: feature_names.to_vec(),
        class_names: index_names(shape.n_classes),
    };

    let oob_score = match config.oob_mode {
        OobMode::Enabled => Some(compute_oob(&forest, features, labels, &oob_indices_per_tree)?),
        OobMode::Disabled => None,
    };
    info!(
        oob_accuracy = oob_score.as_ref().map(|s| s.accuracy),
        "random forest training complete"
    );

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features: shape.n_features,
        n_classes: shape.n_classes,
        n_samples: shape.n_samples,
        max_features_resolved: max_features,
    };
    Ok(RandomForestResult::new(forest, importances, oob_score, metadata))
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, OobMode, RandomForestConfig};
    use crate::split::SplitMethod;
    use crate::ForestError;

    /// Three well-separated groups along the first feature.
    fn three_groups() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for class in 0..3 {
            for i in 0..20 {
                features.push(vec![class as f64 * 10.0 + i as f64 * 0.15, 0.5]);
                labels.push(class);
            }
        }
        (features, labels, vec!["x".into(), "y".into()])
    }

    fn training_accuracy(config: &RandomForestConfig) -> f64 {
        let (features, labels, names) = three_groups();
        let result = config.fit(&features, &labels, &names).unwrap();
        let predictions = result.forest().predict_batch(&features).unwrap();
        crate::accuracy(&predictions, &labels).unwrap()
    }

    #[test]
    fn separable_groups_fit_well() {
        let config = RandomForestConfig::new(30).unwrap().with_max_features(MaxFeatures::All);
        assert!(training_accuracy(&config) > 0.95);
    }

    #[test]
    fn extra_trees_fit_well() {
        let config = RandomForestConfig::new(30)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_split_method(SplitMethod::ExtraTrees);
        assert!(training_accuracy(&config) > 0.9);
    }

    #[test]
    fn oob_score_reported_when_enabled() {
        let (features, labels, names) = three_groups();
        let result = RandomForestConfig::new(40)
            .unwrap()
            .with_oob_mode(OobMode::Enabled)
            .fit(&features, &labels, &names)
            .unwrap();
        let oob = result.oob_score().expect("oob enabled");
        assert!(oob.accuracy > 0.8, "oob accuracy = {}", oob.accuracy);
        assert!(oob.n_oob_samples > 0);
        assert_eq!(oob.confusion_matrix.total(), oob.n_oob_samples);
    }

    #[test]
    fn same_seed_same_forest() {
        let (features, labels, names) = three_groups();
        let config = RandomForestConfig::new(10).unwrap().with_seed(99);
        let a = config.fit(&features, &labels, &names).unwrap();
        let b = config.fit(&features, &labels, &names).unwrap();
        assert_eq!(
            a.forest().predict_proba_batch(&features).unwrap(),
            b.forest().predict_proba_batch(&features).unwrap()
        );
    }

    #[test]
    fn importances_favour_informative_feature() {
        let (features, labels, names) = three_groups();
        let result = RandomForestConfig::new(20).unwrap().fit(&features, &labels, &names).unwrap();
        let total: f64 = result.importances().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10);
        assert_eq!(result.importances()[0].name, "x");
        assert_eq!(result.importances()[0].rank, 1);
    }

    #[test]
    fn class_names_must_match_class_count() {
        let (features, labels, names) = three_groups();
        let forest = RandomForestConfig::new(3)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap()
            .into_forest();
        assert_eq!(forest.class_names(), &["0", "1", "2"]);
        let err = forest.clone().with_class_names(vec!["a".into()]).unwrap_err();
        assert!(matches!(err, ForestError::ClassNameCountMismatch { n_classes: 3, got: 1 }));
        let named = forest
            .with_class_names(vec!["elliptical".into(), "merger".into(), "spiral".into()])
            .unwrap();
        assert_eq!(named.class_names()[2], "spiral");
    }

    #[test]
    fn invalid_bootstrap_fraction_rejected() {
        let (features, labels, names) = three_groups();
        let err = RandomForestConfig::new(5)
            .unwrap()
            .with_bootstrap_fraction(1.5)
            .fit(&features, &labels, &names)
            .unwrap_err();
        assert!(matches!(err, ForestError::InvalidBootstrapFraction { .. }));
    }

    #[test]
    fn feature_names_must_cover_every_column() {
        let (features, labels, _) = three_groups();
        let err = RandomForestConfig::new(5)
            .unwrap()
            .fit(&features, &labels, &["x".to_string()])
            .unwrap_err();
        assert!(matches!(err, ForestError::FeatureNameCountMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn empty_dataset_rejected() {
        let err = RandomForestConfig::new(5).unwrap().fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }
}
