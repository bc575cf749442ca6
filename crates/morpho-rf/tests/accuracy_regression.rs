//! Accuracy regression tests for morpho-rf.
//!
//! A deterministic synthetic catalogue with the galaxy feature layout guards
//! against changes that degrade classification quality.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use morpho_rf::{
    ConfusionMatrix, CrossValidation, FoldStrategy, OobMode, RandomForestConfig, SplitMethod, accuracy,
    holdout_split,
};

const FEATURE_NAMES: [&str; 13] = [
    "u-g", "g-r", "r-i", "i-z", "ecc", "m4_u", "m4_g", "m4_r", "m4_i", "m4_z", "conc_u", "conc_r", "conc_z",
];

/// 270 samples, 3 classes dealt round-robin.
///
/// Colours (features 0-3) and the r-band concentration (feature 11) carry the
/// class; the remaining columns are noise.
fn make_catalogue() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let n_samples = 270;
    let n_classes = 3;

    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % n_classes;
        labels.push(class);
        let row: Vec<f64> = (0..FEATURE_NAMES.len())
            .map(|f| {
                let base = if f < 4 || f == 11 { class as f64 * 2.0 } else { 0.0 };
                base + rng.r#gen::<f64>() * 0.6
            })
            .collect();
        features.push(row);
    }
    let names = FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect();
    (features, labels, names)
}

#[test]
fn cross_validated_accuracy_above_threshold() {
    let (features, labels, names) = make_catalogue();
    let config = RandomForestConfig::new(50).unwrap().with_seed(42);
    let result = CrossValidation::new(10)
        .unwrap()
        .cross_val_predict(&config, &features, &labels, &names)
        .unwrap();

    assert!(result.accuracy > 0.9, "cv accuracy {} <= 0.9", result.accuracy);
    assert_eq!(result.confusion_matrix.total(), features.len());
    assert_eq!(result.fold_accuracies.len(), 10);
}

#[test]
fn shuffled_folds_cover_every_sample() {
    let (features, labels, names) = make_catalogue();
    let config = RandomForestConfig::new(20).unwrap().with_seed(7);
    let result = CrossValidation::new(5)
        .unwrap()
        .with_strategy(FoldStrategy::Shuffled)
        .with_seed(7)
        .cross_val_predict(&config, &features, &labels, &names)
        .unwrap();

    for fold in 0..5 {
        assert!(result.fold_assignments.contains(&fold));
    }
    let recomputed = accuracy(&result.predictions, &labels).unwrap();
    assert!((recomputed - result.accuracy).abs() < 1e-12);
}

#[test]
fn oob_accuracy_above_threshold() {
    let (features, labels, names) = make_catalogue();
    let result = RandomForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .with_oob_mode(OobMode::Enabled)
        .fit(&features, &labels, &names)
        .unwrap();

    let oob = result.oob_score().expect("OOB score must be computed when enabled");
    assert!(oob.accuracy > 0.85, "oob accuracy {} <= 0.85", oob.accuracy);
}

#[test]
fn top_features_are_informative() {
    let (features, labels, names) = make_catalogue();
    let result = RandomForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .fit(&features, &labels, &names)
        .unwrap();

    let informative = ["u-g", "g-r", "r-i", "i-z", "conc_r"];
    let top5: Vec<&str> = result.importances().iter().take(5).map(|f| f.name.as_str()).collect();
    let hits = top5.iter().filter(|n| informative.contains(n)).count();
    assert!(hits >= 4, "only {hits}/5 informative features in top 5: {top5:?}");
}

#[test]
fn extra_trees_also_separate_classes() {
    let (features, labels, names) = make_catalogue();
    let (train, test) = holdout_split(features.len(), 0.5, 42).unwrap();
    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
        (
            idx.iter().map(|&i| features[i].clone()).collect(),
            idx.iter().map(|&i| labels[i]).collect(),
        )
    };
    let (train_x, train_y) = pick(&train);
    let (test_x, test_y) = pick(&test);

    let forest = RandomForestConfig::new(50)
        .unwrap()
        .with_seed(3)
        .with_n_classes(Some(3))
        .with_split_method(SplitMethod::ExtraTrees)
        .fit(&train_x, &train_y, &names)
        .unwrap()
        .into_forest();
    let predicted = forest.predict_batch(&test_x).unwrap();
    let cm = ConfusionMatrix::from_labels(&test_y, &predicted, 3).unwrap();
    assert!(cm.accuracy() > 0.9, "holdout accuracy {} <= 0.9", cm.accuracy());
}

#[test]
fn deterministic_predictions() {
    let (features, labels, names) = make_catalogue();
    let config = RandomForestConfig::new(30).unwrap().with_seed(42);
    let first = config.fit(&features, &labels, &names).unwrap();
    let second = config.fit(&features, &labels, &names).unwrap();
    assert_eq!(
        first.forest().predict_batch(&features).unwrap(),
        second.forest().predict_batch(&features).unwrap()
    );
}
