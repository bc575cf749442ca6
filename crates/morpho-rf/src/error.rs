use std::path::PathBuf;

/// Errors from forest training, evaluation and persistence.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The rejected tree count.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The rejected depth limit.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The rejected value.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The rejected value.
        min_samples_leaf: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds the feature count.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved candidate count.
        max_features: usize,
        /// Number of feature columns in the training data.
        n_features: usize,
    },

    /// Returned when bootstrap_fraction is outside (0.0, 1.0].
    #[error("bootstrap_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidBootstrapFraction {
        /// The rejected fraction.
        fraction: f64,
    },

    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The rejected fold count.
        n_folds: usize,
    },

    /// Returned when a hold-out train fraction leaves either side empty.
    #[error("train_fraction {fraction} leaves an empty train or test split for {n_samples} samples")]
    InvalidTrainFraction {
        /// The rejected fraction.
        fraction: f64,
        /// Number of samples being split.
        n_samples: usize,
    },

    /// Returned when there are no samples to train or score on.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training rows have no feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when features and labels disagree on the sample count.
    #[error("{n_features_rows} feature rows but {n_labels} labels")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_features_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when two sequences compared element-wise differ in length.
    #[error("length mismatch: predicted has {predicted} elements, actual has {actual}")]
    LengthMismatch {
        /// Length of the predicted sequence.
        predicted: usize,
        /// Length of the reference sequence.
        actual: usize,
    },

    /// Returned when a row has a different width from the first row.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        got: usize,
        /// Zero-based row index.
        sample_index: usize,
    },

    /// Returned when a prediction input has the wrong width.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// Width the model was trained on.
        expected: usize,
        /// Width of the input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// Zero-based row index.
        sample_index: usize,
        /// Zero-based column index.
        feature_index: usize,
    },

    /// Returned when a label lies outside the declared class range.
    #[error("label {label} at position {position} is out of range for {n_classes} classes")]
    LabelOutOfRange {
        /// The offending label.
        label: usize,
        /// Zero-based position in the label slice.
        position: usize,
        /// Number of declared classes.
        n_classes: usize,
    },

    /// Returned when a class name list does not match the class count.
    #[error("got {got} class names for {n_classes} classes")]
    ClassNameCountMismatch {
        /// Number of classes the model or matrix holds.
        n_classes: usize,
        /// Number of names supplied.
        got: usize,
    },

    /// Returned when the feature name list does not match the column count.
    #[error("got {got} feature names for {expected} feature columns")]
    FeatureNameCountMismatch {
        /// Number of feature columns.
        expected: usize,
        /// Number of names supplied.
        got: usize,
    },

    /// Returned when a class has fewer samples than stratified folds.
    #[error("class {class} has only {count} samples, need at least {n_folds} for stratified CV")]
    TooFewSamplesForFolds {
        /// The under-populated class.
        class: usize,
        /// Samples in that class.
        count: usize,
        /// Requested folds.
        n_folds: usize,
    },

    /// Returned when plain k-fold is asked for more folds than samples.
    #[error("{n_samples} samples cannot fill {n_folds} folds")]
    TooFewSamples {
        /// Total samples.
        n_samples: usize,
        /// Requested folds.
        n_folds: usize,
    },

    /// Returned when OOB evaluation has nothing to score.
    #[error("OOB evaluation failed: {reason}")]
    OobEvaluationFailed {
        /// Why no OOB score could be produced.
        reason: String,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Model file path.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Model file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Model file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a model file has an unknown format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// Version this build writes.
        expected: u32,
        /// Version found in the file.
        found: u32,
        /// Model file path.
        path: PathBuf,
    },
}
