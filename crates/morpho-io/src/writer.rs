//! JSON result writer for evaluation, holdout, training and prediction outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Precision, recall, F1 and support of one class.
#[derive(Debug, Clone, Serialize)]
pub struct ClassScore<'a> {
    /// Class name.
    pub class: &'a str,
    /// TP / (TP + FP).
    pub precision: f64,
    /// TP / (TP + FN).
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// True samples of this class.
    pub support: usize,
}

/// A feature with its normalized importance and rank.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureScore<'a> {
    /// Feature name.
    pub name: &'a str,
    /// Mean decrease in impurity, summing to 1 across features.
    pub importance: f64,
    /// 1 is the most important.
    pub rank: usize,
}

/// Cross-validated evaluation written to `{experiment}_evaluate.json`.
#[derive(Debug, Serialize)]
pub struct EvaluationReport<'a> {
    pub n_samples: usize,
    pub n_folds: usize,
    pub n_trees: usize,
    pub seed: u64,
    /// Accuracy over all out-of-fold predictions.
    pub accuracy: f64,
    pub mean_fold_accuracy: f64,
    pub std_fold_accuracy: f64,
    pub fold_accuracies: &'a [f64],
    /// Row and column order of `confusion_matrix`.
    pub class_names: &'a [String],
    /// `confusion_matrix[true][predicted]`.
    pub confusion_matrix: &'a [Vec<usize>],
    pub class_metrics: Vec<ClassScore<'a>>,
    pub feature_importances: Vec<FeatureScore<'a>>,
}

/// Single train/test split written to `{experiment}_holdout.json`.
#[derive(Debug, Serialize)]
pub struct HoldoutReport<'a> {
    /// `tree` or `forest`.
    pub model: &'a str,
    pub n_train: usize,
    pub n_test: usize,
    pub train_fraction: f64,
    pub seed: u64,
    pub accuracy: f64,
    pub class_names: &'a [String],
    pub confusion_matrix: &'a [Vec<usize>],
    pub class_metrics: Vec<ClassScore<'a>>,
}

/// Full-data training run written to `{experiment}_train.json`.
#[derive(Debug, Serialize)]
pub struct TrainingReport<'a> {
    pub n_samples: usize,
    pub n_trees: usize,
    pub n_features: usize,
    pub max_features: usize,
    pub seed: u64,
    pub class_names: &'a [String],
    pub oob_accuracy: Option<f64>,
    pub n_oob_samples: Option<usize>,
    pub feature_importances: Vec<FeatureScore<'a>>,
    pub model_path: String,
}

/// A class and the probability a model gave it.
#[derive(Debug, Clone, Serialize)]
pub struct ClassProbability<'a> {
    pub class: &'a str,
    pub probability: f64,
}

/// One predicted row.
#[derive(Debug, Serialize)]
pub struct PredictionEntry<'a> {
    pub row: usize,
    pub predicted: &'a str,
    /// Class probabilities in `class_names` order.
    pub probabilities: &'a [f64],
    /// Most probable classes, highest first.
    pub top_classes: Vec<ClassProbability<'a>>,
    /// The catalogue label, when the catalogue has one.
    pub actual: Option<&'a str>,
}

/// Predictions written to `{experiment}_predict.json`.
#[derive(Debug, Serialize)]
pub struct PredictionReport<'a> {
    pub n_samples: usize,
    pub class_names: &'a [String],
    /// Present only for labelled catalogues.
    pub accuracy: Option<f64>,
    pub predictions: Vec<PredictionEntry<'a>>,
}

#[derive(Serialize)]
struct Artifact<'a, T> {
    experiment: &'a str,
    #[serde(flatten)]
    report: &'a T,
}

/// Writes run reports to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_{kind}.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write a cross-validation report to `{experiment}_evaluate.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Json`] or [`IoError::WriteFile`].
    pub fn write_evaluation(&self, report: &EvaluationReport<'_>) -> Result<PathBuf, IoError> {
        self.write_artifact("evaluate", report)
    }

    /// Write a holdout report to `{experiment}_holdout.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Json`] or [`IoError::WriteFile`].
    pub fn write_holdout(&self, report: &HoldoutReport<'_>) -> Result<PathBuf, IoError> {
        self.write_artifact("holdout", report)
    }

    /// Write a training report to `{experiment}_train.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Json`] or [`IoError::WriteFile`].
    pub fn write_training(&self, report: &TrainingReport<'_>) -> Result<PathBuf, IoError> {
        self.write_artifact("train", report)
    }

    /// Write predictions to `{experiment}_predict.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Json`] or [`IoError::WriteFile`].
    pub fn write_predictions(&self, report: &PredictionReport<'_>) -> Result<PathBuf, IoError> {
        self.write_artifact("predict", report)
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Does not write anything; just computes `{output_dir}/{experiment}_model.bin`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_model.bin", self.experiment.as_str()))
    }

    /// Return the path for the confusion-matrix heatmap, `{output_dir}/{experiment}_confusion.svg`.
    #[must_use]
    pub fn heatmap_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_confusion.svg", self.experiment.as_str()))
    }

    #[instrument(skip(self, report))]
    fn write_artifact<T: Serialize>(&self, kind: &str, report: &T) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_{kind}.json", self.experiment.as_str()));
        let artifact = Artifact {
            experiment: self.experiment.as_str(),
            report,
        };
        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::Json {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "{kind} result written");
        Ok(path)
    }
}
