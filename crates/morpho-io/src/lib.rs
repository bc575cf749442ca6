//! Catalogue input, feature assembly, result output and plots for the morpho pipeline.

mod catalogue_reader;
mod domain;
mod error;
mod features;
mod heatmap;
mod npy;
mod writer;

pub use catalogue_reader::CatalogueReader;
pub use domain::{Catalogue, ClassLabels, Column, ExperimentName};
pub use error::IoError;
pub use features::{FEATURE_NAMES, FeatureTable, assemble_features};
pub use heatmap::{Annotation, render_confusion_heatmap};
pub use writer::{
    ClassProbability, ClassScore, EvaluationReport, FeatureScore, HoldoutReport, PredictionEntry, PredictionReport, ResultWriter,
    TrainingReport,
};
