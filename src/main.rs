use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use morpho_io::{
    Annotation, CatalogueReader, ClassLabels, ClassProbability, ClassScore, EvaluationReport, ExperimentName, FeatureScore, FeatureTable,
    HoldoutReport, PredictionEntry, PredictionReport, ResultWriter, TrainingReport, assemble_features,
    render_confusion_heatmap,
};
use morpho_rf::{
    ConfusionMatrix, CrossValidation, DecisionTreeConfig, FoldStrategy, MaxFeatures, OobMode, RandomForest,
    RandomForestConfig, RankedFeature, SplitCriterion, SplitMethod, accuracy, holdout_split,
};

#[derive(Parser)]
#[command(name = "morpho")]
#[command(about = "Galaxy morphology classification with random forests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Input catalogue and output naming shared by every command.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to the galaxy catalogue (.npy structured array or .csv)
    #[arg(long)]
    data: PathBuf,

    /// Column holding the morphology label
    #[arg(long, default_value = "class")]
    class_column: String,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Random forest hyper-parameters.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees in the forest
    #[arg(long, default_value_t = 50)]
    n_trees: usize,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples in a leaf
    #[arg(long, default_value_t = 1)]
    min_samples_leaf: usize,

    /// Features per split: "sqrt", "log2", "all", a fraction in (0, 1] or a count
    #[arg(long, default_value = "sqrt")]
    max_features: String,

    /// Impurity criterion: "gini" or "entropy"
    #[arg(long, default_value = "gini")]
    criterion: String,

    /// Split-finding strategy: "exact" or "extra-trees"
    #[arg(long, default_value = "exact")]
    split_method: String,
}

#[derive(Subcommand)]
enum Command {
    /// Cross-validated predictions, accuracy, confusion matrix and heatmap
    Evaluate {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        forest: ForestArgs,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 10)]
        cv_folds: usize,

        /// Fold assignment: "stratified" or "shuffled"
        #[arg(long, default_value = "stratified")]
        fold_strategy: String,

        /// Shade and annotate the heatmap with row-normalized fractions
        #[arg(long, default_value_t = false)]
        normalize: bool,
    },

    /// Train on one part of the catalogue and score on the rest
    Holdout {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        forest: ForestArgs,

        /// Fraction of rows used for training
        #[arg(long, default_value_t = 0.5)]
        train_fraction: f64,

        /// Classifier: "tree" (single decision tree) or "forest"
        #[arg(long, default_value = "forest")]
        model: String,
    },

    /// Fit a forest on every row, report OOB accuracy and save the model
    Train {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Classify a catalogue with a saved model
    Predict {
        #[command(flatten)]
        data: DataArgs,

        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Number of most probable classes listed per galaxy
        #[arg(long, default_value_t = 2)]
        top_k: usize,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct EvaluateOutput {
    experiment: String,
    n_samples: usize,
    n_folds: usize,
    accuracy: f64,
    mean_fold_accuracy: f64,
    std_fold_accuracy: f64,
    class_names: Vec<String>,
    confusion_matrix: Vec<Vec<usize>>,
    heatmap: PathBuf,
}

#[derive(Serialize)]
struct HoldoutOutput {
    experiment: String,
    model: String,
    n_train: usize,
    n_test: usize,
    accuracy: f64,
    class_names: Vec<String>,
    confusion_matrix: Vec<Vec<usize>>,
}

#[derive(Serialize)]
struct TrainOutput {
    experiment: String,
    n_samples: usize,
    n_trees: usize,
    oob_accuracy: Option<f64>,
    model_path: PathBuf,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_samples: usize,
    model_n_trees: usize,
    class_counts: Vec<(String, usize)>,
    accuracy: Option<f64>,
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        "all" => Ok(MaxFeatures::All),
        other => {
            if let Ok(count) = other.parse::<usize>() {
                Ok(MaxFeatures::Fixed(count))
            } else if let Ok(fraction) = other.parse::<f64>() {
                Ok(MaxFeatures::Fraction(fraction))
            } else {
                anyhow::bail!("unknown max features: {other} (expected sqrt, log2, all, a fraction or a count)")
            }
        }
    }
}

fn parse_criterion(s: &str) -> Result<SplitCriterion> {
    match s {
        "gini" => Ok(SplitCriterion::Gini),
        "entropy" => Ok(SplitCriterion::Entropy),
        other => anyhow::bail!("unknown criterion: {other} (expected gini or entropy)"),
    }
}

fn parse_split_method(s: &str) -> Result<SplitMethod> {
    match s {
        "exact" => Ok(SplitMethod::Exact),
        "extra-trees" => Ok(SplitMethod::ExtraTrees),
        other => anyhow::bail!("unknown split method: {other} (expected exact or extra-trees)"),
    }
}

fn parse_fold_strategy(s: &str) -> Result<FoldStrategy> {
    match s {
        "stratified" => Ok(FoldStrategy::Stratified),
        "shuffled" => Ok(FoldStrategy::Shuffled),
        other => anyhow::bail!("unknown fold strategy: {other} (expected stratified or shuffled)"),
    }
}

fn forest_config(args: &ForestArgs, n_classes: usize, seed: u64) -> Result<RandomForestConfig> {
    Ok(RandomForestConfig::new(args.n_trees)?
        .with_max_depth(args.max_depth)
        .with_min_samples_leaf(args.min_samples_leaf)
        .with_max_features(parse_max_features(&args.max_features)?)
        .with_criterion(parse_criterion(&args.criterion)?)
        .with_split_method(parse_split_method(&args.split_method)?)
        .with_n_classes(Some(n_classes))
        .with_seed(seed))
}

/// Read the catalogue and build the labelled feature table.
fn load_table(data: &DataArgs) -> Result<FeatureTable> {
    let catalogue = CatalogueReader::new(&data.data, &data.class_column)
        .read()
        .context("failed to read galaxy catalogue")?;
    let table = FeatureTable::from_catalogue(&catalogue, &data.class_column)
        .context("failed to assemble galaxy features")?;
    info!(
        n_samples = table.n_samples(),
        classes = ?table.classes().names(),
        "feature table ready"
    );
    Ok(table)
}

fn class_scores(cm: &ConfusionMatrix) -> Vec<ClassScore<'_>> {
    cm.class_metrics()
        .into_iter()
        .map(|m| ClassScore {
            class: &cm.class_names()[m.class],
            precision: m.precision,
            recall: m.recall,
            f1: m.f1,
            support: m.support,
        })
        .collect()
}

fn feature_scores(ranked: &[RankedFeature]) -> Vec<FeatureScore<'_>> {
    ranked
        .iter()
        .map(|f| FeatureScore {
            name: &f.name,
            importance: f.importance,
            rank: f.rank,
        })
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Evaluate {
            data,
            forest,
            cv_folds,
            fold_strategy,
            normalize,
        } => {
            let experiment_name = ExperimentName::new(data.experiment.clone())?;

            // 1. Read catalogue and assemble features
            let table = load_table(&data)?;
            let class_names = table.classes().names().to_vec();

            // 2. Cross-validated predictions
            let rf_config = forest_config(&forest, class_names.len(), cli.seed)?;
            let cv = CrossValidation::new(cv_folds)?
                .with_seed(cli.seed)
                .with_strategy(parse_fold_strategy(&fold_strategy)?);
            let cv_result = cv
                .cross_val_predict(&rf_config, table.features(), table.labels(), &table.feature_names())
                .context("cross-validation failed")?;

            // 3. Accuracy and confusion matrix
            let acc = accuracy(&cv_result.predictions, table.labels())?;
            let cm = ConfusionMatrix::from_labels(table.labels(), &cv_result.predictions, class_names.len())?
                .with_class_names(class_names.clone())?;
            info!(accuracy = acc, "cross-validated accuracy");
            info!("confusion matrix (rows: true, columns: predicted)\n{cm}");

            // 4. Write JSON artifact and heatmap
            let writer = ResultWriter::new(&data.output_dir, experiment_name)?;
            writer.write_evaluation(&EvaluationReport {
                n_samples: table.n_samples(),
                n_folds: cv_result.n_folds,
                n_trees: forest.n_trees,
                seed: cli.seed,
                accuracy: acc,
                mean_fold_accuracy: cv_result.mean_accuracy,
                std_fold_accuracy: cv_result.std_accuracy,
                fold_accuracies: &cv_result.fold_accuracies,
                class_names: &class_names,
                confusion_matrix: cm.as_rows(),
                class_metrics: class_scores(&cm),
                feature_importances: feature_scores(&cv_result.feature_importances),
            })?;

            let (values, annotation) = if normalize {
                (cm.normalized(), Annotation::Fraction)
            } else {
                let counts: Vec<Vec<f64>> = cm
                    .as_rows()
                    .iter()
                    .map(|row| row.iter().map(|&c| c as f64).collect())
                    .collect();
                (counts, Annotation::Count)
            };
            let heatmap = writer.heatmap_path();
            let title = format!("{}: {cv_folds}-fold accuracy {acc:.3}", data.experiment);
            render_confusion_heatmap(&heatmap, &title, &class_names, &values, annotation)
                .context("failed to render confusion matrix heatmap")?;

            let output = EvaluateOutput {
                experiment: data.experiment,
                n_samples: table.n_samples(),
                n_folds: cv_result.n_folds,
                accuracy: acc,
                mean_fold_accuracy: cv_result.mean_accuracy,
                std_fold_accuracy: cv_result.std_accuracy,
                class_names,
                confusion_matrix: cm.as_rows().to_vec(),
                heatmap,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Holdout {
            data,
            forest,
            train_fraction,
            model,
        } => {
            let experiment_name = ExperimentName::new(data.experiment.clone())?;

            // 1. Read and split
            let table = load_table(&data)?;
            let class_names = table.classes().names().to_vec();
            let (train_idx, test_idx) = holdout_split(table.n_samples(), train_fraction, cli.seed)?;
            let (train_x, train_y) = table.select(&train_idx);
            let (test_x, test_y) = table.select(&test_idx);
            info!(n_train = train_idx.len(), n_test = test_idx.len(), "holdout split");

            // 2. Fit and predict
            let predicted: Vec<usize> = match model.as_str() {
                "tree" => {
                    let tree = DecisionTreeConfig::new()
                        .with_criterion(parse_criterion(&forest.criterion)?)
                        .with_max_depth(forest.max_depth)
                        .with_min_samples_leaf(forest.min_samples_leaf)
                        .with_n_classes(Some(class_names.len()))
                        .with_seed(cli.seed)
                        .fit(&train_x, &train_y)
                        .context("decision tree training failed")?;
                    info!(depth = tree.depth(), n_leaves = tree.n_leaves(), "decision tree trained");
                    test_x
                        .iter()
                        .map(|sample| tree.predict(sample))
                        .collect::<Result<_, _>>()?
                }
                "forest" => {
                    let result = forest_config(&forest, class_names.len(), cli.seed)?
                        .fit(&train_x, &train_y, &table.feature_names())
                        .context("random forest training failed")?;
                    result.forest().predict_batch(&test_x)?
                }
                other => anyhow::bail!("unknown model: {other} (expected tree or forest)"),
            };

            // 3. Score
            let acc = accuracy(&predicted, &test_y)?;
            let cm = ConfusionMatrix::from_labels(&test_y, &predicted, class_names.len())?
                .with_class_names(class_names.clone())?;
            info!(accuracy = acc, "holdout accuracy");
            info!("confusion matrix (rows: true, columns: predicted)\n{cm}");

            let writer = ResultWriter::new(&data.output_dir, experiment_name)?;
            writer.write_holdout(&HoldoutReport {
                model: &model,
                n_train: train_idx.len(),
                n_test: test_idx.len(),
                train_fraction,
                seed: cli.seed,
                accuracy: acc,
                class_names: &class_names,
                confusion_matrix: cm.as_rows(),
                class_metrics: class_scores(&cm),
            })?;

            let output = HoldoutOutput {
                experiment: data.experiment,
                model,
                n_train: train_idx.len(),
                n_test: test_idx.len(),
                accuracy: acc,
                class_names,
                confusion_matrix: cm.as_rows().to_vec(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Train { data, forest } => {
            let experiment_name = ExperimentName::new(data.experiment.clone())?;

            let table = load_table(&data)?;
            let class_names = table.classes().names().to_vec();

            let result = forest_config(&forest, class_names.len(), cli.seed)?
                .with_oob_mode(OobMode::Enabled)
                .fit(table.features(), table.labels(), &table.feature_names())
                .context("random forest training failed")?;
            let oob = result.oob_score();
            if let Some(oob) = oob {
                info!(oob_accuracy = oob.accuracy, n_oob_samples = oob.n_oob_samples, "OOB evaluation");
            }

            let writer = ResultWriter::new(&data.output_dir, experiment_name)?;
            let model_path = writer.model_path();
            let trained = result.forest().clone().with_class_names(class_names.clone())?;
            trained.save(&model_path).context("failed to save model")?;

            writer.write_training(&TrainingReport {
                n_samples: table.n_samples(),
                n_trees: trained.n_trees(),
                n_features: trained.n_features(),
                max_features: result.metadata().max_features_resolved,
                seed: cli.seed,
                class_names: &class_names,
                oob_accuracy: oob.map(|o| o.accuracy),
                n_oob_samples: oob.map(|o| o.n_oob_samples),
                feature_importances: feature_scores(result.importances()),
                model_path: model_path.display().to_string(),
            })?;

            let output = TrainOutput {
                experiment: data.experiment,
                n_samples: table.n_samples(),
                n_trees: trained.n_trees(),
                oob_accuracy: oob.map(|o| o.accuracy),
                model_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict { data, model, top_k } => {
            let experiment_name = ExperimentName::new(data.experiment.clone())?;

            // 1. Load model
            let forest = RandomForest::load(&model).context("failed to load model")?;
            info!(
                n_trees = forest.n_trees(),
                n_features = forest.n_features(),
                n_classes = forest.n_classes(),
                "model loaded"
            );

            // 2. Read catalogue; labels are optional
            let catalogue = CatalogueReader::new(&data.data, &data.class_column)
                .read()
                .context("failed to read galaxy catalogue")?;
            let features = assemble_features(&catalogue).context("failed to assemble galaxy features")?;
            let actual = match catalogue.column(&data.class_column) {
                Some(_) => Some(catalogue.text(&data.class_column)?),
                None => None,
            };

            // 3. Predict
            let distributions = forest.predict_proba_batch(&features).context("prediction failed")?;
            let classes = ClassLabels::from_names(forest.class_names().to_vec());
            let predicted: Vec<&str> = distributions
                .iter()
                .map(|d| {
                    classes
                        .name(d.predicted_class())
                        .context("model has no name for a predicted class")
                })
                .collect::<Result<_>>()?;
            let acc = actual
                .map(|labels| {
                    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
                    accuracy(&predicted, &labels)
                })
                .transpose()?;
            if let Some(acc) = acc {
                info!(accuracy = acc, "accuracy against catalogue labels");
            }

            // 4. Write predictions
            let writer = ResultWriter::new(&data.output_dir, experiment_name)?;
            writer.write_predictions(&PredictionReport {
                n_samples: features.len(),
                class_names: classes.names(),
                accuracy: acc,
                predictions: distributions
                    .iter()
                    .zip(&predicted)
                    .enumerate()
                    .map(|(row, (dist, &name))| PredictionEntry {
                        row,
                        predicted: name,
                        probabilities: dist.as_slice(),
                        top_classes: dist
                            .top_k(top_k)
                            .into_iter()
                            .filter_map(|(class, probability)| {
                                classes.name(class).map(|class| ClassProbability { class, probability })
                            })
                            .collect(),
                        actual: actual.map(|labels| labels[row].as_str()),
                    })
                    .collect(),
            })?;

            let class_counts = classes
                .names()
                .iter()
                .map(|name| (name.clone(), predicted.iter().filter(|&&p| p == name.as_str()).count()))
                .collect();
            let output = PredictOutput {
                experiment: data.experiment,
                n_samples: features.len(),
                model_n_trees: forest.n_trees(),
                class_counts,
                accuracy: acc,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn evaluate_defaults() {
        let cli = Cli::try_parse_from(["morpho", "evaluate", "--data", "galaxies.npy", "--experiment", "cv"]).unwrap();
        assert_eq!(cli.seed, 42);
        let Command::Evaluate { data, forest, cv_folds, fold_strategy, normalize } = cli.command else {
            panic!("expected evaluate");
        };
        assert_eq!(data.class_column, "class");
        assert_eq!(forest.n_trees, 50);
        assert_eq!(cv_folds, 10);
        assert_eq!(fold_strategy, "stratified");
        assert!(!normalize);
    }

    #[test]
    fn predict_lists_two_classes_by_default() {
        let cli = Cli::try_parse_from([
            "morpho", "predict", "--data", "new.csv", "--experiment", "p", "--model", "m.bin",
        ])
        .unwrap();
        let Command::Predict { top_k, model, .. } = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(top_k, 2);
        assert_eq!(model, PathBuf::from("m.bin"));
    }

    #[test]
    fn max_features_forms() {
        assert_eq!(parse_max_features("sqrt").unwrap(), MaxFeatures::Sqrt);
        assert_eq!(parse_max_features("4").unwrap(), MaxFeatures::Fixed(4));
        assert_eq!(parse_max_features("0.5").unwrap(), MaxFeatures::Fraction(0.5));
        assert!(parse_max_features("most").is_err());
    }

    #[test]
    fn unknown_names_rejected() {
        assert!(parse_criterion("mse").is_err());
        assert!(parse_split_method("histogram").is_err());
        assert!(parse_fold_strategy("grouped").is_err());
    }
}
