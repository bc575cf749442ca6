//! Assembly of the fixed galaxy feature matrix from a catalogue.

use tracing::{debug, instrument};

use crate::IoError;
use crate::domain::{Catalogue, ClassLabels};

/// Names of the assembled feature columns, in matrix order.
pub const FEATURE_NAMES: [&str; 13] = [
    "u-g", "g-r", "r-i", "i-z", "ecc", "m4_u", "m4_g", "m4_r", "m4_i", "m4_z", "conc_u", "conc_r", "conc_z",
];

/// How one feature is computed from catalogue columns.
enum Recipe {
    Column(&'static str),
    Ratio(&'static str, &'static str),
}

const RECIPES: [Recipe; 13] = [
    Recipe::Column("u-g"),
    Recipe::Column("g-r"),
    Recipe::Column("r-i"),
    Recipe::Column("i-z"),
    Recipe::Column("ecc"),
    Recipe::Column("m4_u"),
    Recipe::Column("m4_g"),
    Recipe::Column("m4_r"),
    Recipe::Column("m4_i"),
    Recipe::Column("m4_z"),
    Recipe::Ratio("petroR50_u", "petroR90_u"),
    Recipe::Ratio("petroR50_r", "petroR90_r"),
    Recipe::Ratio("petroR50_z", "petroR90_z"),
];

/// Build the row-major feature matrix (`n_rows × 13`).
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::MissingColumn`] | a source column is absent |
/// | [`IoError::WrongColumnKind`] | a source column holds text |
/// | [`IoError::NonFiniteFeature`] | a value is NaN or infinite, e.g. a zero `petroR90_*` |
#[instrument(skip_all, fields(n_rows = catalogue.n_rows()))]
pub fn assemble_features(catalogue: &Catalogue) -> Result<Vec<Vec<f64>>, IoError> {
    let columns: Vec<Vec<f64>> = RECIPES
        .iter()
        .map(|recipe| -> Result<Vec<f64>, IoError> {
            match recipe {
                Recipe::Column(name) => Ok(catalogue.numeric(name)?.to_vec()),
                Recipe::Ratio(num, den) => {
                    let num = catalogue.numeric(num)?;
                    let den = catalogue.numeric(den)?;
                    Ok(num.iter().zip(den).map(|(n, d)| n / d).collect())
                }
            }
        })
        .collect::<Result<_, _>>()?;

    let mut rows = vec![Vec::with_capacity(FEATURE_NAMES.len()); catalogue.n_rows()];
    for (&feature, column) in FEATURE_NAMES.iter().zip(&columns) {
        for (row_index, (row, &value)) in rows.iter_mut().zip(column).enumerate() {
            if !value.is_finite() {
                return Err(IoError::NonFiniteFeature {
                    path: catalogue.source().to_path_buf(),
                    row_index,
                    feature,
                    value,
                });
            }
            row.push(value);
        }
    }
    debug!(n_features = FEATURE_NAMES.len(), "feature matrix assembled");
    Ok(rows)
}

/// A labelled feature matrix ready for training or cross-validation.
#[derive(Debug)]
pub struct FeatureTable {
    features: Vec<Vec<f64>>,
    labels: Vec<usize>,
    classes: ClassLabels,
}

impl FeatureTable {
    /// Assemble features and encode the labels found in `class_column`.
    ///
    /// # Errors
    ///
    /// Everything [`assemble_features`] returns, plus [`IoError::MissingColumn`]
    /// or [`IoError::WrongColumnKind`] for the class column.
    pub fn from_catalogue(catalogue: &Catalogue, class_column: &str) -> Result<Self, IoError> {
        let raw = catalogue.text(class_column)?;
        let features = assemble_features(catalogue)?;
        let (classes, labels) = ClassLabels::encode_all(raw);
        debug!(n_classes = classes.len(), classes = ?classes.names(), "labels encoded");
        Ok(Self {
            features,
            labels,
            classes,
        })
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the encoded labels.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Return the class vocabulary.
    #[must_use]
    pub fn classes(&self) -> &ClassLabels {
        &self.classes
    }

    /// Return the feature names as owned strings.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect()
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Split into the rows at `indices`, keeping the full class vocabulary.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> (Vec<Vec<f64>>, Vec<usize>) {
        (
            indices.iter().map(|&i| self.features[i].clone()).collect(),
            indices.iter().map(|&i| self.labels[i]).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::domain::Column;

    const SOURCE_COLUMNS: [&str; 16] = [
        "u-g", "g-r", "r-i", "i-z", "ecc", "m4_u", "m4_g", "m4_r", "m4_i", "m4_z", "petroR50_u", "petroR50_r",
        "petroR50_z", "petroR90_u", "petroR90_r", "petroR90_z",
    ];

    fn catalogue(petro_r90_r: f64) -> Catalogue {
        let mut names: Vec<String> = SOURCE_COLUMNS.iter().map(|s| (*s).to_string()).collect();
        let mut columns: Vec<Column> = SOURCE_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, name)| match *name {
                "petroR90_r" => Column::Numeric(vec![petro_r90_r, 4.0]),
                n if n.starts_with("petroR90") => Column::Numeric(vec![4.0, 4.0]),
                _ => Column::Numeric(vec![i as f64, i as f64 + 0.5]),
            })
            .collect();
        names.push("class".into());
        columns.push(Column::Text(vec!["spiral".into(), "elliptical".into()]));
        Catalogue::new(Path::new("test.npy"), names, columns)
    }

    #[test]
    fn assembles_columns_in_order() {
        let rows = assemble_features(&catalogue(4.0)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 13);
        assert_eq!(&rows[0][..10], &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        // petroR50_u = 10, petroR90_u = 4
        assert!((rows[0][10] - 2.5).abs() < 1e-12);
        assert!((rows[1][12] - 12.5 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn zero_radius_is_non_finite() {
        let err = assemble_features(&catalogue(0.0)).unwrap_err();
        assert!(matches!(
            err,
            IoError::NonFiniteFeature { row_index: 0, feature: "conc_r", .. }
        ));
    }

    #[test]
    fn table_encodes_sorted_labels() {
        let table = FeatureTable::from_catalogue(&catalogue(4.0), "class").unwrap();
        assert_eq!(table.labels(), &[1, 0]);
        assert_eq!(table.classes().names(), &["elliptical", "spiral"]);
        assert_eq!(table.feature_names().len(), 13);

        let (x, y) = table.select(&[1]);
        assert_eq!(y, vec![0]);
        assert_eq!(x[0][0], 0.5);
    }

    #[test]
    fn missing_source_column() {
        let cat = Catalogue::new(
            Path::new("thin.csv"),
            vec!["u-g".into(), "class".into()],
            vec![Column::Numeric(vec![1.0]), Column::Text(vec!["merger".into()])],
        );
        let err = FeatureTable::from_catalogue(&cat, "class").unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { ref column, .. } if column == "g-r"));
    }
}
