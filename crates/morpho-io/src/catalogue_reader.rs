//! Galaxy catalogue reader for `.npy` structured arrays and CSV files.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{Catalogue, Column};
use crate::npy;

/// Reads a galaxy catalogue, choosing the format from the file extension.
///
/// - `.npy`: a 1-D NumPy structured array; every non-padding field becomes a column.
/// - `.csv`: a header row of column names, then one row per galaxy. The class
///   column is kept as text; every other column must parse as `f64`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::UnsupportedFormat`] | Extension is neither `npy` nor `csv` |
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::InconsistentRowLength`] | CSV row has a different column count than the header |
/// | [`IoError::NonNumericValue`] | CSV cell outside the class column is not a float |
/// | [`IoError::EmptyDataset`] | Zero data rows |
/// | `IoError::Npy*` | Malformed or unsupported `.npy` file |
pub struct CatalogueReader {
    path: PathBuf,
    class_column: String,
}

impl CatalogueReader {
    /// Create a reader for `path` whose labels live in `class_column`.
    pub fn new(path: &Path, class_column: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            class_column: class_column.to_string(),
        }
    }

    /// Read the catalogue.
    pub fn read(&self) -> Result<Catalogue, IoError> {
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("npy") => npy::read(&self.path),
            Some("csv") => self.read_csv(),
            _ => Err(IoError::UnsupportedFormat {
                path: self.path.clone(),
            }),
        }
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn read_csv(&self) -> Result<Catalogue, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets our own InconsistentRowLength check fire instead
        // of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let names: Vec<String> = rdr
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(String::from)
            .collect();
        let class_index = names.iter().position(|n| *n == self.class_column);
        debug!(n_columns = names.len(), has_class = class_index.is_some(), "read CSV header");

        let mut numeric: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
        let mut text: Vec<String> = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != names.len() {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: names.len(),
                    got: record.len(),
                });
            }
            for (col_index, raw) in record.iter().enumerate() {
                if Some(col_index) == class_index {
                    text.push(raw.to_string());
                    continue;
                }
                let value: f64 = raw.parse().map_err(|_| IoError::NonNumericValue {
                    path: self.path.clone(),
                    row_index,
                    column: names[col_index].clone(),
                    raw: raw.to_string(),
                })?;
                numeric[col_index].push(value);
            }
        }

        let columns: Vec<Column> = numeric
            .into_iter()
            .enumerate()
            .map(|(i, values)| {
                if Some(i) == class_index {
                    Column::Text(std::mem::take(&mut text))
                } else {
                    Column::Numeric(values)
                }
            })
            .collect();

        let catalogue = Catalogue::new(&self.path, names, columns);
        if catalogue.n_rows() == 0 {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        info!(n_rows = catalogue.n_rows(), "CSV catalogue loaded");
        Ok(catalogue)
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_valid_catalogue() {
        let f = write_csv("u-g,ecc,class\n1.5,0.3,spiral\n2.1, 0.8 ,elliptical\n");
        let cat = CatalogueReader::new(f.path(), "class").read().unwrap();
        assert_eq!(cat.n_rows(), 2);
        assert_eq!(cat.column_names(), &["u-g", "ecc", "class"]);
        assert_eq!(cat.numeric("ecc").unwrap(), &[0.3, 0.8]);
        assert_eq!(cat.text("class").unwrap(), &["spiral", "elliptical"]);
    }

    #[test]
    fn unlabelled_catalogue_is_all_numeric() {
        let f = write_csv("u-g,ecc\n1.5,0.3\n");
        let cat = CatalogueReader::new(f.path(), "class").read().unwrap();
        assert!(matches!(cat.text("class").unwrap_err(), IoError::MissingColumn { .. }));
    }

    #[test]
    fn custom_class_column() {
        let f = write_csv("morphology,ecc\nmerger,0.3\n");
        let cat = CatalogueReader::new(f.path(), "morphology").read().unwrap();
        assert_eq!(cat.text("morphology").unwrap(), &["merger"]);
    }

    #[test]
    fn empty_dataset_error() {
        let f = write_csv("u-g,class\n");
        let err = CatalogueReader::new(f.path(), "class").read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn inconsistent_row_length_error() {
        let f = write_csv("u-g,ecc,class\n1.0,0.5,spiral\n2.0,merger\n");
        let err = CatalogueReader::new(f.path(), "class").read().unwrap_err();
        assert!(matches!(err, IoError::InconsistentRowLength { row_index: 1, .. }));
    }

    #[test]
    fn non_numeric_value_error() {
        let f = write_csv("u-g,class\nabc,spiral\n");
        let err = CatalogueReader::new(f.path(), "class").read().unwrap_err();
        assert!(matches!(err, IoError::NonNumericValue { ref column, .. } if column == "u-g"));
    }

    #[test]
    fn unsupported_extension() {
        let f = tempfile::Builder::new().suffix(".fits").tempfile().unwrap();
        let err = CatalogueReader::new(f.path(), "class").read().unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFormat { .. }));
    }

    #[test]
    fn missing_file() {
        let err = CatalogueReader::new(Path::new("/nonexistent/galaxies.npy"), "class")
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
