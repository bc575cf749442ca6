//! Domain types for morpho-io.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One catalogue column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Floats, integers and booleans, widened to `f64`.
    Numeric(Vec<f64>),
    /// String fields.
    Text(Vec<String>),
}

impl Column {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Text(values) => values.len(),
        }
    }

    /// Whether the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Column::Numeric(_) => "numeric",
            Column::Text(_) => "text",
        }
    }
}

/// A table of named, equal-length columns read from a `.npy` or `.csv` file.
///
/// Produced by [`CatalogueReader`](crate::CatalogueReader). Column order
/// follows the file.
#[derive(Debug)]
pub struct Catalogue {
    source: PathBuf,
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
}

impl Catalogue {
    pub(crate) fn new(source: &Path, names: Vec<String>, columns: Vec<Column>) -> Self {
        debug_assert_eq!(names.len(), columns.len());
        let n_rows = columns.first().map_or(0, Column::len);
        debug_assert!(columns.iter().all(|c| c.len() == n_rows), "columns must have equal length");
        Self {
            source: source.to_path_buf(),
            names,
            columns,
            n_rows,
        }
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names.iter().position(|n| n == name).map(|i| &self.columns[i])
    }

    /// Borrow a numeric column.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::MissingColumn`] | no column has this name |
    /// | [`IoError::WrongColumnKind`] | the column holds text |
    pub fn numeric(&self, name: &str) -> Result<&[f64], IoError> {
        match self.require(name)? {
            Column::Numeric(values) => Ok(values),
            other => Err(self.wrong_kind(name, "numeric", other)),
        }
    }

    /// Borrow a text column.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::MissingColumn`] | no column has this name |
    /// | [`IoError::WrongColumnKind`] | the column holds numbers |
    pub fn text(&self, name: &str) -> Result<&[String], IoError> {
        match self.require(name)? {
            Column::Text(values) => Ok(values),
            other => Err(self.wrong_kind(name, "text", other)),
        }
    }

    /// Return the column names in file order.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Return the file this catalogue was read from.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    fn require(&self, name: &str) -> Result<&Column, IoError> {
        self.column(name).ok_or_else(|| IoError::MissingColumn {
            path: self.source.clone(),
            column: name.to_string(),
        })
    }

    fn wrong_kind(&self, name: &str, expected: &'static str, found: &Column) -> IoError {
        IoError::WrongColumnKind {
            path: self.source.clone(),
            column: name.to_string(),
            expected,
            found: found.kind(),
        }
    }
}

/// The class vocabulary: distinct label strings in sorted order.
///
/// A label's encoded value is its index here, so the vocabulary also fixes
/// the row and column order of confusion matrices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    /// Build the vocabulary from raw values and encode them.
    #[must_use]
    pub fn encode_all(values: &[String]) -> (Self, Vec<usize>) {
        let names: Vec<String> = values
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect();
        let labels = Self { names };
        let encoded = values
            .iter()
            .map(|v| labels.encode(v).unwrap_or_default())
            .collect();
        (labels, encoded)
    }

    /// Wrap an existing vocabulary, for example the class names stored with a model.
    #[must_use]
    pub fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Index of `value`, if it is in the vocabulary.
    #[must_use]
    pub fn encode(&self, value: &str) -> Option<usize> {
        self.names.iter().position(|n| n == value)
    }

    /// Name of class `index`.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Return the class names in index order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the vocabulary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
