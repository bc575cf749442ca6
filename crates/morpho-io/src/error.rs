//! I/O error types for morpho-io.

use std::path::PathBuf;

/// Errors from catalogue reading, feature assembly and result output.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the input has an extension other than `.npy` or `.csv`.
    #[error("unsupported catalogue format for {path}: expected a .npy or .csv file")]
    UnsupportedFormat {
        /// Path to the input file.
        path: PathBuf,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the catalogue has zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the catalogue.
        path: PathBuf,
    },

    /// Returned when a CSV data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a CSV cell in a numeric column does not parse as a float.
    #[error("non-numeric value in {path}: row {row_index}, column \"{column}\", raw value \"{raw}\"")]
    NonNumericValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Column name.
        column: String,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a `.npy` file does not start with the NumPy magic string.
    #[error("not a NumPy array file: {path}")]
    NpyMagic {
        /// Path to the file.
        path: PathBuf,
    },

    /// Returned when the `.npy` format version is not 1.0, 2.0 or 3.0.
    #[error("unsupported NumPy format version {major}.{minor} in {path}")]
    NpyVersion {
        /// Path to the file.
        path: PathBuf,
        /// Major version byte.
        major: u8,
        /// Minor version byte.
        minor: u8,
    },

    /// Returned when the `.npy` header dictionary cannot be parsed.
    #[error("malformed NumPy header in {path}: {reason}")]
    NpyHeader {
        /// Path to the file.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },

    /// Returned when a field uses a dtype the reader does not decode.
    #[error("unsupported dtype \"{descr}\" for field \"{field}\" in {path}")]
    NpyDtype {
        /// Path to the file.
        path: PathBuf,
        /// Field name.
        field: String,
        /// The dtype string.
        descr: String,
    },

    /// Returned when the array is stored in Fortran order.
    #[error("Fortran-ordered arrays are not supported: {path}")]
    NpyFortranOrder {
        /// Path to the file.
        path: PathBuf,
    },

    /// Returned when the array is not one-dimensional.
    #[error("expected a 1-D structured array in {path}, found shape {shape:?}")]
    NpyShape {
        /// Path to the file.
        path: PathBuf,
        /// Declared shape.
        shape: Vec<usize>,
    },

    /// Returned when the payload is shorter than the header declares.
    #[error("truncated NumPy payload in {path}: expected {expected} bytes, found {got}")]
    NpyTruncated {
        /// Path to the file.
        path: PathBuf,
        /// Bytes the header implies.
        expected: usize,
        /// Bytes present.
        got: usize,
    },

    /// Returned when a string field holds an invalid code point or byte sequence.
    #[error("invalid text in field \"{field}\" at row {row_index} of {path}")]
    NpyText {
        /// Path to the file.
        path: PathBuf,
        /// Field name.
        field: String,
        /// Zero-based record index.
        row_index: usize,
    },

    /// Returned when a required column is absent from the catalogue.
    #[error("missing column \"{column}\" in {path}")]
    MissingColumn {
        /// Path to the catalogue.
        path: PathBuf,
        /// Column name.
        column: String,
    },

    /// Returned when a column holds text where numbers are needed, or vice versa.
    #[error("column \"{column}\" in {path} is {found}, expected {expected}")]
    WrongColumnKind {
        /// Path to the catalogue.
        path: PathBuf,
        /// Column name.
        column: String,
        /// Expected kind.
        expected: &'static str,
        /// Actual kind.
        found: &'static str,
    },

    /// Returned when an assembled feature is NaN or infinite.
    #[error("non-finite feature \"{feature}\" at row {row_index} of {path}: {value}")]
    NonFiniteFeature {
        /// Path to the catalogue.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
        /// Feature name.
        feature: &'static str,
        /// The offending value.
        value: f64,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result artifact cannot be encoded as JSON.
    #[error("cannot encode {path} as JSON")]
    Json {
        /// Target path.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the heatmap cannot be drawn.
    #[error("cannot render plot {path}: {message}")]
    Plot {
        /// Target path.
        path: PathBuf,
        /// Backend error text.
        message: String,
    },
}
