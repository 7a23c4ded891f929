//! Error types for the population pyramid tool.

use std::io;
use thiserror::Error;

/// Result type alias for pyramid operations.
pub type Result<T> = std::result::Result<T, PyramidError>;

/// Errors that can occur between upload and export.
#[derive(Error, Debug)]
pub enum PyramidError {
    /// I/O error while reading a spreadsheet from disk.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The uploaded file could not be read as a spreadsheet.
    #[error("Failed to load spreadsheet: {0}")]
    Load(String),

    /// One or more of the configured columns is absent from the header row.
    #[error(
        "Required columns not found ({}). The file must contain: {}",
        missing.join(", "),
        required.join(", ")
    )]
    MissingColumns {
        required: Vec<String>,
        missing: Vec<String>,
    },

    /// A value column holds text that is not a number.
    #[error("Column '{column}', row {row}: '{value}' is not a number")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },

    /// A value is too large for the percentage axis.
    #[error(
        "Value {value} is too large for a percentage axis (values must stay below {limit}); \
         the file may hold counts instead of percentages"
    )]
    TooLarge { value: f64, limit: i64 },

    /// A chart or export option is outside its accepted range.
    #[error("Invalid option '{field}': {reason}")]
    InvalidOption { field: &'static str, reason: String },

    /// Drawing the chart failed.
    #[error("Render error: {0}")]
    Render(String),

    /// Encoding the chart to an output format failed.
    #[error("Export error: {0}")]
    Export(String),
}

impl PyramidError {
    /// Whether the error was caused by the user's file or form input
    /// rather than by the renderer.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PyramidError::Load(_)
                | PyramidError::MissingColumns { .. }
                | PyramidError::NotNumeric { .. }
                | PyramidError::TooLarge { .. }
                | PyramidError::InvalidOption { .. }
        )
    }
}

impl From<calamine::Error> for PyramidError {
    fn from(err: calamine::Error) -> Self {
        PyramidError::Load(err.to_string())
    }
}

impl From<csv::Error> for PyramidError {
    fn from(err: csv::Error) -> Self {
        PyramidError::Load(format!("Malformed CSV: {}", err))
    }
}

impl From<rust_xlsxwriter::XlsxError> for PyramidError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        PyramidError::Export(err.to_string())
    }
}
