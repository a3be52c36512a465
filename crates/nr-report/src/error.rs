//! Error types for report transformation and rendering.

use thiserror::Error;

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors that can occur while transforming or writing a report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Table shape violation (duplicate label, length mismatch).
    #[error("table error: {0}")]
    Table(#[from] nr_common::TableError),

    /// A timestamp column held a value no known pattern matches.
    #[error("column '{column}': cannot parse '{value}' as a timestamp")]
    UnparseableTimestamp { column: String, value: String },

    /// A value of the wrong type for the step that visited it.
    #[error("column '{column}': unsupported value '{value}'")]
    UnsupportedValue { column: String, value: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
