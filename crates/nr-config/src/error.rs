//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while locating, loading, or validating config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found (searched: {searched})")]
    NotFound { searched: String },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
