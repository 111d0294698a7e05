//! Error types for the normalization engine
//!
//! Configuration problems are fatal and surface before any record is
//! touched. Per-record anomalies never become an `Error`; they resolve
//! through the fallback of the stage that meets them.

use std::path::PathBuf;

use thiserror::Error;

/// docnorm error types
#[derive(Debug, Error)]
pub enum Error {
    /// Field schema names the same field more than once
    #[error("Schema error: field '{0}' is listed more than once")]
    DuplicateField(String),

    /// A dynamic rule is malformed (unknown operator, wrong operand type)
    #[error("Rule error in field '{field}', rule #{index}: {message}")]
    InvalidRule {
        field: String,
        index: usize,
        message: String,
    },

    /// A `$regex` operand does not compile
    #[error("Rule error in field '{field}', rule #{index}: invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        field: String,
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Grouping specification entry is neither a field name nor a nested level
    #[error("Grouping error at '{path}': {message}")]
    InvalidGrouping { path: String, message: String },

    /// Input document does not have a supported dataset shape
    #[error("Input error: {0}")]
    InvalidInput(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// True for errors caused by the supplied configuration (schema, rules,
    /// grouping) rather than by reading or decoding files.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::DuplicateField(_)
                | Error::InvalidRule { .. }
                | Error::InvalidPattern { .. }
                | Error::InvalidGrouping { .. }
        )
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for docnorm operations
pub type Result<T> = std::result::Result<T, Error>;
