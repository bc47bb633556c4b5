//! Error types for limpiar.

use std::path::PathBuf;

/// Result type alias for limpiar operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in limpiar operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// The path where the error occurred, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A raw input file is missing or unreadable.
    ///
    /// Distinct from [`Error::Io`] so callers can isolate a per-domain
    /// failure (skip that domain, keep running the others) without string
    /// matching on the message.
    #[error("source unavailable at {path}: {source}")]
    SourceUnavailable {
        /// Path of the raw input that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Arrow error during data processing.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// SQLite error during warehouse operations.
    #[error("warehouse error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Column not found in the record set.
    #[error("Column '{name}' not found in record set")]
    ColumnNotFound {
        /// The name of the missing column.
        name: String,
    },

    /// A column exists but its type does not support the requested
    /// operation.
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        /// Description of the schema mismatch.
        message: String,
    },

    /// Transform error.
    #[error("Transform error: {message}")]
    Transform {
        /// Description of the transform error.
        message: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Post-cleaning sanity check failed: the pipeline's own guarantees
    /// were not met. A programming-contract failure; callers abort.
    #[error("consistency check failed: {nulls} null value(s), {duplicates} duplicate row(s) remain")]
    ConsistencyCheck {
        /// Total null values remaining across all columns.
        nulls: usize,
        /// Duplicate rows remaining.
        duplicates: usize,
    },
}

impl Error {
    /// Create an I/O error with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Create a source-unavailable error for a raw input path.
    pub fn source_unavailable(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Create a column not found error.
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create a transform error.
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
