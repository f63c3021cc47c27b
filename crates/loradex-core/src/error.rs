//! Error types for Loradex operations.
//!
//! This module provides the common `Error` type and `Result<T>` alias used
//! across all Loradex crates. Uses `thiserror` for derive macros.
//!
//! The variants mirror the failure classes callers are expected to tell
//! apart: caller mistakes ([`Error::Validation`], [`Error::Schema`],
//! [`Error::TypeCoercion`]), lookups that miss ([`Error::NotFound`],
//! [`Error::UnknownColumn`]), snapshot problems ([`Error::FileNotFound`],
//! [`Error::Format`]), the non-recoverable [`Error::Corruption`], and
//! failures raised by an external scorer ([`Error::Scorer`]).

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Boxed error raised by an external collaborator (e.g. a scorer).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in Loradex operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with the path that caused it.
    #[error("I/O error at {path}: {source}")]
    IoWithPath {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed caller input (empty query, bad top_k, bad vector, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A row is missing the key column or a required column.
    #[error("Schema error: row is missing required column '{column}'")]
    Schema {
        /// Name of the missing column.
        column: String,
    },

    /// A field cannot be coerced to its canonical type.
    #[error("Type coercion error: {0}")]
    TypeCoercion(String),

    /// More than one stored row shares a key.
    #[error("Store corruption: multiple rows with {column}={key} ({count} rows)")]
    Corruption {
        /// Key column name.
        column: String,
        /// Duplicated key value.
        key: String,
        /// Number of rows sharing the key.
        count: usize,
    },

    /// Lookup with no match.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lookup by a column the table does not have.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Snapshot path does not exist.
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// Snapshot has the wrong extension or an unreadable layout.
    #[error("Format error: {0}")]
    Format(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failure raised by the external scoring contract, passed through as-is.
    #[error(transparent)]
    Scorer(BoxError),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a schema error for a missing column.
    pub fn schema(column: impl Into<String>) -> Self {
        Self::Schema {
            column: column.into(),
        }
    }

    /// Create a type coercion error.
    pub fn type_coercion(msg: impl Into<String>) -> Self {
        Self::TypeCoercion(msg.into())
    }

    /// Create a corruption error for a duplicated key.
    pub fn corruption(column: impl Into<String>, key: impl ToString, count: usize) -> Self {
        Self::Corruption {
            column: column.into(),
            key: key.to_string(),
            count,
        }
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an unknown column error.
    pub fn unknown_column(column: impl Into<String>) -> Self {
        Self::UnknownColumn(column.into())
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl AsRef<Path>) -> Self {
        Self::FileNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Wrap an I/O error together with the path being accessed.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::IoWithPath {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Pass a scorer failure through without re-wrapping its message.
    pub fn scorer(source: impl Into<BoxError>) -> Self {
        Self::Scorer(source.into())
    }

    /// Whether this is a key-uniqueness violation.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption { .. })
    }

    /// Whether this is an ordinary lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this is a caller-input validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether this error came from the external scorer.
    pub fn is_scorer(&self) -> bool {
        matches!(self, Self::Scorer(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type alias using Loradex's Error type.
pub type Result<T> = std::result::Result<T, Error>;
