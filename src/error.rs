//! Error types for container conversion
//!
//! Every storage, import and export operation reports a [`PtimerError`].
//! All of them are terminal for the operation in progress; nothing here is
//! retried.

use std::path::PathBuf;

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Main error type for container operations
#[derive(Error, Debug)]
pub enum PtimerError {
    /// JSON syntax or schema violation in a descriptor
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Duplicate step index, empty required field, dangling reference, ...
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A record the container must hold is absent
    #[error("Missing record: {0}")]
    MissingRecord(String),

    /// An asset path resolves outside of its permitted root
    #[error("Path traversal: {} escapes {}", path.display(), root.display())]
    PathTraversal { root: PathBuf, path: PathBuf },

    /// Filesystem failure, with what was being processed
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A stored row that cannot be decoded into the model
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Any other storage failure
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, PtimerError>;

impl PtimerError {
    /// Wrap an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }
}

impl From<sqlx::Error> for PtimerError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation
                | ErrorKind::ForeignKeyViolation => {
                    return Self::ConstraintViolation(db_err.message().to_string());
                }
                _ => {}
            }
        }
        Self::Database(err)
    }
}

impl From<serde_json::Error> for PtimerError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedInput(err.to_string())
    }
}
