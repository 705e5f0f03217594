//! Error types for persistence operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing persisted state.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to create a directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryError {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write {path}: {source}")]
    WriteError {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize data.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested item does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of item.
        kind: String,
        /// Item id.
        id: String,
    },
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
