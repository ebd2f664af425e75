//! Error types for airalert-store.

use std::path::PathBuf;

/// Result type for airalert-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in airalert-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to create the directory holding the state file.
    #[error("Failed to create state directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read the state file.
    #[error("Failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the state file.
    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The state file is not a valid snapshot.
    #[error("Corrupt state file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
