//! Error types for the file cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the file cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Path is empty or does not refer to an existing file
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The loader failed; the cause is carried unchanged
    #[error("Failed to load {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Filesystem metadata query failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Internal error (poisoned lock)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Builds an `InvalidInput` error for a file that does not exist.
    pub fn missing_file(path: &std::path::Path) -> Self {
        CacheError::InvalidInput(format!("File does not exist: {}", path.display()))
    }

    /// Returns the loader's original error, if this is a load failure.
    pub fn load_cause(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::Load { source, .. } => Some(source),
            _ => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the file cache.
pub type Result<T> = std::result::Result<T, CacheError>;
