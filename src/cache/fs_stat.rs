//! Filesystem queries
//!
//! The two questions the cache asks of the filesystem: does the file exist,
//! and when was it last modified. A path is absent when it is not found or
//! when one of its parents is no longer a directory. Any other I/O failure
//! is reported, never folded into a miss.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::{CacheError, Result};

/// Returns the file's modification time, or None if it does not exist.
pub fn modified_time(path: &Path) -> Result<Option<DateTime<Utc>>> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if is_absent(&e) => return Ok(None),
        Err(source) => return Err(io_error(path, source)),
    };
    let modified = metadata.modified().map_err(|source| io_error(path, source))?;
    Ok(Some(DateTime::<Utc>::from(modified)))
}

/// Returns the modification time of a file that must exist.
pub fn require_modified_time(path: &Path) -> Result<DateTime<Utc>> {
    validate_path(path)?;
    modified_time(path)?.ok_or_else(|| CacheError::missing_file(path))
}

/// Returns whether `path` still refers to something on disk.
pub fn exists(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if is_absent(&e) => Ok(false),
        Err(source) => Err(io_error(path, source)),
    }
}

/// True if the file still carries `modified_at`. Any failure counts as changed.
pub fn unchanged_since(path: &Path, modified_at: DateTime<Utc>) -> bool {
    matches!(modified_time(path), Ok(Some(current)) if current == modified_at)
}

/// Rejects the empty path.
pub fn validate_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(CacheError::InvalidInput("Path must not be empty".to_string()));
    }
    Ok(())
}

fn is_absent(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

fn io_error(path: &Path, source: io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}
