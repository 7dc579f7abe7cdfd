//! Cache errors

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from reading or writing an offline snapshot
#[derive(Error, Debug)]
pub enum CacheError {
    /// Snapshot exists but could not be read
    #[error("Failed to read offline snapshot '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Snapshot (or its directory) could not be written or removed
    #[error("Failed to write offline snapshot '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Snapshot exists but is not a valid list
    #[error("Offline snapshot at '{path}' is corrupted: {details}")]
    Corrupt { path: PathBuf, details: String },

    /// List could not be encoded
    #[error("Failed to encode offline snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CacheError {
    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        CacheError::WriteError {
            path: path.to_path_buf(),
            source,
        }
    }

    /// File the error refers to, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            CacheError::ReadError { path, .. }
            | CacheError::WriteError { path, .. }
            | CacheError::Corrupt { path, .. } => Some(path),
            CacheError::Serialize(_) => None,
        }
    }

    /// What the user can do about it
    ///
    /// A corrupt snapshot is disposable: the next online fetch rewrites it.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            CacheError::Corrupt { .. } => {
                Some("Delete the snapshot file; it is rebuilt on the next online fetch.")
            }
            CacheError::ReadError { source, .. } | CacheError::WriteError { source, .. }
                if source.kind() == io::ErrorKind::PermissionDenied =>
            {
                Some("Check file and directory permissions on the tickr data directory.")
            }
            _ => None,
        }
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
