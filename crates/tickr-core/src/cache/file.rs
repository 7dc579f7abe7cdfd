//! File-backed offline snapshots
//!
//! One JSON file per user under `<data_dir>/cache/`, always replaced
//! wholesale. Uses atomic writes (write to temp file, then rename) so a crash
//! mid-write never leaves a half-written snapshot.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{CacheError, CacheResult};
use super::TodoCache;
use crate::config::Config;
use crate::models::Todo;

/// Snapshot file name prefix
const STORAGE_KEY: &str = "offline_todos";

/// Offline snapshot store on the local filesystem
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Create a cache rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create a cache in the configured data directory
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_dir())
    }

    /// Directory holding snapshot files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot path for a user
    pub fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", STORAGE_KEY, sanitize_key(user_id)))
    }
}

impl TodoCache for FileCache {
    fn load(&self, user_id: &str) -> CacheResult<Option<Vec<Todo>>> {
        let path = self.path_for(user_id);

        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::ReadError { path, source }),
        };

        let todos = serde_json::from_slice(&bytes).map_err(|e| CacheError::Corrupt {
            path: path.clone(),
            details: e.to_string(),
        })?;

        debug!("Loaded offline snapshot from {:?}", path);
        Ok(Some(todos))
    }

    fn store(&mut self, user_id: &str, todos: &[Todo]) -> CacheResult<()> {
        let path = self.path_for(user_id);
        let bytes = serde_json::to_vec(todos)?;
        atomic_write(&path, &bytes)?;
        debug!("Wrote {} item(s) to {:?}", todos.len(), path);
        Ok(())
    }

    fn clear(&mut self, user_id: &str) -> CacheResult<()> {
        let path = self.path_for(user_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::write(&path, e)),
        }
    }
}

/// Keep user ids safe for use as a file name
fn sanitize_key(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> CacheResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CacheError::write(parent, e))?;
    }

    let temp_path = path.with_extension("tmp");
    let written = File::create(&temp_path).and_then(|mut file| {
        file.write_all(data)?;
        // Sync to disk before rename
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(CacheError::write(&temp_path, e));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        CacheError::write(path, e)
    })
}
