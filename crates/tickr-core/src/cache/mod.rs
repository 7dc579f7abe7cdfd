//! Offline snapshot cache
//!
//! Holds the last known todo list per user so the client can show something
//! while the backend is unreachable. Snapshots are only ever replaced
//! wholesale: on every successful online fetch and on every offline mutation.

pub mod error;
pub mod file;

use std::collections::HashMap;

use crate::models::Todo;

pub use error::{CacheError, CacheResult};
pub use file::FileCache;

/// Per-user snapshot storage
pub trait TodoCache {
    /// Read the snapshot for a user, `None` if nothing was cached yet
    fn load(&self, user_id: &str) -> CacheResult<Option<Vec<Todo>>>;

    /// Replace the snapshot for a user
    fn store(&mut self, user_id: &str, todos: &[Todo]) -> CacheResult<()>;

    /// Drop the snapshot for a user
    fn clear(&mut self, user_id: &str) -> CacheResult<()>;
}

/// In-memory cache, for tests and ephemeral sessions
#[derive(Debug, Default, Clone)]
pub struct MemoryCache {
    snapshots: HashMap<String, Vec<Todo>>,
    writes: usize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `store` calls so far
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl TodoCache for MemoryCache {
    fn load(&self, user_id: &str) -> CacheResult<Option<Vec<Todo>>> {
        Ok(self.snapshots.get(user_id).cloned())
    }

    fn store(&mut self, user_id: &str, todos: &[Todo]) -> CacheResult<()> {
        self.snapshots.insert(user_id.to_string(), todos.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn clear(&mut self, user_id: &str) -> CacheResult<()> {
        self.snapshots.remove(user_id);
        Ok(())
    }
}
