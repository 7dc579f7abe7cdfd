//! Sync controller
//!
//! Owns the current user's list and decides, per operation, whether to talk
//! to the remote store or fall back to the local snapshot.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::live::LiveList;
use super::{Outcome, ValidationError};
use crate::cache::TodoCache;
use crate::models::{is_placeholder_id, Filter, NewTodo, Todo, TodoPatch, TodoStats};
use crate::remote::{ChangeEvent, Order, Query, RemoteError, RemoteStore, RowFilter, Subscription};

/// Column holding the owning user id
const OWNER_COLUMN: &str = "user_id";

/// Keeps one user's todo list consistent with the remote store
pub struct SyncController<R, C> {
    remote: R,
    cache: C,
    user_id: String,
    online: watch::Receiver<bool>,
    list: LiveList,
    loading: bool,
}

impl<R: RemoteStore, C: TodoCache> SyncController<R, C> {
    /// Create a controller for one user
    ///
    /// `online` is the receiving end of the connectivity signal; the
    /// controller reads it before every operation.
    pub fn new(
        remote: R,
        cache: C,
        user_id: impl Into<String>,
        online: watch::Receiver<bool>,
    ) -> Self {
        Self {
            remote,
            cache,
            user_id: user_id.into(),
            online,
            list: LiveList::new(),
            loading: true,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// True until the first fetch has resolved
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Current list, newest first
    pub fn todos(&self) -> &[Todo] {
        self.list.items()
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.list.get(id)
    }

    pub fn filtered(&self, filter: Filter) -> Vec<&Todo> {
        self.list
            .items()
            .iter()
            .filter(|t| filter.matches(t))
            .collect()
    }

    pub fn stats(&self) -> TodoStats {
        TodoStats::from_todos(self.list.items())
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    fn owner_filter(&self) -> RowFilter {
        RowFilter::eq(OWNER_COLUMN, &self.user_id)
    }

    /// Reload the list
    ///
    /// Offline, the cached snapshot replaces the list (empty if there is
    /// none). Online, the remote rows replace both the list and the
    /// snapshot. Failures are logged and leave the list untouched.
    pub async fn fetch(&mut self) -> Outcome {
        let outcome = if self.is_online() {
            self.fetch_remote().await
        } else {
            self.load_snapshot()
        };
        self.loading = false;
        outcome
    }

    async fn fetch_remote(&mut self) -> Outcome {
        let query = Query::new(self.owner_filter()).order(Order::desc("created_at"));
        match self.remote.select(&query).await {
            Ok(rows) => {
                info!("Fetched {} todo(s) for {}", rows.len(), self.user_id);
                self.list.replace_all(rows);
                self.save_snapshot();
                Outcome::Synced
            }
            Err(e) => {
                warn!("Failed to fetch todos: {}", e);
                Outcome::Failed
            }
        }
    }

    fn load_snapshot(&mut self) -> Outcome {
        match self.cache.load(&self.user_id) {
            Ok(snapshot) => {
                let items = snapshot.unwrap_or_default();
                debug!("Loaded {} cached todo(s)", items.len());
                self.list.replace_all(items);
                Outcome::Cached
            }
            Err(e) => {
                warn!("Failed to read offline snapshot: {}", e);
                Outcome::Failed
            }
        }
    }

    /// Overwrite the snapshot with the current list
    fn save_snapshot(&mut self) -> bool {
        match self.cache.store(&self.user_id, self.list.items()) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write offline snapshot: {}", e);
                if let Some(hint) = e.recovery_suggestion() {
                    warn!("{}", hint);
                }
                false
            }
        }
    }

    /// Remote write succeeded: re-read so the list reflects the server
    async fn after_write(&mut self) -> Outcome {
        self.fetch().await;
        Outcome::Synced
    }

    /// Create a todo
    ///
    /// Empty or whitespace-only titles are rejected before any I/O. Offline,
    /// a placeholder item is prepended to the list and snapshot and never
    /// sent to the remote store.
    pub async fn add(&mut self, title: &str) -> Result<Outcome, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        if !self.is_online() {
            let todo = Todo::placeholder(&self.user_id, title);
            debug!("Offline add as {}", todo.id);
            self.list.prepend(todo);
            self.save_snapshot();
            return Ok(Outcome::Cached);
        }

        match self.remote.insert(&NewTodo::new(&self.user_id, title)).await {
            Ok(()) => Ok(self.after_write().await),
            Err(e) => {
                warn!("Failed to add todo: {}", e);
                Ok(Outcome::Failed)
            }
        }
    }

    /// Flip completion on one todo; no-op for unknown ids
    pub async fn toggle(&mut self, id: &str) -> Outcome {
        let Some(current) = self.list.get(id) else {
            debug!("Toggle for unknown id {}", id);
            return Outcome::Skipped;
        };
        let completed = current.completed;

        if !self.is_online() || is_placeholder_id(id) {
            self.list.toggle(id);
            self.save_snapshot();
            return Outcome::Cached;
        }

        match self
            .remote
            .update(id, &TodoPatch::completed(!completed))
            .await
        {
            Ok(()) => self.after_write().await,
            Err(e) => {
                warn!("Failed to update todo {}: {}", id, e);
                Outcome::Failed
            }
        }
    }

    /// Remove one todo; no-op for unknown ids
    pub async fn delete(&mut self, id: &str) -> Outcome {
        if self.list.get(id).is_none() {
            debug!("Delete for unknown id {}", id);
            return Outcome::Skipped;
        }

        if !self.is_online() || is_placeholder_id(id) {
            self.list.remove(id);
            self.save_snapshot();
            return Outcome::Cached;
        }

        match self.remote.delete(id).await {
            Ok(()) => self.after_write().await,
            Err(e) => {
                warn!("Failed to delete todo {}: {}", id, e);
                Outcome::Failed
            }
        }
    }

    /// Open the change feed for this user's rows
    pub async fn subscribe(&self) -> Result<Subscription, RemoteError> {
        self.remote.subscribe(&self.owner_filter()).await
    }

    /// Patch the list from a push event; returns whether it changed
    ///
    /// Only the in-memory list is touched. Events that arrive while offline
    /// are dropped.
    pub fn apply_event(&mut self, event: ChangeEvent) -> bool {
        if !self.is_online() {
            debug!("Dropping realtime event for {} while offline", event.id());
            return false;
        }
        self.list.apply(event)
    }

    /// Reconnect hook: replace local state with the server's
    ///
    /// Placeholders created while offline are not pushed; the fetched list
    /// replaces them along with everything else.
    pub async fn resync(&mut self) -> Outcome {
        if !self.is_online() {
            return Outcome::Skipped;
        }

        let pending = self.list.placeholder_count();
        let outcome = self.fetch().await;
        if outcome == Outcome::Synced && pending > 0 {
            warn!(
                "Discarded {} offline todo(s) that were never synced",
                pending
            );
        }
        outcome
    }
}
