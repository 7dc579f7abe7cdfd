//! Remote store access
//!
//! The hosted table is reached through the [`RemoteStore`] trait so the sync
//! controller never depends on a particular backend:
//!
//! - `SupabaseStore`: PostgREST over HTTP plus a realtime websocket channel
//! - `MemoryStore`: in-process rows and change feed (tests, demos)
//!
//! Every read and subscription is scoped by a [`RowFilter`] on the owning
//! user, so one user never sees another user's rows.

pub mod error;
pub mod memory;
pub mod query;
pub mod realtime;
pub mod supabase;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::models::{NewTodo, Todo, TodoPatch};

pub use error::RemoteError;
pub use memory::MemoryStore;
pub use query::{Order, Query, RowFilter};
pub use supabase::SupabaseStore;

/// Row-level access to the remote todo table
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch rows matching the query, in the requested order
    async fn select(&self, query: &Query) -> Result<Vec<Todo>, RemoteError>;

    /// Insert a new row; the server assigns id and timestamps
    async fn insert(&self, row: &NewTodo) -> Result<(), RemoteError>;

    /// Patch the row with the given id
    async fn update(&self, id: &str, patch: &TodoPatch) -> Result<(), RemoteError>;

    /// Delete the row with the given id
    async fn delete(&self, id: &str) -> Result<(), RemoteError>;

    /// Open a change feed for rows matching the filter
    async fn subscribe(&self, filter: &RowFilter) -> Result<Subscription, RemoteError>;
}

/// A store that may not be configured
///
/// `None` fails every call with [`RemoteError::NotConfigured`], which lets a
/// controller run from the offline snapshot alone.
#[async_trait]
impl<S: RemoteStore> RemoteStore for Option<S> {
    async fn select(&self, query: &Query) -> Result<Vec<Todo>, RemoteError> {
        match self {
            Some(store) => store.select(query).await,
            None => Err(RemoteError::NotConfigured("api_url")),
        }
    }

    async fn insert(&self, row: &NewTodo) -> Result<(), RemoteError> {
        match self {
            Some(store) => store.insert(row).await,
            None => Err(RemoteError::NotConfigured("api_url")),
        }
    }

    async fn update(&self, id: &str, patch: &TodoPatch) -> Result<(), RemoteError> {
        match self {
            Some(store) => store.update(id, patch).await,
            None => Err(RemoteError::NotConfigured("api_url")),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        match self {
            Some(store) => store.delete(id).await,
            None => Err(RemoteError::NotConfigured("api_url")),
        }
    }

    async fn subscribe(&self, filter: &RowFilter) -> Result<Subscription, RemoteError> {
        match self {
            Some(store) => store.subscribe(filter).await,
            None => Err(RemoteError::NotConfigured("api_url")),
        }
    }
}

/// A row change pushed by the remote store
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Insert(Todo),
    Update(Todo),
    Delete { id: String },
}

impl ChangeEvent {
    /// Id of the affected row
    pub fn id(&self) -> &str {
        match self {
            ChangeEvent::Insert(todo) | ChangeEvent::Update(todo) => &todo.id,
            ChangeEvent::Delete { id } => id,
        }
    }
}

/// Live change feed
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`])
/// tells the producer to stop; events still in flight are discarded.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    cancel: Option<oneshot::Sender<()>>,
}

impl Subscription {
    /// Create a subscription whose producer listens for cancellation
    pub fn new(
        events: mpsc::UnboundedReceiver<ChangeEvent>,
        cancel: oneshot::Sender<()>,
    ) -> Self {
        Self {
            events,
            cancel: Some(cancel),
        }
    }

    /// Create a subscription whose producer notices teardown by the closed channel
    pub fn from_channel(events: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Self {
            events,
            cancel: None,
        }
    }

    /// Wait for the next event; `None` once the feed has ended
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Take an already-delivered event without waiting
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.events.try_recv().ok()
    }

    /// Stop the feed
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.events.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_store_reports_not_configured() {
        let store: Option<MemoryStore> = None;
        let query = Query::new(RowFilter::eq("user_id", "u-1"));

        assert!(matches!(
            store.select(&query).await,
            Err(RemoteError::NotConfigured(_))
        ));
        assert!(matches!(
            RemoteStore::insert(&store, &NewTodo::new("u-1", "x")).await,
            Err(RemoteError::NotConfigured(_))
        ));
        assert!(store
            .subscribe(&RowFilter::eq("user_id", "u-1"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_present_store_forwards_calls() {
        let store = Some(MemoryStore::new());
        // Option::insert shadows the trait method
        RemoteStore::insert(&store, &NewTodo::new("u-1", "Buy milk"))
            .await
            .unwrap();

        let rows = store
            .select(&Query::new(RowFilter::eq("user_id", "u-1")))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Buy milk");
    }
}
