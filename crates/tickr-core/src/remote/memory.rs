//! In-process remote store
//!
//! Behaves like the hosted table closely enough to drive the sync controller
//! without a network: server-assigned ids and timestamps, filtered selects,
//! and a change feed that fires on every write. Calls are recorded and the
//! store can be switched into a failing state.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::error::RemoteError;
use super::query::{Query, RowFilter};
use super::{ChangeEvent, RemoteStore, Subscription};
use crate::models::{NewTodo, Todo, TodoPatch};

/// A call made against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Select,
    Insert(String),
    Update(String),
    Delete(String),
    Subscribe,
}

#[derive(Default)]
struct Inner {
    rows: Vec<Todo>,
    subscribers: Vec<(RowFilter, mpsc::UnboundedSender<ChangeEvent>)>,
    calls: Vec<Call>,
    failing: bool,
    last_write: Option<DateTime<Utc>>,
}

impl Inner {
    /// Strictly increasing write timestamp
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let at = match self.last_write {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_write = Some(at);
        at
    }

    fn check(&self) -> Result<(), RemoteError> {
        if self.failing {
            Err(RemoteError::Unavailable("memory store is failing".to_string()))
        } else {
            Ok(())
        }
    }

    fn broadcast(&mut self, event: ChangeEvent, row: Option<&Todo>) {
        self.subscribers.retain(|(filter, tx)| {
            let relevant = row.map_or(true, |r| filter.matches(r));
            if !relevant {
                return !tx.is_closed();
            }
            tx.send(event.clone()).is_ok()
        });
    }
}

/// Remote store kept entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Put a row in place without notifying subscribers
    pub fn seed(&self, todo: Todo) {
        self.lock().rows.push(todo);
    }

    /// Snapshot of every stored row
    pub fn rows(&self) -> Vec<Todo> {
        self.lock().rows.clone()
    }

    /// Calls made so far, oldest first
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of write calls (insert, update, delete) made so far
    pub fn write_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Insert(_) | Call::Update(_) | Call::Delete(_)))
            .count()
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Deliver an event to subscribers as if another client made the change
    pub fn push(&self, event: ChangeEvent) {
        let row = match &event {
            ChangeEvent::Insert(todo) | ChangeEvent::Update(todo) => Some(todo.clone()),
            ChangeEvent::Delete { .. } => None,
        };
        self.lock().broadcast(event, row.as_ref());
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|(_, tx)| !tx.is_closed());
        inner.subscribers.len()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Todo>, RemoteError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Select);
        inner.check()?;

        let mut rows: Vec<Todo> = inner
            .rows
            .iter()
            .filter(|r| query.filter.matches(r))
            .cloned()
            .collect();

        if let Some(ref order) = query.order {
            match order.column.as_str() {
                "created_at" => rows.sort_by_key(|r| r.created_at),
                "updated_at" => rows.sort_by_key(|r| r.version()),
                "title" => rows.sort_by(|a, b| a.title.cmp(&b.title)),
                _ => rows.sort_by(|a, b| a.id.cmp(&b.id)),
            }
            if !order.ascending {
                rows.reverse();
            }
        }

        Ok(rows)
    }

    async fn insert(&self, row: &NewTodo) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Insert(row.title.clone()));
        inner.check()?;

        let at = inner.tick();
        let todo = Todo {
            id: Uuid::new_v4().to_string(),
            title: row.title.clone(),
            completed: row.completed,
            user_id: row.user_id.clone(),
            created_at: at,
            updated_at: Some(at),
        };
        inner.rows.push(todo.clone());
        inner.broadcast(ChangeEvent::Insert(todo.clone()), Some(&todo));
        Ok(())
    }

    async fn update(&self, id: &str, patch: &TodoPatch) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Update(id.to_string()));
        inner.check()?;

        let at = inner.tick();
        let Some(todo) = inner.rows.iter_mut().find(|r| r.id == id) else {
            // PostgREST reports success when the filter matches nothing
            return Ok(());
        };
        patch.apply(todo);
        todo.updated_at = Some(at);
        let todo = todo.clone();
        inner.broadcast(ChangeEvent::Update(todo.clone()), Some(&todo));
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Delete(id.to_string()));
        inner.check()?;

        let Some(pos) = inner.rows.iter().position(|r| r.id == id) else {
            return Ok(());
        };
        let removed = inner.rows.remove(pos);
        inner.broadcast(
            ChangeEvent::Delete {
                id: removed.id.clone(),
            },
            Some(&removed),
        );
        Ok(())
    }

    async fn subscribe(&self, filter: &RowFilter) -> Result<Subscription, RemoteError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Subscribe);
        inner.check()?;

        let (tx, rx) = mpsc::unbounded_channel();
        inner.subscribers.push((filter.clone(), tx));
        Ok(Subscription::from_channel(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::query::Order;

    fn owner_query(user: &str) -> Query {
        Query::new(RowFilter::eq("user_id", user)).order(Order::desc("created_at"))
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_orders_newest_first() {
        let store = MemoryStore::new();
        store.insert(&NewTodo::new("u-1", "first")).await.unwrap();
        store.insert(&NewTodo::new("u-1", "second")).await.unwrap();

        let rows = store.select(&owner_query("u-1")).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "second");
        assert_eq!(rows[1].title, "first");
        assert!(!rows[0].id.is_empty());
        assert_ne!(rows[0].id, rows[1].id);
    }

    #[tokio::test]
    async fn test_select_is_scoped_to_owner() {
        let store = MemoryStore::new();
        store.insert(&NewTodo::new("alice", "mine")).await.unwrap();
        store.insert(&NewTodo::new("bob", "theirs")).await.unwrap();

        let rows = store.select(&owner_query("alice")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "mine");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = MemoryStore::new();
        store.insert(&NewTodo::new("u-1", "task")).await.unwrap();
        let id = store.rows()[0].id.clone();

        store.update(&id, &TodoPatch::completed(true)).await.unwrap();
        assert!(store.rows()[0].completed);

        store.delete(&id).await.unwrap();
        assert!(store.rows().is_empty());

        // Unknown ids are not an error
        store.delete("missing").await.unwrap();
        store
            .update("missing", &TodoPatch::completed(true))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failing_store_rejects_calls() {
        let store = MemoryStore::new();
        store.set_failing(true);

        let err = store.insert(&NewTodo::new("u-1", "task")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Unavailable(_)));
        assert!(store.rows().is_empty());
        assert_eq!(store.calls(), vec![Call::Insert("task".to_string())]);
    }

    #[tokio::test]
    async fn test_subscription_receives_only_matching_rows() {
        let store = MemoryStore::new();
        let mut sub = store
            .subscribe(&RowFilter::eq("user_id", "alice"))
            .await
            .unwrap();

        store.insert(&NewTodo::new("bob", "not mine")).await.unwrap();
        store.insert(&NewTodo::new("alice", "mine")).await.unwrap();

        match sub.try_recv() {
            Some(ChangeEvent::Insert(todo)) => assert_eq!(todo.title, "mine"),
            other => panic!("Expected insert, got {:?}", other),
        }
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let store = MemoryStore::new();
        let sub = store
            .subscribe(&RowFilter::eq("user_id", "alice"))
            .await
            .unwrap();
        assert_eq!(store.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);
    }
}
