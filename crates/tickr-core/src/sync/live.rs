//! In-memory todo list with realtime patching
//!
//! Keeps the ordered list the user sees plus tombstones for rows removed by
//! push events, so a late insert or update cannot bring a deleted row back
//! before the next full fetch.

use std::collections::HashSet;

use tracing::debug;

use crate::models::Todo;
use crate::remote::ChangeEvent;

/// Ordered list of the current user's todos
#[derive(Debug, Default, Clone)]
pub struct LiveList {
    items: Vec<Todo>,
    tombstones: HashSet<String>,
}

impl LiveList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Todo] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.items.iter().find(|t| t.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|t| t.id == id)
    }

    /// Replace everything with an authoritative list
    pub fn replace_all(&mut self, items: Vec<Todo>) {
        self.items = items;
        self.tombstones.clear();
    }

    /// Put a new item at the front
    pub fn prepend(&mut self, todo: Todo) {
        self.items.insert(0, todo);
    }

    /// Flip completion on one item; false if absent
    pub fn toggle(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|t| t.id == id) {
            Some(todo) => {
                todo.toggle();
                true
            }
            None => false,
        }
    }

    /// Remove one item; false if absent
    pub fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Number of items that only exist locally
    pub fn placeholder_count(&self) -> usize {
        self.items.iter().filter(|t| t.is_placeholder()).count()
    }

    /// Apply a push event; returns whether the list changed
    ///
    /// An insert or update only wins over the held copy when its version is
    /// not older. Deletes always win and leave a tombstone.
    pub fn apply(&mut self, event: ChangeEvent) -> bool {
        match event {
            ChangeEvent::Insert(todo) => {
                if self.tombstones.contains(&todo.id) {
                    debug!("Ignoring insert for deleted {}", todo.id);
                    return false;
                }
                match self.position(&todo.id) {
                    Some(pos) => self.replace_if_current(pos, todo),
                    None => {
                        self.items.insert(0, todo);
                        true
                    }
                }
            }
            ChangeEvent::Update(todo) => {
                if self.tombstones.contains(&todo.id) {
                    debug!("Ignoring update for deleted {}", todo.id);
                    return false;
                }
                match self.position(&todo.id) {
                    Some(pos) => self.replace_if_current(pos, todo),
                    None => false,
                }
            }
            ChangeEvent::Delete { id } => {
                let removed = self.remove(&id);
                self.tombstones.insert(id);
                removed
            }
        }
    }

    fn replace_if_current(&mut self, pos: usize, incoming: Todo) -> bool {
        let held = &self.items[pos];
        if incoming.version() < held.version() {
            debug!(
                "Ignoring stale event for {} ({} < {})",
                incoming.id,
                incoming.version(),
                held.version()
            );
            return false;
        }
        if *held == incoming {
            return false;
        }
        self.items[pos] = incoming;
        true
    }
}
