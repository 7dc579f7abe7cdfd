//! Data models for tickr
//!
//! Defines the todo row as it travels between the remote table, the local
//! cache and the sync controller, plus the write payloads sent to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix marking an id synthesized while offline
pub const PLACEHOLDER_PREFIX: &str = "temp_";

/// A single todo item owned by one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Todo {
    /// Server-assigned id, or a `temp_` placeholder for offline items
    pub id: String,
    /// Task text (never empty)
    pub title: String,
    /// Whether the task is done
    #[serde(default)]
    pub completed: bool,
    /// Owning user
    pub user_id: String,
    /// When this item was created
    pub created_at: DateTime<Utc>,
    /// When this item was last written, if the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Todo {
    /// Create an offline placeholder item for the given owner
    ///
    /// The id is time-derived with a random suffix, so two items created in
    /// the same millisecond never share an id.
    pub fn placeholder(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: placeholder_id(now),
            title: title.into(),
            completed: false,
            user_id: user_id.into(),
            created_at: now,
            updated_at: Some(now),
        }
    }

    /// Whether this item only exists locally
    pub fn is_placeholder(&self) -> bool {
        is_placeholder_id(&self.id)
    }

    /// Version used to order concurrent writes to the same item
    pub fn version(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    /// Flip the completion flag and bump the version
    pub fn toggle(&mut self) {
        self.completed = !self.completed;
        self.updated_at = Some(Utc::now());
    }
}

/// Build a placeholder id for the given instant
pub fn placeholder_id(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}_{}", PLACEHOLDER_PREFIX, at.timestamp_millis(), &suffix[..8])
}

/// Whether an id was synthesized offline
pub fn is_placeholder_id(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_PREFIX)
}

/// Insert payload for a new row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTodo {
    pub title: String,
    pub completed: bool,
    pub user_id: String,
}

impl NewTodo {
    /// Build an insert payload, trimming the title
    pub fn new(user_id: impl Into<String>, title: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            completed: false,
            user_id: user_id.into(),
        }
    }
}

/// Partial update payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
        }
    }

    /// Apply this patch to an item in place
    pub fn apply(&self, todo: &mut Todo) {
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
    }
}

/// List filter used by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    /// Whether an item passes this filter
    pub fn matches(&self, todo: &Todo) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !todo.completed,
            Filter::Completed => todo.completed,
        }
    }
}

impl std::str::FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" | "done" => Ok(Filter::Completed),
            other => Err(format!(
                "Unknown filter '{}'. Use all, active or completed.",
                other
            )),
        }
    }
}

/// Counts shown above the list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
}

impl TodoStats {
    pub fn from_todos(todos: &[Todo]) -> Self {
        let completed = todos.iter().filter(|t| t.completed).count();
        Self {
            total: todos.len(),
            completed,
            active: todos.len() - completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn todo(id: &str, completed: bool) -> Todo {
        Todo {
            id: id.to_string(),
            title: format!("task {}", id),
            completed,
            user_id: "user-1".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_placeholder_has_offline_marker() {
        let t = Todo::placeholder("user-1", "Call mom");
        assert!(t.id.starts_with("temp_"));
        assert!(t.is_placeholder());
        assert!(!t.completed);
        assert_eq!(t.user_id, "user-1");
        assert_eq!(t.title, "Call mom");
    }

    #[test]
    fn test_placeholder_ids_are_unique_within_same_instant() {
        let now = Utc::now();
        let a = placeholder_id(now);
        let b = placeholder_id(now);
        assert_ne!(a, b);
    }

    #[test]
    fn test_version_falls_back_to_created_at() {
        let mut t = todo("a", false);
        assert_eq!(t.version(), t.created_at);

        let later = t.created_at + Duration::seconds(5);
        t.updated_at = Some(later);
        assert_eq!(t.version(), later);
    }

    #[test]
    fn test_toggle_bumps_version() {
        let mut t = todo("a", false);
        t.created_at -= Duration::seconds(10);
        let before = t.version();

        t.toggle();
        assert!(t.completed);
        assert!(t.version() > before);
    }

    #[test]
    fn test_new_todo_trims_title() {
        let new = NewTodo::new("user-1", "  Buy milk  ");
        assert_eq!(new.title, "Buy milk");
        assert!(!new.completed);
    }

    #[test]
    fn test_patch_serializes_completed_flag() {
        let json = serde_json::to_value(TodoPatch::completed(true)).unwrap();
        assert_eq!(json, serde_json::json!({ "completed": true }));
    }

    #[test]
    fn test_deserialize_server_row_without_updated_at() {
        let row = serde_json::json!({
            "id": "8f2c",
            "title": "Buy milk",
            "completed": false,
            "user_id": "user-1",
            "created_at": "2024-05-01T10:00:00+00:00"
        });
        let t: Todo = serde_json::from_value(row).unwrap();
        assert_eq!(t.id, "8f2c");
        assert!(t.updated_at.is_none());
    }

    #[test]
    fn test_filter_and_stats() {
        let todos = vec![todo("a", true), todo("b", false), todo("c", false)];

        let active: Vec<_> = todos.iter().filter(|t| Filter::Active.matches(t)).collect();
        assert_eq!(active.len(), 2);

        let stats = TodoStats::from_todos(&todos);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active, 2);
    }

    #[test]
    fn test_filter_from_str() {
        assert_eq!("all".parse::<Filter>().unwrap(), Filter::All);
        assert_eq!("Completed".parse::<Filter>().unwrap(), Filter::Completed);
        assert!("bogus".parse::<Filter>().is_err());
    }
}
