//! Row filters and ordering
//!
//! Rendered in PostgREST syntax (`user_id=eq.abc`, `order=created_at.desc`)
//! for REST calls and realtime channel filters, and evaluated directly by
//! the in-memory store.

use serde_json::Value;

use crate::models::Todo;

/// Equality filter on a single column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl RowFilter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Query parameter pair, e.g. `("user_id", "eq.abc")`
    pub fn to_param(&self) -> (String, String) {
        (self.column.clone(), format!("eq.{}", self.value))
    }

    /// Realtime filter string, e.g. `user_id=eq.abc`
    pub fn to_realtime(&self) -> String {
        format!("{}=eq.{}", self.column, self.value)
    }

    /// Whether a row satisfies the filter
    pub fn matches(&self, todo: &Todo) -> bool {
        let Ok(Value::Object(row)) = serde_json::to_value(todo) else {
            return false;
        };
        match row.get(&self.column) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Bool(b)) => b.to_string() == self.value,
            Some(Value::Number(n)) => n.to_string() == self.value,
            _ => false,
        }
    }
}

/// Sort order on a single column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    /// Value for the `order` query parameter
    pub fn to_param(&self) -> String {
        let direction = if self.ascending { "asc" } else { "desc" };
        format!("{}.{}", self.column, direction)
    }
}

/// A select request: one filter, optional ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub filter: RowFilter,
    pub order: Option<Order>,
}

impl Query {
    pub fn new(filter: RowFilter) -> Self {
        Self {
            filter,
            order: None,
        }
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    /// All query parameters for a PostgREST select
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.push(self.filter.to_param());
        if let Some(ref order) = self.order {
            params.push(("order".to_string(), order.to_param()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn todo(user: &str, completed: bool) -> Todo {
        Todo {
            id: "a".to_string(),
            title: "task".to_string(),
            completed,
            user_id: user.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_postgrest_params() {
        let query = Query::new(RowFilter::eq("user_id", "u-1")).order(Order::desc("created_at"));
        let params = query.to_params();

        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*".to_string()),
                ("user_id".to_string(), "eq.u-1".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_realtime_filter() {
        assert_eq!(
            RowFilter::eq("user_id", "u-1").to_realtime(),
            "user_id=eq.u-1"
        );
    }

    #[test]
    fn test_matches_string_and_bool_columns() {
        let row = todo("u-1", true);

        assert!(RowFilter::eq("user_id", "u-1").matches(&row));
        assert!(!RowFilter::eq("user_id", "u-2").matches(&row));
        assert!(RowFilter::eq("completed", "true").matches(&row));
        assert!(!RowFilter::eq("missing", "x").matches(&row));
    }
}
