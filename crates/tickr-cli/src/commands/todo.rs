//! Todo command handlers

use anyhow::{bail, Result};

use tickr_core::{Filter, Outcome, Todo};

use crate::context::AppContext;
use crate::output::Output;

/// Shortest id prefix accepted on the command line
const MIN_PREFIX: usize = 4;

/// List todos
pub async fn list(ctx: &AppContext, filter: Filter, output: &Output) -> Result<()> {
    let controller = ctx.open().await?;
    output.print_todos(
        &controller.filtered(filter),
        controller.stats(),
        controller.is_online(),
    );
    Ok(())
}

/// Add a todo
pub async fn add(ctx: &AppContext, words: &[String], output: &Output) -> Result<()> {
    let title = words.join(" ");
    let title = title.trim();
    let mut controller = ctx.open().await?;

    let outcome = controller.add(title).await?;
    if outcome.is_failure() {
        bail!("Could not add todo. The server did not accept the request.");
    }
    match outcome {
        Outcome::Cached => {
            output.success(&format!("Saved offline: {}", title));
            output.warning("Offline todos stay on this device and are dropped on the next sync.");
        }
        _ => output.success(&format!("Added: {}", title)),
    }
    // Newest first, so the first match is the one just added
    if let Some(todo) = controller.todos().iter().find(|t| t.title == title) {
        output.print_todo(todo);
    }
    Ok(())
}

/// Flip completion on a todo
pub async fn toggle(ctx: &AppContext, id: &str, output: &Output) -> Result<()> {
    let mut controller = ctx.open().await?;
    let id = resolve_id(controller.todos(), id)?;

    match controller.toggle(&id).await {
        Outcome::Synced | Outcome::Cached => match controller.get(&id) {
            Some(todo) => {
                let state = if todo.completed { "done" } else { "not done" };
                output.success(&format!("Marked {} as {}", todo.title, state));
                output.print_todo(todo);
            }
            None => output.success(&format!("Toggled {}", id)),
        },
        Outcome::Skipped => bail!("No todo found matching: {}", id),
        Outcome::Failed => bail!("Could not update todo {}.", id),
    }
    Ok(())
}

/// Delete a todo
pub async fn delete(ctx: &AppContext, id: &str, output: &Output) -> Result<()> {
    let mut controller = ctx.open().await?;
    let id = resolve_id(controller.todos(), id)?;
    let title = controller
        .get(&id)
        .map(|t| t.title.clone())
        .unwrap_or_else(|| id.clone());

    match controller.delete(&id).await {
        Outcome::Synced | Outcome::Cached => output.success(&format!("Deleted: {}", title)),
        Outcome::Skipped => bail!("No todo found matching: {}", id),
        Outcome::Failed => bail!("Could not delete todo {}.", id),
    }
    Ok(())
}

/// Resolve a full id or unique prefix against the current list
pub fn resolve_id(todos: &[Todo], input: &str) -> Result<String> {
    let input = input.trim();
    if todos.iter().any(|t| t.id == input) {
        return Ok(input.to_string());
    }
    if input.chars().count() < MIN_PREFIX {
        bail!(
            "ID prefix '{}' is too short. Use at least {} characters.",
            input,
            MIN_PREFIX
        );
    }

    let matches: Vec<_> = todos.iter().filter(|t| t.id.starts_with(input)).collect();

    match matches.len() {
        0 => bail!("No todo found matching: {}", input),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple todos match '{}':", input);
            for todo in &matches {
                eprintln!("  {} - {}", todo.id, todo.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn todo(id: &str) -> Todo {
        Todo {
            id: id.to_string(),
            title: format!("title {}", id),
            completed: false,
            user_id: "u-1".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn todos() -> Vec<Todo> {
        vec![
            todo("0f3c9a12-aaaa"),
            todo("0f3c77d0-bbbb"),
            todo("9b1e2d3f-cccc"),
        ]
    }

    #[test]
    fn test_resolve_full_id() {
        assert_eq!(resolve_id(&todos(), "9b1e2d3f-cccc").unwrap(), "9b1e2d3f-cccc");
    }

    #[test]
    fn test_resolve_unique_prefix() {
        assert_eq!(resolve_id(&todos(), "9b1e").unwrap(), "9b1e2d3f-cccc");
        assert_eq!(resolve_id(&todos(), "0f3c9").unwrap(), "0f3c9a12-aaaa");
    }

    #[test]
    fn test_resolve_ambiguous_prefix() {
        let err = resolve_id(&todos(), "0f3c").unwrap_err();
        assert!(err.to_string().contains("Ambiguous"));
    }

    #[test]
    fn test_resolve_short_prefix_rejected() {
        let err = resolve_id(&todos(), "9b1").unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn test_resolve_unknown() {
        let err = resolve_id(&todos(), "ffffffff").unwrap_err();
        assert!(err.to_string().contains("No todo found"));
    }

    #[test]
    fn test_resolve_placeholder_id() {
        let list = vec![todo("temp_1714557600000_1a2b3c4d")];
        assert_eq!(
            resolve_id(&list, "temp_1714557600000_1a2b3c4d").unwrap(),
            "temp_1714557600000_1a2b3c4d"
        );
    }
}
