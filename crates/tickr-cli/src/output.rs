//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use tickr_core::{Todo, TodoStats};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single todo
    pub fn print_todo(&self, todo: &Todo) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", todo.id);
                println!("Title:     {}", todo.title);
                println!("Done:      {}", if todo.completed { "yes" } else { "no" });
                println!("Created:   {}", todo.created_at.format("%Y-%m-%d %H:%M"));
                if let Some(updated) = todo.updated_at {
                    println!("Updated:   {}", updated.format("%Y-%m-%d %H:%M"));
                }
                if todo.is_placeholder() {
                    println!("(offline only, not on the server)");
                }
            }
            OutputFormat::Json => print_json(todo),
            OutputFormat::Quiet => println!("{}", todo.id),
        }
    }

    /// Print a list of todos with counts
    pub fn print_todos(&self, todos: &[&Todo], stats: TodoStats, online: bool) {
        match self.format {
            OutputFormat::Human => {
                if !online {
                    println!("[offline] showing last saved list");
                }
                if todos.is_empty() {
                    println!("No todos yet.");
                } else {
                    for todo in todos {
                        println!(
                            "{} [{}] {}",
                            short_id(&todo.id),
                            if todo.completed { "x" } else { " " },
                            truncate(&todo.title, 60)
                        );
                    }
                }
                println!(
                    "\n{} total, {} active, {} completed",
                    stats.total, stats.active, stats.completed
                );
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "online": online,
                "stats": stats,
                "todos": todos,
            })),
            OutputFormat::Quiet => {
                for todo in todos {
                    println!("{}", todo.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warning(&self, msg: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", msg);
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON output: {}", e),
    }
}

/// First 8 characters of an id, for list display
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
