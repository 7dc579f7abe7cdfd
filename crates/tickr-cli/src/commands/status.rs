//! Status command handler

use anyhow::Result;

use tickr_core::cache::TodoCache;
use tickr_core::{FileCache, SessionStore};

use crate::context::AppContext;
use crate::output::{Output, OutputFormat};

/// Show status information
pub async fn show(ctx: &AppContext, output: &Output) -> Result<()> {
    let config = &ctx.config;
    let online = ctx.is_online();
    let session = SessionStore::new(config.session_path()).load()?;
    let cache = FileCache::from_config(config);

    let cached = session
        .as_ref()
        .and_then(|s| cache.load(&s.user.id).ok().flatten())
        .map(|todos| todos.len());
    let snapshot = session.as_ref().map(|s| cache.path_for(&s.user.id));

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "online": online,
                    "backend_configured": config.is_backend_configured(),
                    "api_url": config.api_url,
                    "table": config.table,
                    "user": session.as_ref().map(|s| &s.user),
                    "session_expired": session.as_ref().map(|s| s.is_expired()),
                    "cache": {
                        "path": snapshot,
                        "todos": cached,
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", if online { "online" } else { "offline" });
        }
        OutputFormat::Human => {
            println!("tickr Status");
            println!("============");
            println!();
            println!("Backend:");
            println!(
                "  URL:    {}",
                config.api_url.as_deref().unwrap_or("(not set)")
            );
            println!("  Table:  {}", config.table);
            println!(
                "  Status: {}",
                if online {
                    "online"
                } else if !config.is_backend_configured() {
                    "offline (not configured)"
                } else if ctx.forced_offline {
                    "offline (--offline)"
                } else {
                    "offline"
                }
            );
            println!();
            println!("Session:");
            match session {
                Some(ref s) => {
                    println!(
                        "  User:   {}",
                        s.user.email.as_deref().unwrap_or(&s.user.id)
                    );
                    if s.is_expired() {
                        println!("  Expired; run `tickr login` again");
                    }
                }
                None => println!("  Not logged in"),
            }
            println!();
            println!("Offline snapshot:");
            match (snapshot, cached) {
                (Some(path), Some(n)) => {
                    println!("  Location: {}", path.display());
                    println!("  Todos:    {}", n);
                }
                (Some(path), None) => {
                    println!("  Location: {}", path.display());
                    println!("  (empty)");
                }
                _ => println!("  (none)"),
            }
        }
    }

    Ok(())
}
