//! Account command handlers

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use crossterm::tty::IsTty;
use tracing::warn;

use tickr_core::auth::AuthProvider;
use tickr_core::cache::TodoCache;
use tickr_core::{Config, FileCache, SessionStore};

use crate::context::auth;
use crate::output::{Output, OutputFormat};

const PASSWORD_ENV: &str = "TICKR_PASSWORD";

/// Create an account; signs in right away when the backend allows it
pub async fn signup(
    config: &Config,
    email: &str,
    password: Option<String>,
    offline: bool,
    output: &Output,
) -> Result<()> {
    if offline {
        bail!("Cannot sign up while offline.");
    }
    let password = resolve_password(password)?;
    let auth = auth(config)?;

    match auth.sign_up(email, &password).await? {
        Some(session) => {
            output.success(&format!(
                "Signed up and logged in as {}",
                session.user.email.as_deref().unwrap_or(&session.user.id)
            ));
        }
        None => {
            output.success(&format!("Signed up {}", email.trim()));
            output.message("Confirm the address from your inbox, then run `tickr login`.");
        }
    }
    Ok(())
}

pub async fn login(
    config: &Config,
    email: &str,
    password: Option<String>,
    offline: bool,
    output: &Output,
) -> Result<()> {
    if offline {
        bail!("Cannot log in while offline.");
    }
    let password = resolve_password(password)?;
    let session = auth(config)?.sign_in(email, &password).await?;

    output.success(&format!(
        "Logged in as {}",
        session.user.email.as_deref().unwrap_or(&session.user.id)
    ));
    Ok(())
}

/// Sign out and drop this user's offline snapshot
pub async fn logout(config: &Config, output: &Output) -> Result<()> {
    let sessions = SessionStore::new(config.session_path());
    let Some(session) = sessions.load()? else {
        output.message("Not logged in.");
        return Ok(());
    };

    if config.is_backend_configured() {
        auth(config)?.sign_out().await?;
    } else {
        sessions.clear()?;
    }

    let mut cache = FileCache::from_config(config);
    if let Err(e) = cache.clear(&session.user.id) {
        warn!("Failed to remove offline snapshot: {}", e);
        if let Some(hint) = e.recovery_suggestion() {
            output.warning(hint);
        }
    }

    output.success("Logged out");
    Ok(())
}

/// Show the stored session
pub async fn whoami(config: &Config, output: &Output) -> Result<()> {
    let Some(session) = auth(config)?.get_session().await? else {
        bail!("Not logged in.");
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "id": session.user.id,
                    "email": session.user.email,
                    "expires_at": session.expires_at,
                })
            );
        }
        OutputFormat::Quiet => println!("{}", session.user.id),
        OutputFormat::Human => {
            println!("User:    {}", session.user.id);
            if let Some(ref email) = session.user.email {
                println!("Email:   {}", email);
            }
            if let Some(at) = session
                .expires_at
                .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
            {
                println!("Expires: {}", at.format("%Y-%m-%d %H:%M UTC"));
            }
        }
    }
    Ok(())
}

/// Password from the flag, then the environment, then the terminal
fn resolve_password(flag: Option<String>) -> Result<String> {
    resolve_password_with(
        flag,
        std::env::var(PASSWORD_ENV).ok(),
        io::stdin().is_tty(),
    )
}

fn resolve_password_with(
    flag: Option<String>,
    env: Option<String>,
    interactive: bool,
) -> Result<String> {
    if let Some(p) = flag.or(env) {
        return Ok(p);
    }
    if !interactive {
        bail!("No password given. Pass --password or set {}.", PASSWORD_ENV);
    }

    eprint!("Password: ");
    io::stderr().flush()?;
    terminal::enable_raw_mode().context("Failed to read password")?;
    let read = read_hidden();
    let restored = terminal::disable_raw_mode();
    eprintln!();
    restored.context("Failed to restore terminal")?;
    read
}

/// Read a line without echoing it; raw mode must be on
fn read_hidden() -> Result<String> {
    let mut password = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read().context("Failed to read password")?
        else {
            continue;
        };
        if kind == KeyEventKind::Release {
            continue;
        }
        match code {
            KeyCode::Enter => return Ok(password),
            KeyCode::Esc => bail!("Cancelled"),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                bail!("Cancelled")
            }
            KeyCode::Backspace => {
                password.pop();
            }
            KeyCode::Char(c) => password.push(c),
            _ => {}
        }
    }
}
