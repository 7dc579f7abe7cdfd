//! tickr CLI
//!
//! Command-line client for a personal todo list kept in sync with a
//! Supabase-style backend, with an offline snapshot to fall back on.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tickr_core::{Config, Filter};

mod commands;
mod context;
mod logging;
mod output;

use context::AppContext;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "tickr")]
#[command(about = "tickr - todos that keep working offline")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Skip the network and work from the offline snapshot
    #[arg(long, global = true)]
    offline: bool,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        email: String,
        /// Password (falls back to TICKR_PASSWORD, then a prompt)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign in
    Login {
        email: String,
        /// Password (falls back to TICKR_PASSWORD, then a prompt)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List todos
    #[command(alias = "ls")]
    List {
        /// all, active or completed
        #[arg(short, long, default_value = "all")]
        filter: Filter,
    },
    /// Add a todo
    Add {
        /// Title (remaining words are joined)
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Flip a todo between done and not done
    Toggle {
        /// Todo ID (full or prefix of at least 4 characters)
        id: String,
    },
    /// Delete a todo
    #[command(alias = "rm")]
    Delete {
        /// Todo ID (full or prefix of at least 4 characters)
        id: String,
    },
    /// Follow the list live until interrupted
    Watch,
    /// Show backend, session and cache status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, api_url, anon_key, table, ...)
        key: String,
        /// Configuration value ("none" clears optional keys)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work even when the backend is not set up yet
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init(&config);

    match cli.command {
        Commands::Signup { email, password } => {
            commands::auth::signup(&config, &email, password, cli.offline, &output).await
        }
        Commands::Login { email, password } => {
            commands::auth::login(&config, &email, password, cli.offline, &output).await
        }
        Commands::Logout => commands::auth::logout(&config, &output).await,
        Commands::Whoami => commands::auth::whoami(&config, &output).await,
        command => {
            let ctx = AppContext::connect(config, cli.offline).await;
            match command {
                Commands::List { filter } => commands::todo::list(&ctx, filter, &output).await,
                Commands::Add { title } => commands::todo::add(&ctx, &title, &output).await,
                Commands::Toggle { id } => commands::todo::toggle(&ctx, &id, &output).await,
                Commands::Delete { id } => commands::todo::delete(&ctx, &id, &output).await,
                Commands::Watch => commands::watch::run(&ctx, &output).await,
                Commands::Status => commands::status::show(&ctx, &output).await,
                Commands::Signup { .. }
                | Commands::Login { .. }
                | Commands::Logout
                | Commands::Whoami
                | Commands::Config { .. } => unreachable!(), // Handled above
            }
        }
    }
}
