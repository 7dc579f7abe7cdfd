//! Logging setup
//!
//! Log level comes from TICKR_LOG, then the config's `log_level`, and
//! defaults to `warn`. Output goes to stderr unless `log_file` is set.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use tickr_core::Config;

const LOG_ENV: &str = "TICKR_LOG";
const DEFAULT_LEVEL: &str = "warn";

fn level(config: &Config) -> String {
    std::env::var(LOG_ENV)
        .ok()
        .filter(|l| !l.trim().is_empty())
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("tickr_core={},tickr_cli={}", level, level))
}

/// Install the global subscriber (no-op if one is already set)
pub fn init(config: &Config) {
    let level = level(config);

    if let Some(ref path) = config.log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter(&level))
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
                debug!("Logging to {:?}", path);
                return;
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(&level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
