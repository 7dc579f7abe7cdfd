//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/tickr/config.toml, `TICKR_CONFIG`, or `--config`)
//! 3. Environment variables (TICKR_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "TICKR";

/// Default remote table name
pub const DEFAULT_TABLE: &str = "todos";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for local state (offline cache, session)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Backend base URL, e.g. `https://xyz.supabase.co`
    #[serde(default)]
    pub api_url: Option<String>,

    /// Public (anon) API key for the backend
    #[serde(default)]
    pub anon_key: Option<String>,

    /// Remote table holding todo rows
    #[serde(default = "default_table")]
    pub table: String,

    /// Timeout for a single REST request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How often `watch` re-checks connectivity, in seconds
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Log level for tickr crates (error, warn, info, debug, trace)
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            api_url: None,
            anon_key: None,
            table: default_table(),
            request_timeout_secs: default_request_timeout(),
            check_interval_secs: default_check_interval(),
            log_file: None,
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path from the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_API_URL", ENV_PREFIX)) {
            self.api_url = non_empty(val);
        }

        if let Ok(val) = std::env::var(format!("{}_ANON_KEY", ENV_PREFIX)) {
            self.anon_key = non_empty(val);
        }

        if let Ok(val) = std::env::var(format!("{}_TABLE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.table = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = non_empty(val).map(PathBuf::from);
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with TICKR_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tickr")
            .join("config.toml")
    }

    /// Directory holding per-user offline snapshots
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Path to the persisted auth session
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }

    /// Whether both the backend URL and key are set
    pub fn is_backend_configured(&self) -> bool {
        self.api_url.is_some() && self.anon_key.is_some()
    }
}

fn non_empty(val: String) -> Option<String> {
    if val.is_empty() {
        None
    } else {
        Some(val)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tickr")
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_check_interval() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "TICKR_DATA_DIR",
        "TICKR_API_URL",
        "TICKR_ANON_KEY",
        "TICKR_TABLE",
        "TICKR_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api_url.is_none());
        assert!(config.anon_key.is_none());
        assert_eq!(config.table, "todos");
        assert!(config.data_dir.ends_with("tickr"));
        assert!(!config.is_backend_configured());
    }

    #[test]
    fn test_file_paths() {
        let config = Config::default();
        assert!(config.cache_dir().ends_with("cache"));
        assert!(config.session_path().ends_with("session.json"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("TICKR_DATA_DIR", "/tmp/tickr-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/tickr-test"));
    }

    #[test]
    fn test_env_override_backend() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("TICKR_API_URL", "https://example.supabase.co");
        env::set_var("TICKR_ANON_KEY", "anon");
        config.apply_env_overrides();
        assert_eq!(
            config.api_url.as_deref(),
            Some("https://example.supabase.co")
        );
        assert!(config.is_backend_configured());

        // Empty string clears it
        env::set_var("TICKR_API_URL", "");
        config.apply_env_overrides();
        assert!(config.api_url.is_none());
    }

    #[test]
    fn test_env_empty_table_keeps_default() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("TICKR_TABLE", "");
        config.apply_env_overrides();
        assert_eq!(config.table, "todos");

        env::set_var("TICKR_TABLE", "tasks");
        config.apply_env_overrides();
        assert_eq!(config.table, "tasks");
    }

    #[test]
    fn test_load_from_path() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let data_dir = temp_dir.path().join("data");

        let toml = format!(
            r#"
            data_dir = {:?}
            api_url = "https://example.supabase.co"
            anon_key = "key"
            request_timeout_secs = 3
        "#,
            data_dir
        );
        std::fs::write(&path, toml).unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.data_dir, data_dir);
        assert!(data_dir.exists());
        assert_eq!(config.anon_key.as_deref(), Some("key"));
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.check_interval_secs, 15);
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            api_url: Some("https://example.supabase.co".to_string()),
            anon_key: Some("anon".to_string()),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.api_url, config.api_url);
        assert_eq!(loaded.data_dir, config.data_dir);
        assert!(loaded.data_dir.exists());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("TICKR_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(config.api_url.is_none());
        assert_eq!(config.table, "todos");
    }
}
