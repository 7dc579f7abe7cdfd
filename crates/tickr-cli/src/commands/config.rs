//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use tickr_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "api_url": config.api_url,
                    "anon_key": config.anon_key.as_deref().map(mask),
                    "table": config.table,
                    "request_timeout_secs": config.request_timeout_secs,
                    "check_interval_secs": config.check_interval_secs,
                    "log_file": config.log_file,
                    "log_level": config.log_level
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!(
                "  api_url:              {}",
                config.api_url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  anon_key:             {}",
                config
                    .anon_key
                    .as_deref()
                    .map(mask)
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  table:                {}", config.table);
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!("  check_interval_secs:  {}", config.check_interval_secs);
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!(
                "  log_level:            {}",
                config.log_level.as_deref().unwrap_or("(default)")
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key == "anon_key" { mask(&value) } else { value };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => config.data_dir = value.into(),
        "api_url" => config.api_url = optional(value).map(|u| u.trim_end_matches('/').to_string()),
        "anon_key" => config.anon_key = optional(value),
        "table" => {
            if value.trim().is_empty() {
                bail!("table cannot be empty");
            }
            config.table = value.trim().to_string();
        }
        "request_timeout_secs" => {
            config.request_timeout_secs = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a whole number of seconds.")?;
        }
        "check_interval_secs" => {
            config.check_interval_secs = value
                .parse()
                .context("Invalid value for check_interval_secs. Use a whole number of seconds.")?;
        }
        "log_file" => config.log_file = optional(value).map(Into::into),
        "log_level" => config.log_level = optional(value),
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, api_url, anon_key, table, request_timeout_secs, \
                 check_interval_secs, log_file, log_level",
                key
            );
        }
    }
    Ok(())
}

/// Show only the start of a key
fn mask(key: &str) -> String {
    let visible: String = key.chars().take(6).collect();
    format!("{}…", visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();
        apply(&mut config, "api_url", "https://abc.supabase.co/").unwrap();
        apply(&mut config, "anon_key", "eyJhbGciOi").unwrap();
        apply(&mut config, "check_interval_secs", "30").unwrap();
        apply(&mut config, "log_level", "debug").unwrap();

        assert_eq!(config.api_url.as_deref(), Some("https://abc.supabase.co"));
        assert_eq!(config.anon_key.as_deref(), Some("eyJhbGciOi"));
        assert_eq!(config.check_interval_secs, 30);
        assert_eq!(config.log_level.as_deref(), Some("debug"));

        apply(&mut config, "api_url", "none").unwrap();
        assert!(config.api_url.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_input() {
        let mut config = Config::default();
        assert!(apply(&mut config, "favorite_color", "blue").is_err());
        assert!(apply(&mut config, "request_timeout_secs", "soon").is_err());
        assert!(apply(&mut config, "table", "  ").is_err());
    }

    #[test]
    fn test_set_writes_to_cli_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!("data_dir = {:?}\n", temp_dir.path().join("data")),
        )
        .unwrap();
        let output = Output::new(OutputFormat::Quiet);

        set("table".to_string(), "tasks".to_string(), Some(&path), &output).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("table = \"tasks\""));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("eyJhbGciOiJIUzI1NiJ9"), "eyJhbG…");
    }
}
