//! Config command - View and manage Faultline configuration
//!
//! Provides the `faultline config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration and reports errors

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use faultline_core::config::Config;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "pipeline.rate_limit_ms")
        key: String,
        /// New value
        value: String,
    },
    /// Validate the configuration
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(config, path, format),
            ConfigCommand::Set { key, value } => execute_set(config, path, key, value, format),
            ConfigCommand::Validate => execute_validate(config, path, format),
        }
    }
}

fn execute_show(config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    info!(config_path = %path.display(), "Showing configuration");

    if format.is_json() {
        let json =
            serde_json::to_value(config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", path.display()));
        formatter.info("");
        let yaml = config.to_yaml().context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }
    Ok(())
}

fn execute_set(config: &Config, path: &Path, key: &str, value: &str, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let mut updated = config.clone();

    info!(key = %key, value = %value, "Setting configuration value");
    apply_config_value(&mut updated, key, value)?;

    let problems: Vec<String> = updated.validate().iter().map(|e| e.to_string()).collect();
    if !problems.is_empty() {
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "errors": problems,
            }));
        } else {
            formatter.error(&format!("Invalid value for '{}': {}", key, problems.join("; ")));
        }
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = updated.to_yaml().context("Failed to serialize configuration")?;
    std::fs::write(path, yaml).context("Failed to write configuration file")?;

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {} = {}", key, value));
        formatter.info(&format!("Saved to {}", path.display()));
    }
    Ok(())
}

fn execute_validate(config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let problems = config.validate();

    if format.is_json() {
        let errors: Vec<_> = problems
            .iter()
            .map(|e| serde_json::json!({"field": e.field, "message": e.message}))
            .collect();
        formatter.print_json(&serde_json::json!({
            "valid": problems.is_empty(),
            "config_path": path.display().to_string(),
            "errors": errors,
        }));
    } else if problems.is_empty() {
        formatter.success(&format!("Configuration is valid ({})", path.display()));
    } else {
        formatter.error(&format!("{} problem(s) in {}", problems.len(), path.display()));
        for problem in &problems {
            formatter.info(&problem.to_string());
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("Configuration is invalid")
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .with_context(|| format!("Expected a non-negative integer for {}", key))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => anyhow::bail!("Expected true or false for {}", key),
    }
}

fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- pipeline ---
        "pipeline.dedupe_capacity" => config.pipeline.dedupe_capacity = parse_number(key, value)?,
        "pipeline.store_capacity" => config.pipeline.store_capacity = parse_number(key, value)?,
        "pipeline.rate_limit_ms" => config.pipeline.rate_limit_ms = parse_number(key, value)?,
        "pipeline.timeout_ms" => config.pipeline.timeout_ms = parse_number(key, value)?,
        "pipeline.storage_key" => config.pipeline.storage_key = value.to_string(),
        "pipeline.state_dir" => config.pipeline.state_dir = PathBuf::from(value),
        "pipeline.user_agent" => {
            config.pipeline.user_agent = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }

        // --- collector ---
        "collector.base_url" => config.collector.base_url = value.to_string(),
        "collector.logs_path" => config.collector.logs_path = value.to_string(),
        "collector.errors_path" => config.collector.errors_path = value.to_string(),

        // --- alert ---
        "alert.clear_delay_ms" => config.alert.clear_delay_ms = parse_number(key, value)?,

        // --- server ---
        "server.listen" => config.server.listen = value.to_string(),
        "server.errors_file" => config.server.errors_file = PathBuf::from(value),
        "server.max_errors" => config.server.max_errors = parse_number(key, value)?,
        "server.metrics_enabled" => config.server.metrics_enabled = parse_bool(key, value)?,

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),

        _ => anyhow::bail!("Unknown configuration key '{}'", key),
    }
    Ok(())
}
