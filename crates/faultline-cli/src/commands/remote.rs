//! Remote command - manage the collector's error store

use anyhow::{Context, Result};
use clap::Subcommand;
use faultline_core::config::Config;
use faultline_telemetry::CollectorClient;
use serde_json::Value;
use tracing::info;

use super::open_local_store;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum RemoteCommand {
    /// List errors held by the collector
    List {
        /// Only the N most recent errors
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the collector's store summary
    Stats,
    /// Remove every error from the collector
    Clear,
    /// Upload the local log to the collector as one batch
    Push {
        /// Empty the local log after a successful upload
        #[arg(long)]
        clear_local: bool,
    },
}

impl RemoteCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let client = CollectorClient::new(&config.collector);
        info!(url = %client.errors_url(), "Using collector");

        match self {
            RemoteCommand::List { limit } => execute_list(&client, *limit, format).await,
            RemoteCommand::Stats => execute_stats(&client, format).await,
            RemoteCommand::Clear => execute_clear(&client, format).await,
            RemoteCommand::Push { clear_local } => {
                execute_push(&client, config, *clear_local, format).await
            }
        }
    }
}

/// Best-effort one-line description of a stored record.
fn describe(record: &Value) -> String {
    let field = |name: &str| record.get(name).and_then(Value::as_str).unwrap_or("");
    let message = match field("message") {
        "" => record.to_string(),
        m => m.to_string(),
    };
    match (field("time"), field("source")) {
        ("", "") => message,
        (time, "") => format!("{} {}", time, message),
        (time, source) => format!("{} [{}] {}", time, source, message),
    }
}

async fn execute_list(client: &CollectorClient, limit: Option<usize>, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let errors = client
        .try_load_errors()
        .await
        .with_context(|| format!("Failed to load errors from {}", client.errors_url()))?;

    let shown = match limit {
        Some(n) if n < errors.len() => &errors[errors.len() - n..],
        _ => &errors[..],
    };

    if format.is_json() {
        formatter.print_json(&Value::Array(shown.to_vec()));
        return Ok(());
    }

    if shown.is_empty() {
        formatter.success("Collector holds no errors");
        return Ok(());
    }

    formatter.success(&format!("{} of {} errors", shown.len(), errors.len()));
    for record in shown {
        formatter.info(&describe(record));
    }
    Ok(())
}

async fn execute_stats(client: &CollectorClient, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let stats = client
        .try_error_stats()
        .await
        .with_context(|| format!("Failed to read stats from {}", client.errors_url()))?;

    if format.is_json() {
        formatter.print_json(&serde_json::to_value(&stats)?);
    } else {
        formatter.success("Collector error store");
        formatter.field("Total", &stats.total.to_string());
        formatter.field("Last updated", &stats.last_updated);
    }
    Ok(())
}

async fn execute_clear(client: &CollectorClient, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let reply = client
        .try_clear_errors()
        .await
        .with_context(|| format!("Failed to clear {}", client.errors_url()))?;

    if format.is_json() {
        formatter.print_json(&reply);
    } else {
        formatter.success("Collector error store cleared");
    }
    Ok(())
}

async fn execute_push(
    client: &CollectorClient,
    config: &Config,
    clear_local: bool,
    format: OutputFormat,
) -> Result<()> {
    let formatter = get_formatter(format);
    let mut store = open_local_store(config);

    if store.is_empty() {
        formatter.warn("Local log is empty, nothing to push");
        return Ok(());
    }

    let records = store
        .all()
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to encode local log")?;

    let reply = client
        .try_save_errors(&records)
        .await
        .with_context(|| format!("Failed to push to {}", client.errors_url()))?;

    if clear_local {
        store.clear();
    }

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "pushed": records.len(),
            "cleared_local": clear_local,
            "reply": reply,
        }));
    } else {
        formatter.success(&format!("Pushed {} entries to the collector", records.len()));
        if clear_local {
            formatter.info("Local log cleared");
        }
    }
    Ok(())
}
