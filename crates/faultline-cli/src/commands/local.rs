//! Local command - inspect the persisted local log store
//!
//! The store is read straight from the state directory; no collector is
//! contacted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use faultline_core::config::Config;
use faultline_core::LogPayload;
use tracing::info;

use super::open_local_store;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum LocalCommand {
    /// List stored payloads, oldest first
    Show {
        /// Only the N most recent entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Export the store as pretty-printed JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Empty the store
    Clear,
}

impl LocalCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        match self {
            LocalCommand::Show { limit } => execute_show(config, *limit, format),
            LocalCommand::Export { output } => execute_export(config, output.as_ref(), format),
            LocalCommand::Clear => execute_clear(config, format),
        }
    }
}

fn most_recent(entries: Vec<LogPayload>, limit: Option<usize>) -> Vec<LogPayload> {
    match limit {
        Some(n) if n < entries.len() => entries[entries.len() - n..].to_vec(),
        _ => entries,
    }
}

/// One line per payload: time, source, message and request if any.
fn summary_line(payload: &LogPayload) -> String {
    let mut line = format!("{} [{}] {}", payload.time, payload.source, payload.message);
    if let Some(request) = &payload.request {
        line.push_str(&format!(" ({} {})", request.method, request.url));
    }
    line
}

fn execute_show(config: &Config, limit: Option<usize>, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let store = open_local_store(config);
    let total = store.len();
    let entries = most_recent(store.all(), limit);

    info!(state_dir = %config.pipeline.state_dir.display(), total, "Showing local log");

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "total": total,
            "capacity": store.capacity(),
            "entries": entries,
        }));
        return Ok(());
    }

    if entries.is_empty() {
        formatter.success("Local log is empty");
        return Ok(());
    }

    formatter.success(&format!(
        "Local log: {} of {} entries (capacity {})",
        entries.len(),
        total,
        store.capacity()
    ));
    for payload in &entries {
        formatter.info(&summary_line(payload));
    }
    Ok(())
}

fn execute_export(config: &Config, output: Option<&PathBuf>, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let store = open_local_store(config);
    let text = store.export_as_text();

    match output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": true,
                    "entries": store.len(),
                    "path": path.display().to_string(),
                }));
            } else {
                formatter.success(&format!("Exported {} entries to {}", store.len(), path.display()));
            }
        }
        // The export is JSON already, in both output modes
        None => println!("{}", text),
    }
    Ok(())
}

fn execute_clear(config: &Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let mut store = open_local_store(config);
    let removed = store.len();
    store.clear();
    store
        .try_persist()
        .context("Failed to persist the emptied local log")?;

    if format.is_json() {
        formatter.print_json(&serde_json::json!({"success": true, "removed": removed}));
    } else {
        formatter.success(&format!("Removed {} entries from the local log", removed));
    }
    Ok(())
}
