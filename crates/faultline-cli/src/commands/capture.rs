//! Capture command - send a synthetic error through a real pipeline
//!
//! Useful to check the whole delivery path against a running collector.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use faultline_core::config::Config;
use faultline_core::Source;
use faultline_telemetry::{CaptureExtra, TelemetryPipeline, Thrown};
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct CaptureCommand {
    /// Capture point: frontend, http, unhandledrejection
    #[arg(long, default_value = "frontend")]
    source: Source,

    /// Error message
    #[arg(long)]
    message: String,

    /// Request URL (http captures)
    #[arg(long)]
    url: Option<String>,

    /// Request method (http captures)
    #[arg(long, default_value = "GET")]
    method: String,

    /// Seconds to wait for delivery
    #[arg(long, default_value_t = 10)]
    wait: u64,
}

impl CaptureCommand {
    fn extra(&self) -> CaptureExtra {
        match &self.url {
            Some(url) => CaptureExtra::request(url.clone(), self.method.clone()),
            None => CaptureExtra::default(),
        }
    }

    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let pipeline = TelemetryPipeline::from_config(config)
            .context("Failed to start the telemetry pipeline")?;

        info!(source = %self.source, message = %self.message, "Capturing synthetic error");
        let thrown = Thrown::error("Error", self.message.clone(), None);
        pipeline.capture(self.source, &thrown, self.extra());

        let drained = pipeline.flush(Duration::from_secs(self.wait)).await;
        let stats = pipeline.stats();

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "drained": drained,
                "stats": stats,
                "local_entries": pipeline.logs().len(),
            }));
        } else {
            if stats.suppressed > 0 {
                formatter.warn("Capture suppressed: logging-service events are never recorded");
            } else if stats.deduplicated > 0 {
                formatter.warn("Capture deduplicated");
            } else if stats.delivered > 0 {
                formatter.success(&format!("Delivered to {}", config.collector.logs_url()));
            } else if stats.timed_out > 0 {
                formatter.error("Delivery timed out; kept in the local log");
            } else if stats.failed > 0 {
                formatter.error("Delivery failed; kept in the local log");
            } else {
                formatter.warn("Delivery still pending");
            }
            formatter.field("Local log", &format!("{} entries", pipeline.logs().len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use faultline_core::RequestInfo;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        capture: CaptureCommand,
    }

    #[test]
    fn test_http_capture_carries_request() {
        let harness = Harness::try_parse_from([
            "capture", "--source", "http", "--message", "Server error", "--url", "/x",
        ])
        .unwrap();
        assert_eq!(harness.capture.source, Source::Http);
        assert_eq!(
            harness.capture.extra().request,
            Some(RequestInfo::new("/x", "GET"))
        );
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        assert!(Harness::try_parse_from(["capture", "--source", "console", "--message", "x"]).is_err());
    }
}
