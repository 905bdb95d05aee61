//! Shared helpers for telemetry integration tests
//!
//! Each helper mounts the collector endpoints the pipeline talks to and
//! returns a configuration pointing at the mock server.

use std::path::Path;
use std::time::Duration;

use faultline_core::config::{Config, ConfigBuilder};
use faultline_core::LogPayload;
use faultline_telemetry::TelemetryPipeline;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Upper bound for waiting on the delivery queue in tests.
pub const FLUSH_WAIT: Duration = Duration::from_secs(10);

/// Starts a mock collector answering `POST /api/logs` with `status`.
pub async fn setup_collector_mock(status: u16) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "success": status < 400
        })))
        .mount(&server)
        .await;

    server
}

/// Configuration delivering to `server`, keeping state in `state_dir`.
///
/// The rate limit is shortened so queued payloads drain quickly.
pub fn config_for(server: &MockServer, state_dir: &Path) -> Config {
    ConfigBuilder::new()
        .collector_base_url(server.uri())
        .pipeline_state_dir(state_dir.to_path_buf())
        .pipeline_rate_limit_ms(50)
        .pipeline_timeout_ms(2000)
        .build()
}

pub fn pipeline_for(config: &Config) -> TelemetryPipeline {
    TelemetryPipeline::from_config(config).expect("pipeline")
}

/// Payloads received by the mock collector on `/api/logs`, in order.
pub async fn delivered_payloads(server: &MockServer) -> Vec<LogPayload> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == "/api/logs")
        .map(|r| serde_json::from_slice(&r.body).expect("payload json"))
        .collect()
}

/// Local log as persisted on disk.
pub fn persisted_log(state_dir: &Path) -> Vec<LogPayload> {
    let raw = std::fs::read_to_string(state_dir.join("app-error-logs.json")).expect("state file");
    serde_json::from_str(&raw).expect("state json")
}
