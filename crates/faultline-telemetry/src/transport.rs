//! HTTP delivery to the remote log collector

use async_trait::async_trait;
use faultline_core::config::CollectorConfig;
use faultline_core::ports::LogTransport;
use faultline_core::{LogPayload, TelemetryError};
use reqwest::Client;
use tracing::debug;

/// Agent string sent with every delivery
const USER_AGENT: &str = concat!("faultline/", env!("CARGO_PKG_VERSION"));

/// [`LogTransport`] posting one JSON payload per request
pub struct HttpTransport {
    client: Client,
    logs_url: String,
    logs_path: String,
}

impl HttpTransport {
    pub fn new(config: &CollectorConfig) -> Result<Self, TelemetryError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TelemetryError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    /// Uses a caller-provided client (custom TLS, proxies, tests).
    pub fn with_client(client: Client, config: &CollectorConfig) -> Self {
        Self {
            client,
            logs_url: config.logs_url(),
            logs_path: config.logs_path.clone(),
        }
    }

    pub fn logs_url(&self) -> &str {
        &self.logs_url
    }
}

#[async_trait]
impl LogTransport for HttpTransport {
    async fn send(&self, payload: &LogPayload) -> Result<(), TelemetryError> {
        let response = self
            .client
            .post(&self.logs_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| TelemetryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::HttpStatus {
                status: status.as_u16(),
            });
        }

        debug!(url = %self.logs_url, status = status.as_u16(), "Payload accepted by collector");
        Ok(())
    }

    /// Matches any URL whose path ends with the configured logs path,
    /// whatever its host.
    fn targets(&self, url: &str) -> bool {
        let path = url
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or(url);
        path.ends_with(self.logs_path.as_str())
    }
}
