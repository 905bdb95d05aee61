//! Remote error store client
//!
//! Talks to the collector's `/api/errors` endpoints. Each operation comes in
//! two flavours:
//!
//! - `try_*` returns the failure to the caller;
//! - the plain form never fails and substitutes a local fallback (empty list,
//!   `{"success": true}`, unknown stats) so the host application continues.

use faultline_core::config::CollectorConfig;
use faultline_core::{ErrorDocument, ErrorStats, TelemetryError};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Client of the collector's bounded error store
pub struct CollectorClient {
    client: Client,
    errors_url: String,
}

impl CollectorClient {
    pub fn new(config: &CollectorConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &CollectorConfig) -> Self {
        Self {
            client,
            errors_url: config.errors_url(),
        }
    }

    pub fn errors_url(&self) -> &str {
        &self.errors_url
    }

    fn fallback_success() -> Value {
        json!({ "success": true })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TelemetryError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::HttpStatus {
                status: status.as_u16(),
            });
        }
        let text = response
            .text()
            .await
            .map_err(|e| TelemetryError::Transport(e.to_string()))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn transport_error(e: reqwest::Error) -> TelemetryError {
        TelemetryError::Transport(e.to_string())
    }

    // ------------------------------------------------------------------------
    // Fallible operations
    // ------------------------------------------------------------------------

    /// Fetches the whole store.
    pub async fn try_load_document(&self) -> Result<ErrorDocument, TelemetryError> {
        let response = self
            .client
            .get(&self.errors_url)
            .send()
            .await
            .map_err(Self::transport_error)?;
        Self::decode(response).await
    }

    pub async fn try_load_errors(&self) -> Result<Vec<Value>, TelemetryError> {
        Ok(self.try_load_document().await?.errors)
    }

    pub async fn try_save_error(&self, error: &Value) -> Result<Value, TelemetryError> {
        let response = self
            .client
            .post(&self.errors_url)
            .json(error)
            .send()
            .await
            .map_err(Self::transport_error)?;
        Self::decode(response).await
    }

    pub async fn try_save_errors(&self, errors: &[Value]) -> Result<Value, TelemetryError> {
        let response = self
            .client
            .post(format!("{}/batch", self.errors_url))
            .json(&json!({ "errors": errors }))
            .send()
            .await
            .map_err(Self::transport_error)?;
        Self::decode(response).await
    }

    pub async fn try_error_stats(&self) -> Result<ErrorStats, TelemetryError> {
        let document = self.try_load_document().await?;
        Ok(ErrorStats {
            total: document.total_errors,
            last_updated: document
                .last_updated
                .unwrap_or_else(|| ErrorStats::unknown().last_updated),
        })
    }

    pub async fn try_clear_errors(&self) -> Result<Value, TelemetryError> {
        let response = self
            .client
            .delete(&self.errors_url)
            .send()
            .await
            .map_err(Self::transport_error)?;
        Self::decode(response).await
    }

    // ------------------------------------------------------------------------
    // Operations with fallback
    // ------------------------------------------------------------------------

    /// Stored errors, or an empty list when the collector is unavailable.
    pub async fn load_errors(&self) -> Vec<Value> {
        self.try_load_errors().await.unwrap_or_else(|e| {
            warn!(url = %self.errors_url, error = %e, "Failed to load remote errors, using empty list");
            Vec::new()
        })
    }

    pub async fn save_error(&self, error: &Value) -> Value {
        self.try_save_error(error).await.unwrap_or_else(|e| {
            debug!(url = %self.errors_url, error = %e, "Failed to save remote error, ignoring");
            Self::fallback_success()
        })
    }

    pub async fn save_errors(&self, errors: &[Value]) -> Value {
        self.try_save_errors(errors).await.unwrap_or_else(|e| {
            debug!(url = %self.errors_url, count = errors.len(), error = %e, "Failed to save remote errors, ignoring");
            Self::fallback_success()
        })
    }

    /// Store summary, or `{total: 0, lastUpdated: "Unknown"}`.
    pub async fn error_stats(&self) -> ErrorStats {
        self.try_error_stats().await.unwrap_or_else(|e| {
            warn!(url = %self.errors_url, error = %e, "Failed to read remote error stats");
            ErrorStats::unknown()
        })
    }

    pub async fn clear_errors(&self) -> Value {
        self.try_clear_errors().await.unwrap_or_else(|e| {
            debug!(url = %self.errors_url, error = %e, "Failed to clear remote errors, ignoring");
            Self::fallback_success()
        })
    }
}

#[cfg(test)]
mod tests {
    use faultline_core::config::ConfigBuilder;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(base_url: &str) -> CollectorClient {
        let config = ConfigBuilder::new().collector_base_url(base_url).build();
        CollectorClient::new(&config.collector)
    }

    fn unreachable() -> CollectorClient {
        client_for("http://127.0.0.1:9")
    }

    #[tokio::test]
    async fn test_load_errors_and_stats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/errors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{"message": "a"}, {"message": "b"}],
                "lastUpdated": "2025-01-01T00:00:00Z",
                "totalErrors": 2
            })))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let errors = client.load_errors().await;
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1]["message"], "b");

        let stats = client.error_stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.last_updated, "2025-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_stats_after_reset_report_unknown_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/errors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [],
                "lastUpdated": null,
                "totalErrors": 0
            })))
            .mount(&server)
            .await;

        let stats = client_for(&server.uri()).error_stats().await;
        assert_eq!(stats, ErrorStats::unknown());
    }

    #[tokio::test]
    async fn test_save_errors_posts_batch_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/errors/batch"))
            .and(body_json(json!({"errors": [{"message": "a"}]})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "count": 1})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let reply = client.save_errors(&[json!({"message": "a"})]).await;
        assert_eq!(reply["count"], 1);
    }

    #[tokio::test]
    async fn test_server_error_is_reported_by_try_and_hidden_by_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/errors"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client.try_save_error(&json!({"message": "x"})).await.unwrap_err();
        assert!(matches!(err, TelemetryError::HttpStatus { status: 500 }));
        assert_eq!(
            client.save_error(&json!({"message": "x"})).await,
            json!({"success": true})
        );
    }

    #[tokio::test]
    async fn test_unreachable_collector_uses_fallbacks() {
        let client = unreachable();
        assert!(client.load_errors().await.is_empty());
        assert_eq!(client.error_stats().await, ErrorStats::unknown());
        assert_eq!(client.clear_errors().await, json!({"success": true}));
        assert_eq!(client.save_errors(&[]).await, json!({"success": true}));
    }
}
