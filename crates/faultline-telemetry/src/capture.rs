//! Capture adapters
//!
//! Entry points through which the host application reports failures:
//!
//! - [`install_panic_capture`]: uncaught synchronous errors (panics), `frontend`
//! - [`watch_task`]: spawned tasks that fail or panic, `unhandledrejection`
//! - [`InterceptedClient`]: outbound requests that fail, `http`
//!
//! Each adapter reports through the pipeline and then lets the failure
//! continue as it would have without telemetry.

use std::error::Error as StdError;

use faultline_core::Source;
use reqwest::{Client, Request, RequestBuilder, Response};
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::pipeline::{CaptureExtra, TelemetryPipeline};
use crate::reentry::{self, Reentry};
use crate::serializer::{OwnProperties, Thrown};

/// Shown when no response was received at all.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error: please check your internet connection.";

/// Shown when a failed response carries nothing more specific.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";

// ============================================================================
// Panics
// ============================================================================

/// Installs a panic hook that captures every panic as a `frontend` error.
///
/// Chains with the existing panic hook so default behavior (stderr output)
/// is preserved. Not captured:
///
/// - panics raised by telemetry itself (storage adapters, property getters,
///   code holding the pipeline lock);
/// - panics carrying an [`HttpFailure`], already captured by
///   [`InterceptedClient`].
pub fn install_panic_capture(pipeline: TelemetryPipeline) {
    let previous_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        if reentry::is_active() {
            previous_hook(panic_info);
            return;
        }
        let _reentry = Reentry::enter();

        if panic_info.payload().is::<HttpFailure>() {
            debug!("Panic carries an HTTP failure, already captured");
        } else {
            let location = panic_info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));

            let backtrace = std::backtrace::Backtrace::capture();
            let backtrace = match backtrace.status() {
                std::backtrace::BacktraceStatus::Captured => Some(backtrace.to_string()),
                _ => None,
            };

            let thrown = Thrown::from_panic(panic_info.payload(), location, backtrace);
            pipeline.capture(Source::Frontend, &thrown, CaptureExtra::default());
        }

        previous_hook(panic_info);
    }));
}

// ============================================================================
// Tasks
// ============================================================================

/// Watches a spawned task and captures its failure as an unhandled rejection.
///
/// The returned handle yields the task's value, or `None` when the task
/// failed, panicked or was cancelled. Cancellation is not captured.
pub fn watch_task<T, E>(
    pipeline: &TelemetryPipeline,
    handle: JoinHandle<Result<T, E>>,
) -> JoinHandle<Option<T>>
where
    T: Send + 'static,
    E: Into<Box<dyn StdError + Send + Sync>> + Send + 'static,
{
    let pipeline = pipeline.clone();
    let runtime = pipeline.runtime().clone();

    runtime.spawn(async move {
        match handle.await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                let e: Box<dyn StdError + Send + Sync> = e.into();
                let thrown = Thrown::from_error(e.as_ref());
                pipeline.capture(Source::UnhandledRejection, &thrown, CaptureExtra::default());
                None
            }
            Err(join_error) if join_error.is_panic() => {
                let payload = join_error.into_panic();
                let thrown = Thrown::from_panic(&*payload, None, None);
                pipeline.capture(Source::UnhandledRejection, &thrown, CaptureExtra::default());
                None
            }
            Err(_) => {
                debug!("Watched task was cancelled");
                None
            }
        }
    })
}

// ============================================================================
// HTTP failures
// ============================================================================

/// A failed outbound request
///
/// `status` is `0` when no response was received (connection refused, DNS
/// failure, timeout, invalid request).
#[derive(Debug, Clone, Error)]
#[error("{description}")]
pub struct HttpFailure {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub status_text: String,
    /// Response body, parsed as JSON when possible
    pub body: Option<Value>,
    pub description: String,
}

impl HttpFailure {
    /// A failure without any response.
    pub fn network(url: impl Into<String>, method: impl Into<String>, error: &reqwest::Error) -> Self {
        let url = url.into();
        Self {
            description: format!("Http failure response for {}: 0 Unknown Error", url),
            url,
            method: method.into(),
            status: 0,
            status_text: "Unknown Error".to_string(),
            body: Some(Value::String(error.to_string())),
        }
    }

    /// A failure built from a non-2xx response. Consumes the body.
    pub async fn from_response(
        url: impl Into<String>,
        method: impl Into<String>,
        response: Response,
    ) -> Self {
        let url = url.into();
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();

        let body = match response.text().await {
            Ok(text) if text.is_empty() => None,
            Ok(text) => Some(serde_json::from_str(&text).unwrap_or(Value::String(text))),
            Err(e) => {
                debug!(url = %url, error = %e, "Failed to read error response body");
                None
            }
        };

        Self {
            description: format!(
                "Http failure response for {}: {} {}",
                url,
                status.as_u16(),
                status_text
            ),
            url,
            method: method.into(),
            status: status.as_u16(),
            status_text,
            body,
        }
    }

    /// Whether a response was received at all.
    pub fn is_network_error(&self) -> bool {
        self.status == 0
    }

    /// Message suitable for end users.
    ///
    /// In order: the network-failure notice, the `message` field of a JSON
    /// body, the failure description, the status text, a generic notice.
    pub fn user_message(&self) -> String {
        if self.is_network_error() {
            return NETWORK_ERROR_MESSAGE.to_string();
        }

        let body_message = self
            .body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty());

        if let Some(message) = body_message {
            message.to_string()
        } else if !self.description.is_empty() {
            self.description.clone()
        } else if !self.status_text.is_empty() {
            self.status_text.clone()
        } else {
            UNEXPECTED_ERROR_MESSAGE.to_string()
        }
    }
}

impl OwnProperties for HttpFailure {
    fn property_names(&self) -> Result<Vec<String>, String> {
        Ok([
            "name",
            "status",
            "statusText",
            "url",
            "method",
            "message",
            "description",
            "error",
        ]
        .iter()
        .map(|n| n.to_string())
        .collect())
    }

    fn read_property(&self, name: &str) -> Result<Value, String> {
        match name {
            "name" => Ok(Value::from("HttpErrorResponse")),
            "status" => Ok(Value::from(self.status)),
            "statusText" => Ok(Value::from(self.status_text.as_str())),
            "url" => Ok(Value::from(self.url.as_str())),
            "method" => Ok(Value::from(self.method.as_str())),
            "message" => Ok(Value::from(self.user_message())),
            "description" => Ok(Value::from(self.description.as_str())),
            "error" => Ok(self.body.clone().unwrap_or(Value::Null)),
            other => Err(format!("no property '{}'", other)),
        }
    }
}

/// `reqwest` client that reports failed requests to the pipeline
///
/// Non-2xx responses and transport errors come back as `Err(HttpFailure)`
/// after being captured. Requests to the delivery endpoint itself are never
/// captured.
#[derive(Clone)]
pub struct InterceptedClient {
    client: Client,
    pipeline: TelemetryPipeline,
}

impl InterceptedClient {
    pub fn new(pipeline: TelemetryPipeline) -> Self {
        Self::with_client(Client::new(), pipeline)
    }

    pub fn with_client(client: Client, pipeline: TelemetryPipeline) -> Self {
        Self { client, pipeline }
    }

    /// The wrapped client, for building requests.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub async fn get(&self, url: &str) -> Result<Response, HttpFailure> {
        self.send(self.client.get(url)).await
    }

    /// Builds and executes a request.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, HttpFailure> {
        match builder.build() {
            Ok(request) => self.execute(request).await,
            Err(e) => {
                let url = e.url().map(|u| u.to_string()).unwrap_or_default();
                Err(self.intercept(HttpFailure::network(url, "", &e)))
            }
        }
    }

    pub async fn execute(&self, request: Request) -> Result<Response, HttpFailure> {
        let url = request.url().to_string();
        let method = request.method().to_string();

        let failure = match self.client.execute(request).await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => HttpFailure::from_response(url, method, response).await,
            Err(e) => HttpFailure::network(url, method, &e),
        };

        Err(self.intercept(failure))
    }

    fn intercept(&self, failure: HttpFailure) -> HttpFailure {
        warn!(
            url = %failure.url,
            status = failure.status,
            user_message = %failure.user_message(),
            "HTTP request failed"
        );

        if self.pipeline.is_delivery_endpoint(&failure.url) {
            debug!(url = %failure.url, "Not capturing failure of the delivery endpoint");
            return failure;
        }

        let extra = CaptureExtra::request(failure.url.clone(), failure.method.clone());
        self.pipeline
            .capture(Source::Http, &Thrown::object(failure.clone()), extra);
        failure
    }
}
