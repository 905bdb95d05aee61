//! Telemetry error types
//!
//! Every adapter (storage, transport, serializer) reports failures through
//! [`TelemetryError`]. The pipeline never lets these escape to the host
//! application; they end up as diagnostic log lines.

use thiserror::Error;

/// Errors raised by telemetry adapters
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Durable client-side storage could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// A value could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The outbound request could not be performed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The collector answered with a non-2xx status
    #[error("Collector responded with HTTP {status}")]
    HttpStatus {
        /// The HTTP status code received
        status: u16,
    },

    /// The delivery did not complete within the configured window
    #[error("Delivery timed out after {0} ms")]
    Timeout(u64),

    /// A component that spawns background work was built outside a Tokio runtime
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),

    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TelemetryError {
    /// Whether the error came from the network leg of a delivery.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(
            self,
            TelemetryError::Transport(_)
                | TelemetryError::HttpStatus { .. }
                | TelemetryError::Timeout(_)
        )
    }
}
