//! Log transport port
//!
//! ## Design Notes
//!
//! - One call delivers exactly one payload. The pipeline never retries, so
//!   implementations must not retry either.
//! - The pipeline applies its own timeout around `send`; implementations may
//!   add a shorter one but must not block beyond it.

use async_trait::async_trait;

use crate::domain::{LogPayload, TelemetryError};

/// Delivers log payloads to the remote log collector
#[async_trait]
pub trait LogTransport: Send + Sync {
    /// Sends a single payload.
    ///
    /// Any non-2xx answer must be reported as [`TelemetryError::HttpStatus`].
    async fn send(&self, payload: &LogPayload) -> Result<(), TelemetryError>;

    /// Whether `url` targets the endpoint this transport delivers to.
    ///
    /// HTTP capture points use this to avoid logging their own delivery
    /// failures.
    fn targets(&self, url: &str) -> bool {
        let _ = url;
        false
    }
}
