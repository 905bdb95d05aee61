//! Transient alert banner
//!
//! Holds at most one user-facing message. Every `show` schedules its own
//! clear after the configured delay; an earlier timer can therefore clear a
//! later message before its own delay has elapsed. This is a known
//! limitation of the banner.

use std::sync::Arc;
use std::time::Duration;

use faultline_core::config::AlertConfig;
use faultline_core::TelemetryError;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::debug;

/// Single-slot message surface with timed auto-clear
#[derive(Clone)]
pub struct AlertBanner {
    tx: Arc<watch::Sender<Option<String>>>,
    delay: Duration,
    runtime: Handle,
}

impl AlertBanner {
    /// Creates an empty banner bound to the current Tokio runtime.
    pub fn new(config: &AlertConfig) -> Result<Self, TelemetryError> {
        let runtime =
            Handle::try_current().map_err(|e| TelemetryError::NoRuntime(e.to_string()))?;
        Ok(Self::with_runtime(config.clear_delay(), runtime))
    }

    pub fn with_runtime(delay: Duration, runtime: Handle) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            delay,
            runtime,
        }
    }

    /// Replaces the current message and schedules a clear.
    pub fn show(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(message = %message, "Showing alert");
        self.tx.send_replace(Some(message));

        let tx = Arc::clone(&self.tx);
        let delay = self.delay;
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_replace(None);
        });
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// The message currently shown, if any.
    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}
