//! Delivery rate limiting and queueing
//!
//! - [`DeliveryRateLimiter`] enforces a minimum interval between two sends.
//! - [`DeliveryQueue`] holds payloads that arrived too early, in FIFO order,
//!   and tracks whether the single drain task is running.
//!
//! Both are plain state machines driven by the pipeline under its lock; the
//! pipeline owns the timers and the spawned tasks.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use faultline_core::{LogPayload, TelemetryError};
use tokio::time::Instant;

/// Default minimum spacing between sends.
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(1000);

// ============================================================================
// DeliveryRateLimiter
// ============================================================================

/// Minimum-interval limiter
///
/// Unlike a token bucket there is no burst: once a send happened at `t`,
/// the next one may only happen at `t + interval`.
#[derive(Debug)]
pub struct DeliveryRateLimiter {
    interval: Duration,
    last_send: Option<Instant>,
}

impl DeliveryRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: None,
        }
    }

    /// Whether a send is allowed at `now`.
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_send {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Records a send at `now`.
    pub fn mark_sent(&mut self, now: Instant) {
        self.last_send = Some(now);
    }

    /// Records a send at `now` if allowed; returns whether it was.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if self.ready(now) {
            self.mark_sent(now);
            true
        } else {
            false
        }
    }

    /// Earliest instant at which the next send is allowed.
    pub fn next_slot(&self, now: Instant) -> Instant {
        match self.last_send {
            Some(last) => (last + self.interval).max(now),
            None => now,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_send(&self) -> Option<Instant> {
        self.last_send
    }
}

impl Default for DeliveryRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT)
    }
}

// ============================================================================
// DeliveryQueue
// ============================================================================

/// FIFO of payloads waiting for a send slot, with the drain guard
///
/// Invariant: while the queue is non-empty, `draining` is `true`. The flag is
/// only cleared by [`DeliveryQueue::pop_or_finish`] when it observes an
/// empty queue, so at most one drain task exists at any time.
#[derive(Debug, Default)]
pub struct DeliveryQueue {
    pending: VecDeque<LogPayload>,
    draining: bool,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a payload.
    ///
    /// Returns `true` when the caller must start the drain task.
    pub fn push(&mut self, payload: LogPayload) -> bool {
        self.pending.push_back(payload);
        if self.draining {
            false
        } else {
            self.draining = true;
            true
        }
    }

    /// Pops the oldest payload, or ends the drain when nothing is left.
    pub fn pop_or_finish(&mut self) -> Option<LogPayload> {
        let next = self.pending.pop_front();
        if next.is_none() {
            self.draining = false;
        }
        next
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ============================================================================
// DeliveryOutcome
// ============================================================================

/// Result of one delivery attempt. None of them is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
    TimedOut,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::Failed(_) => "failed",
            DeliveryOutcome::TimedOut => "timed_out",
        }
    }
}

impl From<Result<(), TelemetryError>> for DeliveryOutcome {
    fn from(result: Result<(), TelemetryError>) -> Self {
        match result {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(TelemetryError::Timeout(_)) => DeliveryOutcome::TimedOut,
            Err(e) => DeliveryOutcome::Failed(e.to_string()),
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            other => f.write_str(other.as_str()),
        }
    }
}
