//! Telemetry pipeline
//!
//! [`TelemetryPipeline`] is the single entry point of every capture point.
//! One instance is created by the application root and handed (cloned) to
//! each capture adapter; clones share the same state.
//!
//! ## Flow
//!
//! ```text
//! capture ─→ serialize ─→ dedupe ─→ local store ─→ rate limiter ─┬─→ send now
//!                                                                 └─→ queue ─→ drain task ─→ send
//! send ─→ timeout ─→ (delivered | failed | timed out) ─→ persist local store
//! ```
//!
//! ## Concurrency
//!
//! All mutable state lives behind one mutex and is only touched in short
//! synchronous sections, never across an `.await`. Sends are spawned on the
//! runtime captured at construction, so `capture` never blocks and can be
//! called from synchronous code such as a panic hook. At most one drain task
//! runs at a time (see [`DeliveryQueue`]).

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use faultline_core::config::{Config, PipelineConfig};
use faultline_core::ports::{LogTransport, StateStorage};
use faultline_core::{LogPayload, RequestInfo, Source, TelemetryError};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dedupe::DedupeIndex;
use crate::delivery::{DeliveryOutcome, DeliveryQueue, DeliveryRateLimiter};
use crate::reentry::Reentry;
use crate::serializer::{serialize_with_message, Thrown};
use crate::state::FileStateStorage;
use crate::store::LocalLogStore;
use crate::transport::HttpTransport;

/// Optional context attached to a capture
#[derive(Debug, Clone, Default)]
pub struct CaptureExtra {
    /// The failed outbound request, for `http` captures
    pub request: Option<RequestInfo>,
    /// Location of the host application at capture time
    pub url: Option<String>,
}

impl CaptureExtra {
    pub fn request(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            request: Some(RequestInfo::new(url, method)),
            url: None,
        }
    }
}

/// Counters describing what the pipeline did since it started
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Payloads accepted into the local store
    pub captured: u64,
    /// Captures dropped because their fingerprint was recently seen
    pub deduplicated: u64,
    /// Captures dropped because they came from the pipeline itself
    pub suppressed: u64,
    /// Payloads that had to wait for a send slot
    pub queued: u64,
    pub delivered: u64,
    pub failed: u64,
    pub timed_out: u64,
}

struct PipelineState {
    dedupe: DedupeIndex,
    store: LocalLogStore,
    limiter: DeliveryRateLimiter,
    queue: DeliveryQueue,
    stats: PipelineStats,
    in_flight: usize,
}

impl PipelineState {
    fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.queue.is_empty() && !self.queue.is_draining()
    }
}

/// Pipeline state locked by the current thread.
///
/// Marks the thread as running telemetry code for as long as the lock is
/// held, so a panic raised meanwhile is not fed back into the pipeline.
struct StateGuard<'a> {
    state: MutexGuard<'a, PipelineState>,
    _reentry: Reentry,
}

impl Deref for StateGuard<'_> {
    type Target = PipelineState;

    fn deref(&self) -> &PipelineState {
        &self.state
    }
}

impl DerefMut for StateGuard<'_> {
    fn deref_mut(&mut self) -> &mut PipelineState {
        &mut self.state
    }
}

struct Shared {
    state: Mutex<PipelineState>,
    transport: Arc<dyn LogTransport>,
    runtime: Handle,
    timeout: Duration,
    user_agent: Option<String>,
    idle: Notify,
}

/// What a capture decided to do with its payload
enum Dispatch {
    SendNow(LogPayload),
    StartDrain,
    Queued,
}

/// Capture-and-delivery pipeline; cheap to clone
#[derive(Clone)]
pub struct TelemetryPipeline {
    shared: Arc<Shared>,
}

impl TelemetryPipeline {
    /// Creates a pipeline bound to the current Tokio runtime.
    ///
    /// Restores the persisted local log before returning.
    pub fn new(
        config: &PipelineConfig,
        transport: Arc<dyn LogTransport>,
        storage: Arc<dyn StateStorage>,
    ) -> Result<Self, TelemetryError> {
        let runtime = Handle::try_current().map_err(|e| TelemetryError::NoRuntime(e.to_string()))?;
        Ok(Self::with_runtime(config, transport, storage, runtime))
    }

    /// Creates a pipeline that spawns its background work on `runtime`.
    pub fn with_runtime(
        config: &PipelineConfig,
        transport: Arc<dyn LogTransport>,
        storage: Arc<dyn StateStorage>,
        runtime: Handle,
    ) -> Self {
        let mut store = LocalLogStore::new(
            storage,
            config.storage_key.clone(),
            config.store_capacity,
        );
        let restored = store.load();

        info!(
            restored,
            rate_limit_ms = config.rate_limit_ms,
            timeout_ms = config.timeout_ms,
            "Telemetry pipeline ready"
        );

        let state = PipelineState {
            dedupe: DedupeIndex::new(config.dedupe_capacity),
            store,
            limiter: DeliveryRateLimiter::new(config.rate_limit()),
            queue: DeliveryQueue::new(),
            stats: PipelineStats::default(),
            in_flight: 0,
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                transport,
                runtime,
                timeout: config.timeout(),
                user_agent: config.user_agent.clone(),
                idle: Notify::new(),
            }),
        }
    }

    /// Builds the standard pipeline: file-backed local state and HTTP
    /// delivery to the configured collector.
    pub fn from_config(config: &Config) -> Result<Self, TelemetryError> {
        let storage = Arc::new(FileStateStorage::new(config.pipeline.state_dir.clone()));
        let transport = Arc::new(HttpTransport::new(&config.collector)?);
        Self::new(&config.pipeline, transport, storage)
    }

    fn lock(&self) -> StateGuard<'_> {
        let reentry = Reentry::enter();
        let state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        StateGuard {
            state,
            _reentry: reentry,
        }
    }

    // ========================================================================
    // Capture
    // ========================================================================

    /// Captures a thrown value.
    ///
    /// Never blocks, never fails: duplicates and self-generated events are
    /// dropped silently, everything else is stored and scheduled for delivery.
    pub fn capture(&self, source: Source, thrown: &Thrown, extra: CaptureExtra) {
        if source == Source::LoggingService {
            self.note_suppressed();
            return;
        }

        let (error, message) = serialize_with_message(thrown);
        let mut payload = LogPayload::error(source, message).with_error(error);
        if let Some(request) = extra.request {
            payload = payload.with_request(request);
        }
        if let Some(url) = extra.url {
            payload = payload.with_url(url);
        }

        self.capture_payload(payload);
    }

    /// Captures a payload built by the caller.
    pub fn capture_payload(&self, mut payload: LogPayload) {
        if payload.is_self_generated() {
            self.note_suppressed();
            return;
        }
        if payload.user_agent.is_none() {
            payload.user_agent = self.shared.user_agent.clone();
        }

        let fingerprint = payload.fingerprint();

        let dispatch = {
            let mut state = self.lock();

            if state.dedupe.seen(&fingerprint) {
                state.stats.deduplicated += 1;
                debug!(fingerprint = %fingerprint, "Dropping duplicate capture");
                return;
            }
            state.dedupe.record(fingerprint.clone());
            state.store.append(payload.clone());
            state.stats.captured += 1;

            // A non-empty queue means the drain owns the next slot
            if state.queue.is_empty() && state.limiter.try_acquire(Instant::now()) {
                state.in_flight += 1;
                Dispatch::SendNow(payload)
            } else {
                state.stats.queued += 1;
                if state.queue.push(payload) {
                    Dispatch::StartDrain
                } else {
                    Dispatch::Queued
                }
            }
        };

        match dispatch {
            Dispatch::SendNow(payload) => {
                debug!(fingerprint = %fingerprint, "Sending capture immediately");
                self.spawn_delivery(payload);
            }
            Dispatch::StartDrain => {
                debug!(fingerprint = %fingerprint, "Capture queued, starting drain");
                self.spawn_drain();
            }
            Dispatch::Queued => {
                debug!(fingerprint = %fingerprint, "Capture queued behind running drain");
            }
        }
    }

    fn note_suppressed(&self) {
        self.lock().stats.suppressed += 1;
    }

    // ========================================================================
    // Delivery
    // ========================================================================

    /// Spawns a fire-and-forget send. `in_flight` must already account for it.
    fn spawn_delivery(&self, payload: LogPayload) {
        let pipeline = self.clone();
        self.shared.runtime.spawn(async move {
            pipeline.deliver(payload).await;
        });
    }

    async fn deliver(&self, payload: LogPayload) {
        let timeout = self.shared.timeout;
        let result = match tokio::time::timeout(timeout, self.shared.transport.send(&payload)).await {
            Ok(result) => result,
            Err(_) => Err(TelemetryError::Timeout(timeout.as_millis() as u64)),
        };
        let outcome = DeliveryOutcome::from(result);

        match &outcome {
            DeliveryOutcome::Delivered => {
                debug!(source = %payload.source, "Log payload delivered");
            }
            DeliveryOutcome::Failed(reason) => {
                warn!(source = %payload.source, reason = %reason, "Log delivery failed, not retrying");
            }
            DeliveryOutcome::TimedOut => {
                warn!(
                    source = %payload.source,
                    timeout_ms = timeout.as_millis() as u64,
                    "Log delivery timed out, not retrying"
                );
            }
        }

        let snapshot = {
            let mut state = self.lock();
            match outcome {
                DeliveryOutcome::Delivered => state.stats.delivered += 1,
                DeliveryOutcome::Failed(_) => state.stats.failed += 1,
                DeliveryOutcome::TimedOut => state.stats.timed_out += 1,
            }
            state.store.snapshot()
        };

        // Storage I/O stays off the lock and off the async workers
        match self.shared.runtime.spawn_blocking(move || snapshot.write()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to persist local log"),
            Err(e) => warn!(error = %e, "Local log persistence task failed"),
        }

        let idle = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.is_idle()
        };

        if idle {
            self.shared.idle.notify_waiters();
        }
    }

    fn spawn_drain(&self) {
        let pipeline = self.clone();
        self.shared.runtime.spawn(async move {
            pipeline.drain().await;
        });
    }

    /// Sends queued payloads one per slot, oldest first, until the queue is empty.
    async fn drain(&self) {
        loop {
            let slot = self.lock().limiter.next_slot(Instant::now());
            tokio::time::sleep_until(slot).await;

            let next = {
                let mut state = self.lock();
                let now = Instant::now();
                if !state.limiter.ready(now) {
                    continue;
                }
                match state.queue.pop_or_finish() {
                    Some(payload) => {
                        state.limiter.mark_sent(now);
                        state.in_flight += 1;
                        Some(payload)
                    }
                    None => None,
                }
            };

            match next {
                Some(payload) => self.spawn_delivery(payload),
                None => {
                    debug!("Delivery queue drained");
                    if self.is_idle() {
                        self.shared.idle.notify_waiters();
                    }
                    return;
                }
            }
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Entries of the local log store, oldest first.
    pub fn logs(&self) -> Vec<LogPayload> {
        self.lock().store.all()
    }

    /// The local log as pretty-printed JSON.
    pub fn export_logs(&self) -> String {
        self.lock().store.export_as_text()
    }

    /// Empties the local log store (persisted immediately).
    pub fn clear_logs(&self) {
        self.lock().store.clear();
    }

    pub fn stats(&self) -> PipelineStats {
        self.lock().stats.clone()
    }

    /// Number of payloads waiting for a send slot.
    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    /// Whether nothing is queued, draining or in flight.
    pub fn is_idle(&self) -> bool {
        self.lock().is_idle()
    }

    /// Whether `url` is the delivery endpoint itself.
    pub fn is_delivery_endpoint(&self, url: &str) -> bool {
        self.shared.transport.targets(url)
    }

    /// Runtime used for background work.
    pub fn runtime(&self) -> &Handle {
        &self.shared.runtime
    }

    /// Waits until every accepted payload has been attempted, up to `max_wait`.
    ///
    /// Returns `false` if payloads were still pending when the wait ended.
    pub async fn flush(&self, max_wait: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.shared.idle.notified();
                if self.is_idle() {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(max_wait, wait).await.is_ok()
    }
}
