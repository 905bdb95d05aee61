//! Prometheus metrics for the collector

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Registry holding every collector metric, prefixed `faultline_`.
pub struct CollectorMetrics {
    registry: Registry,
    /// Counter: HTTP requests by (route, status)
    pub requests_total: IntCounterVec,
    /// Gauge: records currently held by the error store
    pub errors_stored: IntGauge,
    /// Counter: log payloads received on the delivery endpoint, by source
    pub payloads_received_total: IntCounterVec,
}

impl CollectorMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("faultline".to_string()), None)?;

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Total HTTP requests handled"),
            &["route", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let errors_stored = IntGauge::new("errors_stored", "Records held by the error store")?;
        registry.register(Box::new(errors_stored.clone()))?;

        let payloads_received_total = IntCounterVec::new(
            Opts::new("payloads_received_total", "Log payloads received by source"),
            &["source"],
        )?;
        registry.register(Box::new(payloads_received_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            errors_stored,
            payloads_received_total,
        })
    }

    pub fn record_request(&self, route: &str, status: u16) {
        self.requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    pub fn set_errors_stored(&self, count: usize) {
        self.errors_stored.set(count as i64);
    }

    pub fn record_payload(&self, source: &str) {
        self.payloads_received_total
            .with_label_values(&[source])
            .inc();
    }

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
