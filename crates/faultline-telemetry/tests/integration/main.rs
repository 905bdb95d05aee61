//! Integration tests for faultline-telemetry
//!
//! Uses wiremock to stand in for the remote log collector and verifies
//! end-to-end behavior of the pipeline, the HTTP transport, the intercepted
//! client and the collector client.

mod common;

mod test_delivery;
mod test_intercepted_client;
