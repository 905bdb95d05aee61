//! Integration tests for faultline-collector
//!
//! Starts a real collector on an ephemeral port and drives it over HTTP,
//! both directly and through the telemetry crate's clients.

mod common;

mod test_end_to_end;
mod test_routes;
