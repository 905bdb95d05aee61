//! Telemetry pipeline and collector client against a real collector

use std::sync::Arc;
use std::time::Duration;

use faultline_core::config::ConfigBuilder;
use faultline_core::Source;
use faultline_telemetry::{
    CaptureExtra, CollectorClient, HttpTransport, MemoryStateStorage, TelemetryPipeline, Thrown,
};
use serde_json::json;

use crate::common::start_collector;

#[tokio::test]
async fn test_captured_error_lands_in_collector_store() {
    let collector = start_collector(100).await;
    let config = ConfigBuilder::new()
        .collector_base_url(collector.base_url.clone())
        .pipeline_rate_limit_ms(20)
        .build();

    let pipeline = TelemetryPipeline::new(
        &config.pipeline,
        Arc::new(HttpTransport::new(&config.collector).unwrap()),
        Arc::new(MemoryStateStorage::new()),
    )
    .unwrap();

    pipeline.capture(
        Source::Http,
        &Thrown::from(json!({"status": 500, "message": "Server error"})),
        CaptureExtra::request("/x", "GET"),
    );
    pipeline.capture(
        Source::Frontend,
        &Thrown::error("TypeError", "undefined is not a function", None),
        CaptureExtra::default(),
    );
    assert!(pipeline.flush(Duration::from_secs(10)).await);
    assert_eq!(pipeline.stats().delivered, 2);

    let client = CollectorClient::new(&config.collector);
    let errors = client.try_load_errors().await.unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["source"], "http");
    assert_eq!(errors[0]["request"], json!({"url": "/x", "method": "GET"}));
    assert_eq!(errors[1]["error"]["name"], "TypeError");

    let stats = client.error_stats().await;
    assert_eq!(stats.total, 2);
    assert_ne!(stats.last_updated, "Unknown");

    collector.stop().await;
}

#[tokio::test]
async fn test_collector_client_round_trip() {
    let collector = start_collector(100).await;
    let config = ConfigBuilder::new()
        .collector_base_url(collector.base_url.clone())
        .build();
    let client = CollectorClient::new(&config.collector);

    client.save_error(&json!({"message": "single"})).await;
    let reply = client
        .save_errors(&[json!({"message": "a"}), json!({"message": "b"})])
        .await;
    assert_eq!(reply["success"], true);
    assert_eq!(client.load_errors().await.len(), 3);

    client.clear_errors().await;
    assert!(client.load_errors().await.is_empty());
    assert_eq!(client.error_stats().await.last_updated, "Unknown");

    collector.stop().await;
}
