//! Panic hook capture
//!
//! Kept in its own test binary: the panic hook is process-wide.

use std::sync::Arc;

use faultline_core::config::ConfigBuilder;
use faultline_core::Source;
use faultline_telemetry::{install_panic_capture, MemoryStateStorage, TelemetryPipeline};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_panics_are_captured_as_frontend_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logs"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ConfigBuilder::new().collector_base_url(server.uri()).build();
    let transport = Arc::new(faultline_telemetry::HttpTransport::new(&config.collector).unwrap());
    let pipeline = TelemetryPipeline::new(
        &config.pipeline,
        transport,
        Arc::new(MemoryStateStorage::new()),
    )
    .unwrap();

    install_panic_capture(pipeline.clone());

    let result = std::thread::spawn(|| {
        panic!("widget exploded");
    })
    .join();
    assert!(result.is_err());
    assert!(pipeline.flush(std::time::Duration::from_secs(10)).await);

    let logs = pipeline.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].source, Source::Frontend);
    assert_eq!(logs[0].message, "widget exploded");

    let error = logs[0].error.as_ref().unwrap();
    assert_eq!(error["name"], "Panic");
    assert!(error["stack"].as_str().unwrap().contains("panic_capture.rs"));
}
