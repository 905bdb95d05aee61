//! Pipeline → HTTP transport → collector

use faultline_core::{RequestInfo, Source};
use faultline_telemetry::{CaptureExtra, Thrown};
use serde_json::json;

use crate::common::{
    config_for, delivered_payloads, persisted_log, pipeline_for, setup_collector_mock, FLUSH_WAIT,
};

#[tokio::test]
async fn test_http_error_is_stored_and_delivered_once() {
    let server = setup_collector_mock(200).await;
    let state = tempfile::tempdir().unwrap();
    let pipeline = pipeline_for(&config_for(&server, state.path()));

    let error = json!({"status": 500, "message": "Server error"});
    pipeline.capture(
        Source::Http,
        &Thrown::from(error.clone()),
        CaptureExtra::request("/x", "GET"),
    );
    // Same failure again: deduplicated
    pipeline.capture(
        Source::Http,
        &Thrown::from(error),
        CaptureExtra::request("/x", "GET"),
    );
    assert!(pipeline.flush(FLUSH_WAIT).await);

    let delivered = delivered_payloads(&server).await;
    assert_eq!(delivered.len(), 1);
    let payload = &delivered[0];
    assert_eq!(payload.fingerprint().as_str(), "http-Server error-/x");
    assert_eq!(payload.request, Some(RequestInfo::new("/x", "GET")));
    assert_eq!(payload.error, Some(json!({"status": 500, "message": "Server error"})));

    let persisted = persisted_log(state.path());
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].message, "Server error");
}

#[tokio::test]
async fn test_rejected_delivery_is_kept_locally_without_retry() {
    let server = setup_collector_mock(500).await;
    let state = tempfile::tempdir().unwrap();
    let pipeline = pipeline_for(&config_for(&server, state.path()));

    pipeline.capture(Source::Frontend, &Thrown::from("first"), CaptureExtra::default());
    pipeline.capture(Source::Frontend, &Thrown::from("second"), CaptureExtra::default());
    assert!(pipeline.flush(FLUSH_WAIT).await);

    assert_eq!(delivered_payloads(&server).await.len(), 2);
    let stats = pipeline.stats();
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.delivered, 0);

    let messages: Vec<_> = persisted_log(state.path())
        .into_iter()
        .map(|p| p.message)
        .collect();
    assert_eq!(messages, vec!["first", "second"]);
}

#[tokio::test]
async fn test_queued_payloads_are_delivered_in_capture_order() {
    let server = setup_collector_mock(200).await;
    let state = tempfile::tempdir().unwrap();
    let pipeline = pipeline_for(&config_for(&server, state.path()));

    for i in 0..5 {
        pipeline.capture(
            Source::Frontend,
            &Thrown::error("TypeError", format!("failure {i}"), None),
            CaptureExtra::default(),
        );
    }
    assert_eq!(pipeline.queued(), 4);
    assert!(pipeline.flush(FLUSH_WAIT).await);

    let order: Vec<_> = delivered_payloads(&server)
        .await
        .into_iter()
        .map(|p| p.message)
        .collect();
    assert_eq!(
        order,
        vec!["failure 0", "failure 1", "failure 2", "failure 3", "failure 4"]
    );
}

#[tokio::test]
async fn test_local_log_survives_restart() {
    let server = setup_collector_mock(200).await;
    let state = tempfile::tempdir().unwrap();
    let config = config_for(&server, state.path());

    {
        let pipeline = pipeline_for(&config);
        pipeline.capture(Source::UnhandledRejection, &Thrown::from("lost promise"), CaptureExtra::default());
        assert!(pipeline.flush(FLUSH_WAIT).await);
    }

    let restarted = pipeline_for(&config);
    let logs = restarted.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].source, Source::UnhandledRejection);
    assert_eq!(logs[0].message, "lost promise");
}

#[tokio::test]
async fn test_self_generated_payloads_never_reach_the_collector() {
    let server = setup_collector_mock(200).await;
    let state = tempfile::tempdir().unwrap();
    let pipeline = pipeline_for(&config_for(&server, state.path()));

    pipeline.capture(
        Source::LoggingService,
        &Thrown::from("delivery failed"),
        CaptureExtra::default(),
    );
    assert!(pipeline.flush(FLUSH_WAIT).await);

    assert!(delivered_payloads(&server).await.is_empty());
    assert!(pipeline.logs().is_empty());
}
