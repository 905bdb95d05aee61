//! Intercepted client → pipeline → collector

use faultline_core::Source;
use faultline_telemetry::InterceptedClient;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{config_for, delivered_payloads, pipeline_for, setup_collector_mock, FLUSH_WAIT};

#[tokio::test]
async fn test_failed_request_is_reported_to_collector() {
    let server = setup_collector_mock(200).await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "No such user"})))
        .mount(&server)
        .await;

    let state = tempfile::tempdir().unwrap();
    let pipeline = pipeline_for(&config_for(&server, state.path()));
    let client = InterceptedClient::new(pipeline.clone());

    let url = format!("{}/api/users", server.uri());
    let failure = client.get(&url).await.unwrap_err();
    assert_eq!(failure.status, 404);
    assert_eq!(failure.user_message(), "No such user");
    assert!(pipeline.flush(FLUSH_WAIT).await);

    let delivered = delivered_payloads(&server).await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].source, Source::Http);
    assert_eq!(delivered[0].message, "No such user");
    assert_eq!(delivered[0].request.as_ref().unwrap().url, url);
    let error = delivered[0].error.as_ref().unwrap();
    assert_eq!(error["name"], "HttpErrorResponse");
    assert_eq!(error["status"], 404);
}

#[tokio::test]
async fn test_delivery_endpoint_failure_does_not_loop() {
    let server = setup_collector_mock(500).await;
    let state = tempfile::tempdir().unwrap();
    let pipeline = pipeline_for(&config_for(&server, state.path()));
    let client = InterceptedClient::new(pipeline.clone());

    let request = client
        .inner()
        .post(format!("{}/api/logs", server.uri()))
        .json(&json!({"level": "error"}));
    let failure = client.send(request).await.unwrap_err();
    assert_eq!(failure.status, 500);
    assert!(pipeline.flush(FLUSH_WAIT).await);

    // Only the request made by the test itself
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert!(pipeline.logs().is_empty());
}
