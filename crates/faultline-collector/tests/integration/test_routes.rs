//! HTTP API behavior

use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};

use crate::common::{start_collector, start_unwritable_collector};

#[tokio::test]
async fn test_empty_store_document() {
    let collector = start_collector(100).await;

    let response = Client::new()
        .get(format!("{}/api/errors", collector.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"errors": [], "lastUpdated": null, "totalErrors": 0}));

    collector.stop().await;
}

#[tokio::test]
async fn test_save_single_and_batch() {
    let collector = start_collector(100).await;
    let client = Client::new();
    let url = format!("{}/api/errors", collector.base_url);

    let reply: Value = client
        .post(&url)
        .json(&json!({"message": "one"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reply, json!({"success": true, "message": "Error saved"}));

    let reply: Value = client
        .post(format!("{}/batch", url))
        .json(&json!({"errors": [{"message": "two"}, {"message": "three"}]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reply["message"], "2 errors saved");

    let document: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(document["totalErrors"], 3);
    assert_eq!(document["errors"][2]["message"], "three");
    assert!(document["lastUpdated"].is_string());

    // Persisted as a pretty-printed document
    let on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(&collector.errors_file).unwrap()).unwrap();
    assert_eq!(on_disk["totalErrors"], 3);

    collector.stop().await;
}

#[tokio::test]
async fn test_store_keeps_last_max_errors() {
    let collector = start_collector(100).await;
    let client = Client::new();
    let url = format!("{}/api/errors", collector.base_url);

    let batch: Vec<Value> = (0..150).map(|i| json!({"message": format!("e{i}")})).collect();
    client
        .post(format!("{}/batch", url))
        .json(&json!({ "errors": batch }))
        .send()
        .await
        .unwrap();

    let document: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(document["totalErrors"], 100);
    assert_eq!(document["errors"][0]["message"], "e50");
    assert_eq!(document["errors"][99]["message"], "e149");

    collector.stop().await;
}

#[tokio::test]
async fn test_bad_requests() {
    let collector = start_collector(100).await;
    let client = Client::new();
    let url = format!("{}/api/errors", collector.base_url);

    let empty = client.post(&url).send().await.unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    let body: Value = empty.json().await.unwrap();
    assert_eq!(body["error"], "No error data provided");

    let malformed = client
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let not_array = client
        .post(format!("{}/batch", url))
        .json(&json!({"errors": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(not_array.status(), StatusCode::BAD_REQUEST);
    let body: Value = not_array.json().await.unwrap();
    assert_eq!(body["error"], "Invalid errors data");

    let bad_log = client
        .post(format!("{}/api/logs", collector.base_url))
        .json(&json!({"hello": "world"}))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_log.status(), StatusCode::BAD_REQUEST);

    collector.stop().await;
}

#[tokio::test]
async fn test_clear() {
    let collector = start_collector(100).await;
    let client = Client::new();
    let url = format!("{}/api/errors", collector.base_url);

    client.post(&url).json(&json!({"message": "x"})).send().await.unwrap();
    let reply: Value = client.delete(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(reply["message"], "All errors cleared");

    let document: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(document, json!({"errors": [], "lastUpdated": null, "totalErrors": 0}));

    collector.stop().await;
}

#[tokio::test]
async fn test_unknown_route_and_preflight() {
    let collector = start_collector(100).await;
    let client = Client::new();

    let missing = client
        .get(format!("{}/index.html", collector.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(missing.headers()["access-control-allow-origin"], "*");

    let preflight = client
        .request(Method::OPTIONS, format!("{}/api/logs", collector.base_url))
        .header("origin", "http://localhost:4200")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status(), StatusCode::NO_CONTENT);
    assert_eq!(preflight.headers()["access-control-allow-origin"], "*");
    assert_eq!(preflight.headers()["access-control-allow-headers"], "content-type");
    assert!(preflight.headers()["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .contains("POST"));

    collector.stop().await;
}

#[tokio::test]
async fn test_write_failure_is_500() {
    let collector = start_unwritable_collector().await;

    let response = Client::new()
        .post(format!("{}/api/errors", collector.base_url))
        .json(&json!({"message": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to save error");

    collector.stop().await;
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let collector = start_collector(100).await;
    let client = Client::new();

    client
        .get(format!("{}/api/errors", collector.base_url))
        .send()
        .await
        .unwrap();

    let text = client
        .get(format!("{}/metrics", collector.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains("faultline_requests_total{route=\"list_errors\",status=\"200\"} 1"));
    assert!(text.contains("faultline_errors_stored 0"));

    collector.stop().await;
}
