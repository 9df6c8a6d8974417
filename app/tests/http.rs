//! In-process scenario tests for the command surface: drives
//! `recordsync::http::router` via `tower::ServiceExt::oneshot`, no TCP
//! socket involved.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use engine::Engine;
use http_body_util::BodyExt;
use recordsync::http::router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn hubspot_engine(dir: &std::path::Path) -> Arc<Engine> {
    std::fs::write(dir.join("config.toml"), "[hubspot]\napi_key = \"secret\"\n").unwrap();
    std::fs::write(dir.join("topology.json"), serde_json::to_string(&json!({"hubspot": {"type": "hubspot"}})).unwrap()).unwrap();
    Engine::start(dir.join("config.toml"), dir.join("topology.json"), dir.join("rules.json")).await.unwrap()
}

async fn call(app: axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn get_destinations_lists_registered_names() {
    let dir = tempfile::tempdir().unwrap();
    let engine = hubspot_engine(dir.path()).await;
    let app = router(engine.clone());

    let (status, body) = call(app, get("/destinations")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["hubspot"]));

    engine.shutdown().await;
}

#[tokio::test]
async fn post_sync_then_get_status_reports_queued() {
    let dir = tempfile::tempdir().unwrap();
    let engine = hubspot_engine(dir.path()).await;
    let app = router(engine.clone());

    let payload = json!({"operation": "create", "record_id": "r1", "data": {"email": "a@b"}, "crm": "hubspot"});
    let (status, body) = call(app.clone(), json_request("POST", "/sync", payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], true);
    assert_eq!(body["status"], "queued");

    let (status, body) = call(app, get("/status/r1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "queued");

    engine.shutdown().await;
}

#[tokio::test]
async fn sync_to_unknown_destination_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let engine = hubspot_engine(dir.path()).await;
    let app = router(engine.clone());

    let payload = json!({"operation": "create", "record_id": "r1", "data": {}, "crm": "ghost"});
    let (status, body) = call(app, json_request("POST", "/sync", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("config error"));

    engine.shutdown().await;
}

#[tokio::test]
async fn put_and_get_rules_roundtrips() {
    let dir = tempfile::tempdir().unwrap();
    let engine = hubspot_engine(dir.path()).await;
    let app = router(engine.clone());

    let doc = json!({"hubspot": {"required_fields": ["email"]}});
    let (status, _) = call(app.clone(), json_request("PUT", "/rules", doc.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(app, get("/rules")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hubspot"]["required_fields"], json!(["email"]));

    engine.shutdown().await;
}

#[tokio::test]
async fn destination_schema_reports_required_keys() {
    let dir = tempfile::tempdir().unwrap();
    let engine = hubspot_engine(dir.path()).await;
    let app = router(engine.clone());

    let (status, body) = call(app, get("/destinations/hubspot/schema")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("api_key").is_some());

    engine.shutdown().await;
}
