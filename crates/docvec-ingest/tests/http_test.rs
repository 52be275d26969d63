//! HTTP surface tests, driven through the router without binding a socket

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{fixture, CountingWriter, TopicEmbedder, TWO_TOPICS};
use docvec_ingest::config::IngestConfig;
use docvec_ingest::server::{build_router, state::AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

fn app() -> (Router, Arc<CountingWriter>) {
    let writer = Arc::new(CountingWriter::new());
    let state = AppState::with_providers(
        IngestConfig::default(),
        Arc::new(TopicEmbedder::new()),
        writer.clone(),
    );
    (build_router(state), writer)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_reports_success() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "Success"}));
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_process_file_stores_chunks() {
    let dir = tempdir().unwrap();
    let path = fixture(&dir, "topics.txt", TWO_TOPICS.as_bytes());
    let (app, writer) = app();

    let response = app
        .oneshot(post_json(
            "/process-file/",
            json!({"file_path": path.to_string_lossy(), "namespace": "alpha"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "file successfully processed and stored in vector DB");
    assert_eq!(body["vector_store"]["chunk_count"], 2);
    assert_eq!(body["vector_store"]["receipt"]["namespace"], "alpha");
    assert_eq!(writer.index.namespace_len(Some("alpha")), 2);
}

#[tokio::test]
async fn test_route_without_trailing_slash() {
    let dir = tempdir().unwrap();
    let path = fixture(&dir, "notes.txt", b"The cat sleeps.");
    let (app, writer) = app();

    let response = app
        .oneshot(post_json("/process-file", json!({"file_path": path.to_string_lossy()})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(writer.index.namespace_len(None), 1);
}

#[tokio::test]
async fn test_unsupported_file_reports_stage() {
    let dir = tempdir().unwrap();
    let path = fixture(&dir, "data.json", b"{}");
    let (app, writer) = app();

    let response = app
        .oneshot(post_json("/process-file/", json!({"file_path": path.to_string_lossy()})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "unsupported_format");
    assert_eq!(body["error"]["stage"], "classify");
    assert_eq!(writer.writes(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_invalid_input() {
    let (app, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/process-file/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"namespace\": \"alpha\""))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["type"], "invalid_input");
}

#[tokio::test]
async fn test_blank_path_is_rejected() {
    let (app, writer) = app();
    let response = app
        .oneshot(post_json("/process-file/", json!({"file_path": "  "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["type"], "invalid_input");
    assert_eq!(writer.writes(), 0);
}

#[tokio::test]
async fn test_missing_credentials_is_config_error() {
    let dir = tempdir().unwrap();
    let path = fixture(&dir, "notes.txt", b"The cat sleeps.");
    let state = AppState::new(IngestConfig::default()).unwrap();
    let app = build_router(state);

    let response = app
        .oneshot(post_json("/process-file/", json!({"file_path": path.to_string_lossy()})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["type"], "config_error");
}
