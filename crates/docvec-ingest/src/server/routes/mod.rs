//! API routes for the ingestion server

pub mod ingest;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::server::state::AppState;

/// Build all routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/process-file", post(ingest::process_file))
        .route("/process-file/", post(ingest::process_file))
}

/// Liveness check
async fn root() -> Json<Value> {
    Json(json!({"status": "Success"}))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
