//! File ingestion endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::error::Error;
use crate::server::state::AppState;
use crate::types::{IngestRequest, IngestResponse};

/// POST /process-file - Run one file through the pipeline
pub async fn process_file(
    State(state): State<AppState>,
    payload: std::result::Result<Json<IngestRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return Error::InvalidInput(rejection.body_text()).into_response(),
    };
    if let Err(e) = request.validate() {
        return e.into_response();
    }

    tracing::info!("Received ingestion request: {:?}", request);

    let pipeline = match state.pipeline_for(&request) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("Cannot build pipeline for {}: {}", request.file_path, e);
            return e.into_response();
        }
    };

    let limit_secs = state.config().processing.file_timeout_secs;
    let start = Instant::now();
    let ingest = pipeline.ingest(Path::new(&request.file_path), request.namespace());

    match timeout(Duration::from_secs(limit_secs), ingest).await {
        Ok(Ok(receipt)) => (StatusCode::OK, Json(IngestResponse::from_receipt(receipt))).into_response(),
        Ok(Err(failure)) => failure.into_response(),
        Err(_) => {
            tracing::error!(
                "TIMEOUT ingesting '{}' after {:.1}s (limit: {}s)",
                request.file_path,
                start.elapsed().as_secs_f64(),
                limit_secs
            );
            Error::Timeout(limit_secs).into_response()
        }
    }
}
