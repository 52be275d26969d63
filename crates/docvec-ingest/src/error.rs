//! Error types for the ingestion service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum Error {
    /// Path does not exist or is not a regular file
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Extension does not map to a registered extractor
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Extractor could not read or parse the file content
    #[error("Failed to extract '{path}': {message}")]
    Extraction { path: String, message: String },

    /// Embedding provider call failed (auth, quota, timeout, malformed response)
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index rejected or could not accept the batch
    #[error("Vector index write failed: {0}")]
    IndexWrite(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request exceeded its processing budget
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an index write error
    pub fn index_write(message: impl Into<String>) -> Self {
        Self::IndexWrite(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable name of the error kind, used in responses and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::Extraction { .. } => "extraction_failure",
            Error::Embedding(_) => "embedding_failure",
            Error::IndexWrite(_) => "index_write_failure",
            Error::Config(_) => "config_error",
            Error::Timeout(_) => "timeout",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status the request handler reports for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) | Error::UnsupportedFormat(_) | Error::Config(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::Extraction { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Embedding(_) | Error::IndexWrite(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Io(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
