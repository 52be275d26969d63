//! Ingestion result types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::SourceFile;

/// Confirmation returned by a vector index writer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteReceipt {
    /// Index the records went into
    pub index: String,
    /// Writer backend name
    pub backend: String,
    /// Namespace written to (None = default partition)
    pub namespace: Option<String>,
    /// IDs of the written records, in chunk order
    pub record_ids: Vec<Uuid>,
    /// Number of records the index acknowledged
    pub upserted_count: usize,
    /// Write timestamp
    pub written_at: chrono::DateTime<chrono::Utc>,
}

/// Outcome of a completed ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReceipt {
    /// The ingested file
    pub source: SourceFile,
    /// Number of chunks produced
    pub chunk_count: usize,
    /// Length of the extracted document text in bytes
    pub text_bytes: usize,
    /// Index confirmation (None when the document produced no chunks)
    pub receipt: Option<WriteReceipt>,
    /// Wall time spent in the pipeline
    pub elapsed_ms: u64,
}

/// Body of a successful `POST /process-file`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Human readable status
    pub message: String,
    /// What was written
    pub vector_store: IngestReceipt,
}

impl IngestResponse {
    /// Wrap a receipt with the matching success message
    pub fn from_receipt(receipt: IngestReceipt) -> Self {
        let message = if receipt.receipt.is_some() {
            "file successfully processed and stored in vector DB"
        } else {
            "file processed, no text to store"
        };
        Self {
            message: message.to_string(),
            vector_store: receipt,
        }
    }
}
