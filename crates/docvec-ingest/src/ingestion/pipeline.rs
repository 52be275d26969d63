//! Ingestion pipeline: classify, extract, chunk, embed, write

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::error::Error;
use crate::providers::{EmbeddingProvider, VectorIndexWriter};
use crate::types::{ExtractedSegment, FileType, IndexRecord, IngestReceipt, SourceFile, WriteReceipt};

use super::chunker::{embed_batched, SemanticChunker};
use super::classifier::classify;
use super::extractor::ExtractorRegistry;

/// Stage a request failed in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Classify,
    Extract,
    Chunk,
    Embed,
    Write,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::Extract => "extract",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Classified,
    Extracted,
    Chunked,
    Written,
    Completed,
    Failed(IngestStage),
}

/// Terminal failure: the stage that failed and why
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {error}")]
pub struct StageFailure {
    pub stage: IngestStage,
    #[source]
    pub error: Error,
}

impl StageFailure {
    pub fn new(stage: IngestStage, error: Error) -> Self {
        Self { stage, error }
    }

    /// HTTP status for the underlying error
    pub fn status_code(&self) -> StatusCode {
        self.error.status_code()
    }
}

impl IntoResponse for StageFailure {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "type": self.error.kind(),
                "stage": self.stage,
                "message": self.error.to_string(),
            }
        }));

        (self.status_code(), body).into_response()
    }
}

/// Runs one file through every stage, in order, stopping at the first failure.
///
/// The writer is called at most once per ingestion, and only after every
/// chunk has a vector.
pub struct IngestPipeline {
    registry: Arc<ExtractorRegistry>,
    chunker: Arc<SemanticChunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    writer: Arc<dyn VectorIndexWriter>,
}

impl IngestPipeline {
    pub fn new(
        registry: Arc<ExtractorRegistry>,
        chunker: Arc<SemanticChunker>,
        embedder: Arc<dyn EmbeddingProvider>,
        writer: Arc<dyn VectorIndexWriter>,
    ) -> Self {
        Self {
            registry,
            chunker,
            embedder,
            writer,
        }
    }

    /// Ingest the file at `path` into `namespace` (None or blank = default)
    pub async fn ingest(&self, path: &Path, namespace: Option<&str>) -> Result<IngestReceipt, StageFailure> {
        let started = Instant::now();
        let namespace = namespace.map(str::trim).filter(|ns| !ns.is_empty());
        let shown = path.display().to_string();
        let mut state = PipelineState::Received;

        tracing::info!("Ingesting {} (namespace: {:?})", shown, namespace);

        let result = self.run(path, namespace, &shown, &mut state).await;
        match result {
            Ok((source, chunk_count, text_bytes, receipt)) => {
                advance(&mut state, PipelineState::Completed, &shown);
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::info!(
                    "Ingested {}: {} chunks, {} bytes of text in {}ms",
                    shown,
                    chunk_count,
                    text_bytes,
                    elapsed_ms
                );
                Ok(IngestReceipt {
                    source,
                    chunk_count,
                    text_bytes,
                    receipt,
                    elapsed_ms,
                })
            }
            Err(failure) => {
                advance(&mut state, PipelineState::Failed(failure.stage), &shown);
                tracing::error!("Ingestion of {} failed: {}", shown, failure);
                Err(failure)
            }
        }
    }

    async fn run(
        &self,
        path: &Path,
        namespace: Option<&str>,
        shown: &str,
        state: &mut PipelineState,
    ) -> Result<(SourceFile, usize, usize, Option<WriteReceipt>), StageFailure> {
        // Classify
        let file_type = classify(path);
        let extractor = match file_type {
            FileType::NotAFile => {
                return Err(StageFailure::new(
                    IngestStage::Classify,
                    Error::InvalidInput(format!("{} does not exist or is not a regular file", shown)),
                ))
            }
            other => self.registry.resolve(other).ok_or_else(|| {
                let ext = path
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_else(|| "no extension".to_string());
                StageFailure::new(IngestStage::Classify, Error::UnsupportedFormat(ext))
            })?,
        };
        let source = SourceFile {
            path: path.to_path_buf(),
            file_type,
        };
        advance(state, PipelineState::Classified, shown);

        // Extract
        let segments = extractor
            .extract(path)
            .await
            .map_err(failed_at(IngestStage::Extract))?;
        let text = ExtractedSegment::concat(&segments);
        tracing::debug!(
            "{} extractor produced {} segments ({} bytes)",
            extractor.name(),
            segments.len(),
            text.len()
        );
        advance(state, PipelineState::Extracted, shown);

        // Chunk
        let chunks = self
            .chunker
            .split(&text, self.embedder.as_ref())
            .await
            .map_err(failed_at(IngestStage::Chunk))?;
        advance(state, PipelineState::Chunked, shown);

        if chunks.is_empty() {
            tracing::warn!("{} produced no chunks, nothing to write", shown);
            return Ok((source, 0, text.len(), None));
        }

        // Embed
        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let config = self.chunker.config();
        let vectors = embed_batched(
            &contents,
            self.embedder.as_ref(),
            config.batch_size,
            config.max_concurrency,
        )
        .await
        .map_err(failed_at(IngestStage::Embed))?;

        let model = self.embedder.model();
        let records: Vec<IndexRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexRecord::from_chunk(chunk, &source, vector, model, namespace))
            .collect();

        // Write
        let receipt = self
            .writer
            .write(records, namespace)
            .await
            .map_err(failed_at(IngestStage::Write))?;
        advance(state, PipelineState::Written, shown);

        Ok((source, chunks.len(), text.len(), Some(receipt)))
    }
}

fn failed_at(stage: IngestStage) -> impl FnOnce(Error) -> StageFailure {
    move |error| StageFailure::new(stage, error)
}

fn advance(state: &mut PipelineState, next: PipelineState, shown: &str) {
    tracing::debug!("{}: {:?} -> {:?}", shown, state, next);
    *state = next;
}
