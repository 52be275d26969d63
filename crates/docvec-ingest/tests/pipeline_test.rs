//! End-to-end tests for the ingestion pipeline.
//!
//! Exercises the complete flow: classify → extract → chunk → embed → write.

mod common;

use axum::{routing::post, Json, Router};
use common::{fixture, CountingWriter, RejectingEmbedder, TopicEmbedder, TWO_TOPICS};
use docvec_ingest::config::{ChunkingConfig, EmbeddingConfig};
use docvec_ingest::ingestion::{ExtractorRegistry, IngestPipeline, IngestStage, SemanticChunker};
use docvec_ingest::providers::{EmbeddingProvider, OpenAiEmbedder, VectorIndexWriter};
use docvec_ingest::{Error, FileType};
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn pipeline(embedder: Arc<dyn EmbeddingProvider>, writer: Arc<dyn VectorIndexWriter>) -> IngestPipeline {
    IngestPipeline::new(
        Arc::new(ExtractorRegistry::with_defaults()),
        Arc::new(SemanticChunker::new(ChunkingConfig::default())),
        embedder,
        writer,
    )
}

#[tokio::test]
async fn test_two_topic_text_file_is_chunked_and_stored() {
    let dir = tempdir().unwrap();
    let path = fixture(&dir, "topics.txt", TWO_TOPICS.as_bytes());
    let embedder = Arc::new(TopicEmbedder::new());
    let writer = Arc::new(CountingWriter::new());

    let receipt = pipeline(embedder.clone(), writer.clone())
        .ingest(&path, Some("alpha"))
        .await
        .unwrap();

    assert_eq!(receipt.chunk_count, 2);
    assert_eq!(receipt.text_bytes, TWO_TOPICS.len());
    assert_eq!(receipt.source.file_type, FileType::Txt);
    let write = receipt.receipt.expect("records were written");
    assert_eq!(write.upserted_count, 2);
    assert_eq!(write.namespace.as_deref(), Some("alpha"));

    assert_eq!(writer.writes(), 1);
    let records = writer.index.records(Some("alpha"));
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].text, "The cat sleeps. A cat purrs. My cat eats. ");
    assert_eq!(records[1].text, "The stock rose. A stock fell. Each stock moved.");
    assert_eq!(records[1].metadata["chunk_index"], json!(1));
    assert_eq!(records[1].embedding, vec![0.0, 3.0]);
    assert_eq!(writer.index.namespace_len(None), 0);
}

#[tokio::test]
async fn test_unsupported_extension_fails_before_embedding() {
    let dir = tempdir().unwrap();
    let path = fixture(&dir, "data.json", br#"{"text": "The cat sleeps."}"#);
    let embedder = Arc::new(TopicEmbedder::new());
    let writer = Arc::new(CountingWriter::new());

    let failure = pipeline(embedder.clone(), writer.clone())
        .ingest(&path, None)
        .await
        .unwrap_err();

    assert_eq!(failure.stage, IngestStage::Classify);
    assert!(matches!(failure.error, Error::UnsupportedFormat(ref ext) if ext == "json"));
    assert_eq!(embedder.calls(), 0);
    assert_eq!(writer.writes(), 0);
}

#[tokio::test]
async fn test_embedding_timeout_never_reaches_writer() {
    // Stub that answers long after the client gives up.
    let router = Router::new().route(
        "/embeddings",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"data": []}))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let config = EmbeddingConfig {
        base_url: format!("http://{}", addr),
        model: "stub-embed".to_string(),
        dimensions: 2,
        max_retries: 0,
        timeout_secs: 1,
        ..Default::default()
    };
    let embedder = Arc::new(OpenAiEmbedder::new(&config, "sk-test").unwrap());
    let writer = Arc::new(CountingWriter::new());

    let dir = tempdir().unwrap();
    let path = fixture(&dir, "topics.txt", TWO_TOPICS.as_bytes());
    let failure = pipeline(embedder, writer.clone())
        .ingest(&path, Some("alpha"))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, Error::Embedding(_)));
    assert!(failure.error.to_string().contains("timed out"));
    assert_eq!(failure.stage, IngestStage::Chunk);
    assert_eq!(writer.writes(), 0);
    assert!(writer.index.is_empty());
}

#[tokio::test]
async fn test_chunk_embedding_failure_reports_embed_stage() {
    // One sentence needs no boundary embeddings, so the first call is for the chunk itself.
    let dir = tempdir().unwrap();
    let path = fixture(&dir, "notes.txt", b"The cat sleeps.");
    let writer = Arc::new(CountingWriter::new());

    let failure = pipeline(Arc::new(RejectingEmbedder), writer.clone())
        .ingest(&path, Some("alpha"))
        .await
        .unwrap_err();

    assert_eq!(failure.stage, IngestStage::Embed);
    assert!(matches!(failure.error, Error::Embedding(ref m) if m.contains("quota exceeded")));
    assert_eq!(failure.status_code(), axum::http::StatusCode::BAD_GATEWAY);
    assert_eq!(writer.writes(), 0);
    assert!(writer.index.is_empty());
}

#[tokio::test]
async fn test_namespaces_never_share_records() {
    let dir = tempdir().unwrap();
    let path = fixture(&dir, "topics.txt", TWO_TOPICS.as_bytes());
    let embedder = Arc::new(TopicEmbedder::new());
    let writer = Arc::new(CountingWriter::new());
    let pipeline = pipeline(embedder, writer.clone());

    pipeline.ingest(&path, Some("alpha")).await.unwrap();
    pipeline.ingest(&path, Some("beta")).await.unwrap();

    let alpha = writer.index.records(Some("alpha"));
    let beta = writer.index.records(Some("beta"));
    assert_eq!(alpha.len(), 2);
    assert_eq!(beta.len(), 2);
    assert!(alpha.iter().all(|r| r.namespace.as_deref() == Some("alpha")));
    assert!(beta.iter().all(|r| r.namespace.as_deref() == Some("beta")));

    let alpha_ids: HashSet<_> = alpha.iter().map(|r| r.id).collect();
    assert!(beta.iter().all(|r| !alpha_ids.contains(&r.id)));
    assert_eq!(writer.index.namespaces(), vec!["alpha".to_string(), "beta".to_string()]);
}

#[tokio::test]
async fn test_missing_path_is_invalid_input() {
    let writer = Arc::new(CountingWriter::new());
    let failure = pipeline(Arc::new(TopicEmbedder::new()), writer.clone())
        .ingest(Path::new("/no/such/dir/report.pdf"), None)
        .await
        .unwrap_err();

    assert_eq!(failure.stage, IngestStage::Classify);
    assert!(matches!(failure.error, Error::InvalidInput(_)));
    assert_eq!(writer.writes(), 0);
}

#[tokio::test]
async fn test_corrupt_pdf_is_extraction_failure() {
    let dir = tempdir().unwrap();
    let path = fixture(&dir, "report.pdf", b"%PDF-1.7\n\x00\x01garbage without objects");
    let embedder = Arc::new(TopicEmbedder::new());
    let writer = Arc::new(CountingWriter::new());

    let failure = pipeline(embedder.clone(), writer.clone())
        .ingest(&path, None)
        .await
        .unwrap_err();

    assert_eq!(failure.stage, IngestStage::Extract);
    assert!(matches!(failure.error, Error::Extraction { .. }));
    assert_eq!(failure.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(embedder.calls(), 0);
    assert_eq!(writer.writes(), 0);
}

#[tokio::test]
async fn test_empty_file_completes_without_write() {
    let dir = tempdir().unwrap();
    let path = fixture(&dir, "empty.txt", b"  \n\n ");
    let embedder = Arc::new(TopicEmbedder::new());
    let writer = Arc::new(CountingWriter::new());

    let receipt = pipeline(embedder.clone(), writer.clone())
        .ingest(&path, Some("alpha"))
        .await
        .unwrap();

    assert_eq!(receipt.chunk_count, 0);
    assert!(receipt.receipt.is_none());
    assert_eq!(embedder.calls(), 0);
    assert_eq!(writer.writes(), 0);
}

#[tokio::test]
async fn test_csv_rows_are_ingested() {
    let dir = tempdir().unwrap();
    let path = fixture(&dir, "pets.csv", b"name,kind\nTom,cat\n");
    let writer = Arc::new(CountingWriter::new());

    let receipt = pipeline(Arc::new(TopicEmbedder::new()), writer.clone())
        .ingest(&path, None)
        .await
        .unwrap();

    assert_eq!(receipt.chunk_count, 1);
    let records = writer.index.records(None);
    assert_eq!(records[0].text, "name: Tom\nkind: cat\n");
    assert_eq!(records[0].metadata["file_type"], json!("csv"));
    assert_eq!(records[0].embedding_model(), Some("topic-test"));
}
