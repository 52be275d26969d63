//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use docvec_ingest::error::{Error, Result};
use docvec_ingest::providers::{EmbeddingProvider, MemoryIndex, VectorIndexWriter};
use docvec_ingest::types::{IndexRecord, WriteReceipt};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Three sentences about cats followed by three about stocks
pub const TWO_TOPICS: &str = "The cat sleeps. A cat purrs. My cat eats. \
                              The stock rose. A stock fell. Each stock moved.";

/// Embeds text as keyword counts, so sentences on one topic point the same way
pub struct TopicEmbedder {
    pub texts_embedded: AtomicUsize,
}

impl TopicEmbedder {
    pub fn new() -> Self {
        Self {
            texts_embedded: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for TopicEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts_embedded.fetch_add(1, Ordering::SeqCst);
        let lower = text.to_lowercase();
        Ok(vec![
            lower.matches("cat").count() as f32,
            lower.matches("stock").count() as f32,
        ])
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn model(&self) -> &str {
        "topic-test"
    }

    fn name(&self) -> &str {
        "topic"
    }
}

/// Embedder whose provider rejects every request
pub struct RejectingEmbedder;

#[async_trait]
impl EmbeddingProvider for RejectingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding("quota exceeded"))
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn model(&self) -> &str {
        "rejecting"
    }

    fn name(&self) -> &str {
        "rejecting"
    }
}

/// Memory index that also counts write calls
pub struct CountingWriter {
    pub index: MemoryIndex,
    pub writes: AtomicUsize,
}

impl CountingWriter {
    pub fn new() -> Self {
        Self {
            index: MemoryIndex::new("test-index"),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndexWriter for CountingWriter {
    async fn write(&self, records: Vec<IndexRecord>, namespace: Option<&str>) -> Result<WriteReceipt> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.index.write(records, namespace).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Write `contents` to `name` inside `dir`
pub fn fixture(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
