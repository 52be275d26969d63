//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::{Error, Result};

/// Trait for generating text embeddings
///
/// Vectors are only comparable when they come from the same `model()`;
/// callers must never mix identities inside one namespace.
///
/// Implementations:
/// - `OpenAiEmbedder`: OpenAI-compatible `/embeddings` endpoint
/// - `BoundedEmbedder`: concurrency cap around any other provider
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch), aligned by index with the input
    ///
    /// Default implementation calls `embed` sequentially.
    /// Implementations should override for better performance.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get embedding dimensions (e.g., 3072 for text-embedding-3-large)
    fn dimensions(&self) -> usize;

    /// Model identity the vectors belong to
    fn model(&self) -> &str;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Caps the number of in-flight calls to an embedding provider.
///
/// Wrappers built with `sharing` draw from the same permits, so a cap set by
/// the server holds across requests even when each request brings its own
/// credential.
pub struct BoundedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    semaphore: Arc<Semaphore>,
}

impl BoundedEmbedder {
    /// Wrap a provider, allowing at most `max_in_flight` concurrent calls
    pub fn new(inner: Arc<dyn EmbeddingProvider>, max_in_flight: usize) -> Self {
        Self::sharing(inner, Arc::new(Semaphore::new(max_in_flight.max(1))))
    }

    /// Wrap a provider using an existing pool of permits
    pub fn sharing(inner: Arc<dyn EmbeddingProvider>, semaphore: Arc<Semaphore>) -> Self {
        Self { inner, semaphore }
    }

    /// Permits not currently held
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[async_trait]
impl EmbeddingProvider for BoundedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| Error::embedding(format!("semaphore error: {}", e)))?;
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| Error::embedding(format!("semaphore error: {}", e)))?;
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Cosine similarity between two vectors (0.0 when either is zero or lengths differ)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Cosine distance, `1 - similarity`
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}
