//! Application state for the ingestion server

use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::{IndexBackend, IngestConfig};
use crate::error::{Error, Result};
use crate::ingestion::{ExtractorRegistry, IngestPipeline, SemanticChunker};
use crate::providers::{
    build_embedder, build_remote_writer, BoundedEmbedder, EmbeddingProvider, MemoryIndex,
    VectorIndexWriter,
};
use crate::types::IngestRequest;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: IngestConfig,
    /// Format extractors
    registry: Arc<ExtractorRegistry>,
    /// Semantic chunker
    chunker: Arc<SemanticChunker>,
    /// Permits shared by every embedder this server hands out
    embed_permits: Arc<Semaphore>,
    /// Embedder built from the configured credential, if any
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    /// Writer built from the configured credential, if any
    writer: Option<Arc<dyn VectorIndexWriter>>,
    /// The in-process index when that backend is selected
    memory_index: Option<Arc<MemoryIndex>>,
}

impl AppState {
    /// Build state from configuration
    ///
    /// Missing credentials are not an error here; requests must then supply
    /// their own.
    pub fn new(config: IngestConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            "Initializing ingestion state (embeddings: {}, index backend: {:?})",
            config.embeddings.model,
            config.index.backend
        );

        let embed_permits = Arc::new(Semaphore::new(config.embeddings.max_in_flight));

        let embedder: Option<Arc<dyn EmbeddingProvider>> = match config.embeddings.api_key {
            Some(_) => {
                let provider = build_embedder(&config.embeddings, None)?;
                Some(Arc::new(BoundedEmbedder::sharing(provider, Arc::clone(&embed_permits))))
            }
            None => {
                tracing::warn!("No embedding API key configured; requests must supply one");
                None
            }
        };

        let (writer, memory_index) = match config.index.backend {
            IndexBackend::Memory => {
                let index = Arc::new(MemoryIndex::new(config.index.index_name.clone()));
                let writer: Arc<dyn VectorIndexWriter> = index.clone();
                (Some(writer), Some(index))
            }
            IndexBackend::Pinecone if config.index.api_key.is_some() => {
                (build_remote_writer(&config.index, None)?, None)
            }
            IndexBackend::Pinecone => {
                tracing::warn!("No index API key configured; requests must supply one");
                (None, None)
            }
        };

        Ok(Self::assemble(config, embed_permits, embedder, writer, memory_index))
    }

    /// Build state around ready-made providers
    pub fn with_providers(
        config: IngestConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        writer: Arc<dyn VectorIndexWriter>,
    ) -> Self {
        let embed_permits = Arc::new(Semaphore::new(config.embeddings.max_in_flight.max(1)));
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(BoundedEmbedder::sharing(embedder, Arc::clone(&embed_permits)));
        Self::assemble(config, embed_permits, Some(embedder), Some(writer), None)
    }

    fn assemble(
        config: IngestConfig,
        embed_permits: Arc<Semaphore>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        writer: Option<Arc<dyn VectorIndexWriter>>,
        memory_index: Option<Arc<MemoryIndex>>,
    ) -> Self {
        let chunker = Arc::new(SemanticChunker::new(config.chunking.clone()));
        Self {
            inner: Arc::new(AppStateInner {
                config,
                registry: Arc::new(ExtractorRegistry::with_defaults()),
                chunker,
                embed_permits,
                embedder,
                writer,
                memory_index,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &IngestConfig {
        &self.inner.config
    }

    /// The in-process index, when the memory backend is selected
    pub fn memory_index(&self) -> Option<Arc<MemoryIndex>> {
        self.inner.memory_index.clone()
    }

    /// Pipeline for one request, using its credentials where given
    pub fn pipeline_for(&self, request: &IngestRequest) -> Result<IngestPipeline> {
        let config = &self.inner.config;

        let embedder: Arc<dyn EmbeddingProvider> = match non_blank(request.embedding_api_key.as_deref()) {
            Some(key) => {
                let provider = build_embedder(&config.embeddings, Some(key))?;
                Arc::new(BoundedEmbedder::sharing(provider, Arc::clone(&self.inner.embed_permits)))
            }
            None => self.inner.embedder.clone().ok_or_else(|| {
                Error::Config("no embedding API key configured or supplied".to_string())
            })?,
        };

        let request_writer = match non_blank(request.index_api_key.as_deref()) {
            Some(key) => build_remote_writer(&config.index, Some(key))?,
            None => None,
        };
        let writer = request_writer
            .or_else(|| self.inner.writer.clone())
            .ok_or_else(|| Error::Config("no index API key configured or supplied".to_string()))?;

        Ok(IngestPipeline::new(
            Arc::clone(&self.inner.registry),
            Arc::clone(&self.inner.chunker),
            embedder,
            writer,
        ))
    }
}

fn non_blank(key: Option<&str>) -> Option<&str> {
    key.filter(|k| !k.trim().is_empty())
}
