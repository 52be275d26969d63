//! Provider abstractions for embeddings and vector index writes
//!
//! Trait-based seams let the pipeline switch between the OpenAI-compatible
//! embedder, the in-process index and Pinecone without code changes.

pub mod embedding;
pub mod memory;
pub mod openai;
pub mod pinecone;
pub mod vector_index;

use std::sync::Arc;

use crate::config::{EmbeddingConfig, IndexBackend, IndexConfig};
use crate::error::{Error, Result};

pub use embedding::{cosine_distance, cosine_similarity, BoundedEmbedder, EmbeddingProvider};
pub use memory::MemoryIndex;
pub use openai::OpenAiEmbedder;
pub use pinecone::PineconeWriter;
pub use vector_index::{VectorIndexWriter, DEFAULT_NAMESPACE};

/// Pick the request credential when present, else the configured default
fn resolve_key<'a>(override_key: Option<&'a str>, configured: Option<&'a str>) -> Option<&'a str> {
    override_key
        .filter(|k| !k.trim().is_empty())
        .or(configured.filter(|k| !k.trim().is_empty()))
}

/// Build the embedding provider, preferring a per-request credential
pub fn build_embedder(config: &EmbeddingConfig, api_key: Option<&str>) -> Result<Arc<dyn EmbeddingProvider>> {
    let key = resolve_key(api_key, config.api_key.as_deref())
        .ok_or_else(|| Error::Config("no embedding API key configured or supplied".to_string()))?;
    Ok(Arc::new(OpenAiEmbedder::new(config, key)?))
}

/// Build the remote index writer for the configured backend
///
/// Returns `None` for the memory backend, which is a shared instance owned by
/// the server rather than a per-request client.
pub fn build_remote_writer(
    config: &IndexConfig,
    api_key: Option<&str>,
) -> Result<Option<Arc<dyn VectorIndexWriter>>> {
    match config.backend {
        IndexBackend::Memory => Ok(None),
        IndexBackend::Pinecone => {
            let key = resolve_key(api_key, config.api_key.as_deref())
                .ok_or_else(|| Error::Config("no index API key configured or supplied".to_string()))?;
            Ok(Some(Arc::new(PineconeWriter::new(config, key)?)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_overrides_configured() {
        assert_eq!(resolve_key(Some("req"), Some("cfg")), Some("req"));
        assert_eq!(resolve_key(Some("  "), Some("cfg")), Some("cfg"));
        assert_eq!(resolve_key(None, None), None);
    }

    #[test]
    fn test_missing_embedding_key_is_config_error() {
        let err = build_embedder(&EmbeddingConfig::default(), None).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_memory_backend_has_no_remote_writer() {
        assert!(build_remote_writer(&IndexConfig::default(), None).unwrap().is_none());

        let config = IndexConfig {
            backend: IndexBackend::Pinecone,
            host: Some("docs.svc.pinecone.io".to_string()),
            ..Default::default()
        };
        let err = build_remote_writer(&config, None).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(
            build_remote_writer(&config, Some("pc-key")).unwrap().unwrap().name(),
            "pinecone"
        );
    }
}
