//! Configuration for the ingestion service

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Main ingestion service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Embedding provider configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Semantic chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,
    /// Processing configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
}

impl IngestConfig {
    /// Parse a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject values the components cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.embeddings.batch_size == 0 || self.chunking.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be at least 1".to_string()));
        }
        if self.embeddings.max_in_flight == 0 || self.chunking.max_concurrency == 0 {
            return Err(Error::Config("concurrency limits must be at least 1".to_string()));
        }
        if self.index.upsert_batch_size == 0 {
            return Err(Error::Config("index.upsert_batch_size must be at least 1".to_string()));
        }
        self.chunking.threshold.validate()?;
        if self.index.backend == IndexBackend::Pinecone && self.index.host.is_none() {
            return Err(Error::Config(
                "index.host is required for the pinecone backend".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Embedding provider configuration (OpenAI-compatible endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// API base URL, `/embeddings` is appended
    pub base_url: String,
    /// Model identity; vectors from different models never share a namespace
    pub model: String,
    /// Embedding dimensions produced by the model
    pub dimensions: usize,
    /// Texts per embeddings request
    pub batch_size: usize,
    /// Retries on 429/5xx and transport errors
    pub max_retries: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Cap on in-flight embedding calls across all requests
    pub max_in_flight: usize,
    /// Default credential, supplied by the host process
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-large".to_string(),
            dimensions: 3072,
            batch_size: 64,
            max_retries: 3,
            timeout_secs: 60,
            max_in_flight: 8,
            api_key: None,
        }
    }
}

/// How the breakpoint threshold is derived from observed distances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "amount", rename_all = "snake_case")]
pub enum BreakpointThreshold {
    /// Distances above this percentile (0-100) split
    Percentile(f64),
    /// Distances above mean + amount * stddev split
    StandardDeviation(f64),
    /// Distances above mean + amount * IQR split
    Interquartile(f64),
}

impl Default for BreakpointThreshold {
    fn default() -> Self {
        Self::Percentile(95.0)
    }
}

impl BreakpointThreshold {
    fn validate(&self) -> Result<()> {
        match *self {
            Self::Percentile(p) if !(0.0..=100.0).contains(&p) => Err(Error::Config(format!(
                "breakpoint percentile must be within 0..=100, got {}",
                p
            ))),
            Self::StandardDeviation(k) | Self::Interquartile(k) if !k.is_finite() || k < 0.0 => {
                Err(Error::Config(format!(
                    "breakpoint factor must be a non-negative number, got {}",
                    k
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Semantic chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Sentences on each side included when embedding a sentence
    pub buffer_size: usize,
    /// Breakpoint threshold policy
    pub threshold: BreakpointThreshold,
    /// Chunks shorter than this merge into a neighbour (0 = off)
    pub min_chunk_chars: usize,
    /// Sentence windows per embedding call
    pub batch_size: usize,
    /// Embedding calls in flight per document
    pub max_concurrency: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1,
            threshold: BreakpointThreshold::default(),
            min_chunk_chars: 0,
            batch_size: 64,
            max_concurrency: 4,
        }
    }
}

/// Vector index backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// In-process index, for development and tests
    #[default]
    Memory,
    /// Pinecone data plane
    Pinecone,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Backend provider
    pub backend: IndexBackend,
    /// Index name reported in receipts
    pub index_name: String,
    /// Index data-plane host (required for pinecone)
    pub host: Option<String>,
    /// Vectors per upsert request
    pub upsert_batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Default credential, supplied by the host process
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Memory,
            index_name: "documents".to_string(),
            host: None,
            upsert_batch_size: 100,
            timeout_secs: 30,
            api_key: None,
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Timeout for ingesting a single file in seconds (default: 300 = 5 minutes)
    pub file_timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            file_timeout_secs: 300,
        }
    }
}
