//! Ingestion request types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Request to ingest one file into the vector index
#[derive(Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Path of the file to ingest
    pub file_path: String,
    /// Target namespace (omitted or empty = default partition)
    #[serde(default)]
    pub namespace: Option<String>,
    /// Embedding provider credential, overrides the configured one
    #[serde(default, alias = "openai_api_key")]
    pub embedding_api_key: Option<String>,
    /// Vector index credential, overrides the configured one
    #[serde(default, alias = "pinecone_api_key")]
    pub index_api_key: Option<String>,
}

impl IngestRequest {
    /// Request for a path in the default namespace
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            namespace: None,
            embedding_api_key: None,
            index_api_key: None,
        }
    }

    /// Set the namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Namespace with empty strings folded into the default partition
    pub fn namespace(&self) -> Option<&str> {
        self.namespace
            .as_deref()
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
    }

    /// Reject requests the pipeline cannot start on
    pub fn validate(&self) -> Result<()> {
        if self.file_path.trim().is_empty() {
            return Err(Error::InvalidInput("file_path must not be empty".to_string()));
        }
        Ok(())
    }
}

// Credentials stay out of logs.
impl fmt::Debug for IngestRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestRequest")
            .field("file_path", &self.file_path)
            .field("namespace", &self.namespace)
            .field("embedding_api_key", &self.embedding_api_key.as_ref().map(|_| "***"))
            .field("index_api_key", &self.index_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}
