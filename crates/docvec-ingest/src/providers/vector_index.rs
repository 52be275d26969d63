//! Vector index writer trait for persisting embedded chunks

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{IndexRecord, WriteReceipt};

/// Namespace key used for the default partition
pub const DEFAULT_NAMESPACE: &str = "";

/// Trait for writing records into a vector index
///
/// A write is all-or-nothing from the caller's point of view: any failure is
/// reported once for the whole batch.
///
/// Implementations:
/// - `MemoryIndex`: in-process index partitioned by namespace
/// - `PineconeWriter`: Pinecone data-plane upsert
#[async_trait]
pub trait VectorIndexWriter: Send + Sync {
    /// Persist a batch of records under a namespace (None = default partition)
    async fn write(&self, records: Vec<IndexRecord>, namespace: Option<&str>) -> Result<WriteReceipt>;

    /// Check if the index is reachable
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// Get writer name for logging
    fn name(&self) -> &str;
}
