//! In-process vector index.
//!
//! Records are partitioned by namespace. Each partition is pinned to the
//! embedding model and dimension of its first write.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{Error, Result};
use crate::types::{IndexRecord, WriteReceipt};

use super::vector_index::{VectorIndexWriter, DEFAULT_NAMESPACE};

#[derive(Debug, Default)]
struct Partition {
    model: Option<String>,
    dimensions: usize,
    records: Vec<IndexRecord>,
}

/// In-memory vector index
pub struct MemoryIndex {
    name: String,
    partitions: DashMap<String, Partition>,
}

impl MemoryIndex {
    /// Create an empty index
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: DashMap::new(),
        }
    }

    /// Total records across namespaces
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.records.len()).sum()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records stored in one namespace
    pub fn namespace_len(&self, namespace: Option<&str>) -> usize {
        self.partitions
            .get(namespace_key(namespace))
            .map(|p| p.records.len())
            .unwrap_or(0)
    }

    /// Snapshot of the records in one namespace, in write order
    pub fn records(&self, namespace: Option<&str>) -> Vec<IndexRecord> {
        self.partitions
            .get(namespace_key(namespace))
            .map(|p| p.records.clone())
            .unwrap_or_default()
    }

    /// Namespaces that hold at least one record
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .partitions
            .iter()
            .filter(|p| !p.records.is_empty())
            .map(|p| p.key().clone())
            .collect();
        names.sort();
        names
    }
}

fn namespace_key(namespace: Option<&str>) -> &str {
    namespace.unwrap_or(DEFAULT_NAMESPACE)
}

/// Check a batch on its own: uniform, non-empty vectors from one model, all
/// addressed to `namespace`.
fn validate_batch(records: &[IndexRecord], namespace: Option<&str>) -> Result<(usize, Option<String>)> {
    let first = match records.first() {
        Some(first) => first,
        None => return Ok((0, None)),
    };
    let dimensions = first.embedding.len();
    let model = first.embedding_model().map(str::to_string);

    for record in records {
        if record.embedding.is_empty() {
            return Err(Error::index_write(format!("record {} has an empty vector", record.id)));
        }
        if record.embedding.len() != dimensions {
            return Err(Error::index_write(format!(
                "record {} has {} dimensions, batch uses {}",
                record.id,
                record.embedding.len(),
                dimensions
            )));
        }
        if record.embedding_model() != model.as_deref() {
            return Err(Error::index_write(format!(
                "record {} mixes embedding models in one batch",
                record.id
            )));
        }
        if record.namespace.as_deref() != namespace {
            return Err(Error::index_write(format!(
                "record {} targets namespace {:?}, write targets {:?}",
                record.id, record.namespace, namespace
            )));
        }
    }

    Ok((dimensions, model))
}

#[async_trait]
impl VectorIndexWriter for MemoryIndex {
    async fn write(&self, records: Vec<IndexRecord>, namespace: Option<&str>) -> Result<WriteReceipt> {
        let (dimensions, model) = validate_batch(&records, namespace)?;
        let record_ids: Vec<_> = records.iter().map(|r| r.id).collect();

        if !records.is_empty() {
            // The entry guard holds the shard lock, so check-and-insert is atomic.
            let mut partition = self
                .partitions
                .entry(namespace_key(namespace).to_string())
                .or_default();

            if !partition.records.is_empty() {
                if partition.dimensions != dimensions {
                    return Err(Error::index_write(format!(
                        "namespace {:?} stores {}-dimensional vectors, batch has {}",
                        namespace, partition.dimensions, dimensions
                    )));
                }
                if partition.model != model {
                    return Err(Error::index_write(format!(
                        "namespace {:?} holds vectors from {:?}, refusing {:?}",
                        namespace, partition.model, model
                    )));
                }
            } else {
                partition.dimensions = dimensions;
                partition.model = model;
            }

            partition.records.extend(records);
        }

        tracing::debug!(
            "Memory index {} stored {} records in namespace {:?}",
            self.name,
            record_ids.len(),
            namespace
        );

        Ok(WriteReceipt {
            index: self.name.clone(),
            backend: self.name().to_string(),
            namespace: namespace.map(str::to_string),
            upserted_count: record_ids.len(),
            record_ids,
            written_at: chrono::Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}
