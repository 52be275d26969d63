//! Pinecone vector index writer
//!
//! Upserts records through the index data plane (`POST /vectors/upsert`).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::types::{IndexRecord, WriteReceipt};

use super::vector_index::{VectorIndexWriter, DEFAULT_NAMESPACE};

const API_VERSION: &str = "2024-07";

/// Pinecone data-plane writer
pub struct PineconeWriter {
    client: Client,
    upsert_url: String,
    index_name: String,
    batch_size: usize,
}

impl PineconeWriter {
    /// Create a writer for the configured index host with an explicit credential
    pub fn new(config: &IndexConfig, api_key: &str) -> Result<Self> {
        let host = config
            .host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| Error::Config("index.host is required for pinecone".to_string()))?;
        if api_key.trim().is_empty() {
            return Err(Error::Config("missing index API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| Error::Config("invalid index API key".to_string()))?,
        );
        headers.insert("x-pinecone-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to build index HTTP client: {}", e)))?;

        Ok(Self {
            client,
            upsert_url: format!("{}/vectors/upsert", base_url(host)),
            index_name: config.index_name.clone(),
            batch_size: config.upsert_batch_size.max(1),
        })
    }

    /// Convert record to a Pinecone vector; the chunk text rides in metadata
    fn record_to_vector(record: &IndexRecord) -> Vector<'_> {
        let mut metadata: HashMap<&str, serde_json::Value> = record
            .metadata
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        metadata.insert("text", serde_json::json!(record.text));

        Vector {
            id: record.id.to_string(),
            values: &record.embedding,
            metadata,
        }
    }

    async fn upsert(&self, records: &[IndexRecord], namespace: &str) -> Result<usize> {
        let request = UpsertRequest {
            vectors: records.iter().map(Self::record_to_vector).collect(),
            namespace,
        };

        let response = self
            .client
            .post(&self.upsert_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::index_write(format!("upsert request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::index_write(format!("upsert failed ({}): {}", status, body)));
        }

        let parsed: UpsertResponse = response
            .json()
            .await
            .map_err(|e| Error::index_write(format!("failed to parse upsert response: {}", e)))?;
        Ok(parsed.upserted_count)
    }
}

fn base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[derive(Serialize)]
struct Vector<'a> {
    id: String,
    values: &'a [f32],
    metadata: HashMap<&'a str, serde_json::Value>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<Vector<'a>>,
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[async_trait]
impl VectorIndexWriter for PineconeWriter {
    async fn write(&self, records: Vec<IndexRecord>, namespace: Option<&str>) -> Result<WriteReceipt> {
        let ns = namespace.unwrap_or(DEFAULT_NAMESPACE);
        let mut upserted = 0usize;

        // Batches accepted before a failing one stay in the index.
        for batch in records.chunks(self.batch_size) {
            upserted += self.upsert(batch, ns).await?;
            tracing::debug!("Upserted {}/{} vectors into {}", upserted, records.len(), self.index_name);
        }

        if upserted != records.len() {
            return Err(Error::index_write(format!(
                "index acknowledged {} of {} vectors",
                upserted,
                records.len()
            )));
        }

        Ok(WriteReceipt {
            index: self.index_name.clone(),
            backend: self.name().to_string(),
            namespace: namespace.map(str::to_string),
            record_ids: records.iter().map(|r| r.id).collect(),
            upserted_count: upserted,
            written_at: chrono::Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}
