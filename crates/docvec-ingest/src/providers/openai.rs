//! OpenAI-compatible embedding provider.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;

/// Embeddings client that talks to OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    max_retries: u32,
    batch_size: usize,
}

impl OpenAiEmbedder {
    /// Builds a client from config and an explicit credential.
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("missing embedding API key".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(Error::Config("missing embedding model name".to_string()));
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| Error::Config("invalid embedding API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to build embedding HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_retries: config.max_retries,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Maximum batch size configured for this client.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Sends one request's worth of inputs and returns the vectors in input order.
    async fn request_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0u32;
        loop {
            let request = EmbeddingRequest {
                model: &self.model,
                input: inputs,
            };
            match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse = resp.json().await.map_err(|e| {
                            Error::embedding(format!("failed to parse embedding response: {}", e))
                        })?;
                        return self.into_vectors(parsed, inputs.len());
                    }

                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::warn!(
                            "Embedding request failed ({}), retry {}/{}",
                            status,
                            attempt,
                            self.max_retries
                        );
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(Error::embedding(format!(
                        "embedding request failed ({}): {}",
                        status, body
                    )));
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::warn!(
                            "Embedding transport error: {}, retry {}/{}",
                            err,
                            attempt,
                            self.max_retries
                        );
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    if err.is_timeout() {
                        return Err(Error::embedding(format!("embedding request timed out: {}", err)));
                    }
                    return Err(Error::embedding(format!("embedding request failed: {}", err)));
                }
            }
        }
    }

    fn into_vectors(&self, mut parsed: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
        if parsed.data.len() != expected {
            return Err(Error::embedding(format!(
                "provider returned {} embeddings for {} inputs",
                parsed.data.len(),
                expected
            )));
        }
        parsed.data.sort_by_key(|entry| entry.index);

        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|entry| entry.embedding).collect();
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(Error::embedding(format!(
                "model {} returned {}-dimensional vectors, expected {}",
                self.model,
                bad.len(),
                self.dimensions
            )));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("No embedding in response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            tracing::debug!("Embedding batch of {} texts with {}", batch.len(), self.model);
            all_embeddings.extend(self.request_batch(batch).await?);
        }
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request()
}

fn retry_backoff(attempt: u32) -> Duration {
    let capped = attempt.min(5);
    Duration::from_millis(500 * (1 << capped))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
