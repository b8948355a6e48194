// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP client for a remote `/v1/embed` service
//!
//! Request body: `{"texts": [...], "model": "all-MiniLM-L6-v2"}`
//! Response body: `{"embeddings": [{"embedding": [...], ...}], "model": "..."}`
//!
//! The service caps texts per request, so a large batch is sent as several
//! sequential requests and reassembled in input order.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{validate_batch, EmbeddingAdapter, EmbeddingError};

#[derive(Debug, Clone)]
pub struct RemoteEmbeddingConfig {
    /// Full endpoint URL, e.g. `http://localhost:8080/v1/embed`
    pub endpoint: String,
    pub model: String,
    pub dimension: usize,
    /// Maximum texts per HTTP request (default: 96)
    pub max_batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for RemoteEmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/v1/embed".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            max_batch_size: 96,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequestBody<'a> {
    texts: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbedResponseBody {
    embeddings: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

pub struct RemoteEmbeddingClient {
    client: Client,
    config: RemoteEmbeddingConfig,
}

impl RemoteEmbeddingClient {
    pub fn new(config: RemoteEmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;

        Ok(Self { client, config })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = EmbedRequestBody {
            texts,
            model: &self.config.model,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout(self.config.timeout_secs)
                } else {
                    EmbeddingError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbedResponseBody = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        Ok(parsed.embeddings.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingAdapter for RemoteEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.config.max_batch_size.max(1)) {
            debug!("Requesting {} embeddings from {}", batch.len(), self.config.endpoint);
            vectors.extend(self.embed_batch(batch).await?);
        }

        validate_batch(&vectors, texts.len(), self.config.dimension)?;
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
