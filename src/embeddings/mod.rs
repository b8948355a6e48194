// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Embedding adapters
//!
//! The retrieval engine treats the embedding model as an external capability
//! behind [`EmbeddingAdapter`]. One adapter instance is built at startup and
//! shared by reference; it must be deterministic for a fixed model version so
//! that chunks and questions land in the same vector space.

pub mod hashing;
#[cfg(feature = "onnx")]
pub mod onnx_model;
pub mod remote;

use async_trait::async_trait;
use thiserror::Error;

pub use hashing::HashingEmbedder;
#[cfg(feature = "onnx")]
pub use onnx_model::OnnxEmbeddingModel;
pub use remote::{RemoteEmbeddingClient, RemoteEmbeddingConfig};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Embedding service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Embedding timed out after {0}s")]
    Timeout(u64),
}

/// Batch text → fixed-dimension vector capability
#[async_trait]
pub trait EmbeddingAdapter: Send + Sync {
    /// Embed every text in one call; output order matches input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Length of every vector this adapter returns
    fn dimension(&self) -> usize;

    /// Model identifier for logs and health output
    fn model_name(&self) -> &str;
}

/// Check an adapter's output against the request: one vector per input, all
/// of the adapter's declared dimension
pub fn validate_batch(
    vectors: &[Vec<f32>],
    expected_count: usize,
    dimension: usize,
) -> Result<(), EmbeddingError> {
    if vectors.len() != expected_count {
        return Err(EmbeddingError::CountMismatch {
            expected: expected_count,
            actual: vectors.len(),
        });
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }
    Ok(())
}
