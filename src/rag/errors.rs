// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for document ingestion and retrieval
//!
//! Every failure from the chunker, the embedding adapter or the vector index
//! is re-classified here into one of four kinds:
//! - `Input`: the caller sent something unusable (empty question, k = 0)
//! - `Content`: the document does not carry enough text to index
//! - `Capability`: an embedding, index build or search operation failed
//! - `NotReady`: the session has no successfully ingested document yet

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::chunker::ChunkError;
use super::vector_index::IndexError;
use crate::embeddings::EmbeddingError;

/// Pipeline stage at which a retrieval operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Chunking,
    Embedding,
    IndexBuild,
    Search,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::Chunking => "chunking",
            Stage::Embedding => "embedding",
            Stage::IndexBuild => "index build",
            Stage::Search => "search",
        };
        f.write_str(name)
    }
}

/// Caller-facing classification of a `RetrievalError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "invalid_request")]
    Input,
    #[serde(rename = "content_error")]
    Content,
    #[serde(rename = "capability_error")]
    Capability,
    #[serde(rename = "not_ready")]
    NotReady,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Input => "invalid_request",
            ErrorKind::Content => "content_error",
            ErrorKind::Capability => "capability_error",
            ErrorKind::NotReady => "not_ready",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RetrievalError {
    /// Missing or malformed caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Too little text to build an index from
    #[error("Insufficient content ({stage}): {reason}")]
    InsufficientContent { stage: Stage, reason: String },

    /// Embedding, index build or search failure
    #[error("{stage} failed: {reason}")]
    Capability { stage: Stage, reason: String },

    /// Query issued before any successful ingest
    #[error("Session {session_id} has no indexed document; submit content first")]
    NotReady { session_id: String },
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::InvalidInput(_) => ErrorKind::Input,
            RetrievalError::InsufficientContent { .. } => ErrorKind::Content,
            RetrievalError::Capability { .. } => ErrorKind::Capability,
            RetrievalError::NotReady { .. } => ErrorKind::NotReady,
        }
    }

    /// Stage that failed, when the error came out of the pipeline
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RetrievalError::InsufficientContent { stage, .. }
            | RetrievalError::Capability { stage, .. } => Some(*stage),
            RetrievalError::InvalidInput(_) => Some(Stage::Validation),
            RetrievalError::NotReady { .. } => None,
        }
    }

    pub fn capability(stage: Stage, reason: impl fmt::Display) -> Self {
        RetrievalError::Capability {
            stage,
            reason: reason.to_string(),
        }
    }

    pub fn from_chunk_error(err: ChunkError) -> Self {
        match err {
            ChunkError::EmptyInput => RetrievalError::InsufficientContent {
                stage: Stage::Chunking,
                reason: err.to_string(),
            },
        }
    }

    pub fn from_embedding_error(err: EmbeddingError) -> Self {
        Self::capability(Stage::Embedding, err)
    }

    /// Index errors become capability failures of the given stage, except a
    /// zero `k` which is the caller's mistake
    pub fn from_index_error(stage: Stage, err: IndexError) -> Self {
        match err {
            IndexError::InvalidK(k) => {
                RetrievalError::InvalidInput(format!("k must be at least 1 (got {})", k))
            }
            other => Self::capability(stage, other),
        }
    }
}
