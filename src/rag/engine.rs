// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval engine
//!
//! Ingest: text → sentence chunks → one batched embedding call → flat index,
//! then a single swap into the session. Nothing is written to the session
//! unless every stage succeeds.
//!
//! Query: question → one embedding → exhaustive search over the session's
//! current store snapshot → ranked passages.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::answer::Answer;
use super::chunker::{word_count, SentenceChunker};
use super::errors::{RetrievalError, Stage};
use super::vector_store::VectorStore;
use crate::embeddings::{validate_batch, EmbeddingAdapter, EmbeddingError};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Documents with fewer words are rejected as insufficient content
    pub min_words: usize,
    /// Passages returned when the caller does not pass `k`
    pub default_k: usize,
    /// Upper bound on a single embedding call
    pub embed_timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_words: 1,
            default_k: 3,
            embed_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of a successful ingest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub chunk_count: usize,
    pub word_count: usize,
    pub dimension: usize,
    /// Session generation after the swap (1 for the first document)
    pub generation: u64,
    pub elapsed_ms: u64,
}

pub struct RetrievalEngine {
    embedder: Arc<dyn EmbeddingAdapter>,
    chunker: SentenceChunker,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn EmbeddingAdapter>, config: RetrievalConfig) -> Self {
        Self {
            embedder,
            chunker: SentenceChunker::new(),
            config,
        }
    }

    pub fn with_chunker(mut self, chunker: SentenceChunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn chunker(&self) -> &SentenceChunker {
        &self.chunker
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Chunk, embed and index `raw_text` without touching any session
    pub async fn build_store(&self, raw_text: &str) -> Result<VectorStore, RetrievalError> {
        let words = word_count(raw_text);
        if words < self.config.min_words.max(1) {
            return Err(RetrievalError::InsufficientContent {
                stage: Stage::Validation,
                reason: format!(
                    "document has {} words, at least {} required",
                    words,
                    self.config.min_words.max(1)
                ),
            });
        }

        let chunks = self
            .chunker
            .chunk(raw_text)
            .map_err(RetrievalError::from_chunk_error)?;

        let embeddings = self.embed(&chunks).await?;

        VectorStore::new(chunks, embeddings)
            .map_err(|e| RetrievalError::from_index_error(Stage::IndexBuild, e))
    }

    /// Index `raw_text` and install it as the session's document
    ///
    /// On error the session keeps whatever store it had before.
    pub async fn ingest(
        &self,
        session: &Session,
        raw_text: &str,
    ) -> Result<IngestSummary, RetrievalError> {
        let started = Instant::now();
        debug!("Ingesting {} bytes into session {}", raw_text.len(), session.id());

        let store = match self.build_store(raw_text).await {
            Ok(store) => store,
            Err(e) => {
                warn!("Ingest failed for session {}: {}", session.id(), e);
                return Err(e);
            }
        };

        let chunk_count = store.count();
        let dimension = store.dimension();
        let generation = session
            .install(raw_text.to_string(), Arc::new(store))
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            "Ingested {} chunks into session {} (generation {}, {}ms)",
            chunk_count,
            session.id(),
            generation,
            elapsed_ms
        );

        Ok(IngestSummary {
            chunk_count,
            word_count: word_count(raw_text),
            dimension,
            generation,
            elapsed_ms,
        })
    }

    /// Retrieve the `k` passages closest to `question`
    ///
    /// `k` defaults to `RetrievalConfig::default_k`. Searches a snapshot of
    /// the session's store; a concurrent ingest does not affect this call.
    pub async fn query(
        &self,
        session: &Session,
        question: &str,
        k: Option<usize>,
    ) -> Result<Answer, RetrievalError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RetrievalError::InvalidInput(
                "question must not be empty".to_string(),
            ));
        }
        let k = k.unwrap_or(self.config.default_k);
        if k < 1 {
            return Err(RetrievalError::InvalidInput(format!(
                "k must be at least 1 (got {})",
                k
            )));
        }

        let store = session.snapshot().await.ok_or_else(|| RetrievalError::NotReady {
            session_id: session.id().to_string(),
        })?;
        session.touch();

        let mut vectors = self.embed(&[question.to_string()]).await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| RetrievalError::capability(Stage::Embedding, "no query vector"))?;

        let passages = store
            .search(&query_vector, k)
            .map_err(|e| RetrievalError::from_index_error(Stage::Search, e))?;

        debug!(
            "Query on session {} returned {} of {} chunks",
            session.id(),
            passages.len(),
            store.count()
        );

        Ok(Answer::new(passages))
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let timeout = self.config.embed_timeout;
        let vectors = tokio::time::timeout(timeout, self.embedder.embed(texts))
            .await
            .map_err(|_| {
                RetrievalError::from_embedding_error(EmbeddingError::Timeout(timeout.as_secs()))
            })?
            .map_err(RetrievalError::from_embedding_error)?;

        validate_batch(&vectors, texts.len(), self.embedder.dimension())
            .map_err(RetrievalError::from_embedding_error)?;

        Ok(vectors)
    }
}
