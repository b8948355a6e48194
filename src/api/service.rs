// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document QA service
//!
//! The transport-independent surface behind the HTTP, WebSocket and CLI
//! front ends. Every operation is keyed by a session token:
//!
//! - `submit_content`: resolve text (inline, URL or uploaded file), then index
//!   it and summarize it concurrently
//! - `ask`: stream the answer as fragments
//! - `ask_once`: the same answer as one response

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::errors::ApiError;
use super::handlers::{
    AskResponse, ContentResponse, HealthResponse, PassageInfo, SessionInfoResponse,
};
use super::streaming::{spawn_answer_stream, AnswerStream, StreamConfig, StreamOutcome};
use crate::content::{ContentFetcher, DocumentExtractor, DEFAULT_MIN_WORDS};
use crate::monitoring::{NodeMetrics, OUTCOME_OK};
use crate::rag::{word_count, RetrievalEngine, RetrievalError, Stage};
use crate::session::{validate_token, Session, SessionStore};
use crate::summarize::Summarizer;
use crate::version;

/// Where submitted content comes from
#[derive(Debug, Clone)]
pub enum ContentSource {
    Text(String),
    Url(String),
    Document { file_name: String, bytes: Vec<u8> },
}

impl ContentSource {
    pub fn label(&self) -> &'static str {
        match self {
            ContentSource::Text(_) => "text",
            ContentSource::Url(_) => "url",
            ContentSource::Document { .. } => "document",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QaServiceConfig {
    /// Submitted text with fewer words is rejected as insufficient content
    pub min_words: usize,
    pub stream: StreamConfig,
}

impl Default for QaServiceConfig {
    fn default() -> Self {
        Self {
            min_words: DEFAULT_MIN_WORDS,
            stream: StreamConfig::default(),
        }
    }
}

pub struct QaService {
    sessions: Arc<SessionStore>,
    engine: Arc<RetrievalEngine>,
    summarizer: Arc<dyn Summarizer>,
    fetcher: ContentFetcher,
    extractor: DocumentExtractor,
    metrics: NodeMetrics,
    config: QaServiceConfig,
}

impl QaService {
    pub fn new(
        sessions: Arc<SessionStore>,
        engine: Arc<RetrievalEngine>,
        summarizer: Arc<dyn Summarizer>,
        fetcher: ContentFetcher,
        metrics: NodeMetrics,
    ) -> Self {
        Self {
            sessions,
            engine,
            summarizer,
            fetcher,
            extractor: DocumentExtractor::default(),
            metrics,
            config: QaServiceConfig::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: DocumentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_config(mut self, config: QaServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn engine(&self) -> &Arc<RetrievalEngine> {
        &self.engine
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &QaServiceConfig {
        &self.config
    }

    /// Index new content for `token`, replacing the session's document
    ///
    /// Summarization runs alongside indexing; a summarizer failure leaves
    /// `summary` empty but does not fail the request.
    pub async fn submit_content(
        &self,
        token: &str,
        source: ContentSource,
    ) -> Result<ContentResponse, ApiError> {
        validate_token(token)?;
        let label = source.label();
        let (text, title) = self.resolve(source).await?;

        let words = word_count(&text);
        if words < self.config.min_words.max(1) {
            let err = RetrievalError::InsufficientContent {
                stage: Stage::Validation,
                reason: format!(
                    "content has {} words, at least {} required",
                    words, self.config.min_words
                ),
            };
            self.metrics
                .record_ingest(&err.kind().to_string(), Duration::ZERO, 0);
            return Err(err.into());
        }

        let session = self.sessions.get_or_create(token).await?;
        self.refresh_session_gauge().await;

        info!(
            session_id = %token,
            source = label,
            words,
            "Submitting content"
        );

        let started = Instant::now();
        let (ingested, summary) =
            tokio::join!(self.engine.ingest(&session, &text), self.summarize(&text));

        let ingested = match ingested {
            Ok(summary) => {
                self.metrics
                    .record_ingest(OUTCOME_OK, started.elapsed(), summary.chunk_count);
                summary
            }
            Err(e) => {
                self.metrics
                    .record_ingest(&e.kind().to_string(), started.elapsed(), 0);
                return Err(e.into());
            }
        };

        Ok(ContentResponse {
            session_id: token.to_string(),
            summary,
            chunk_count: ingested.chunk_count,
            word_count: ingested.word_count,
            source: label.to_string(),
            title,
        })
    }

    /// Stream the answer to `question` over the session's current document
    ///
    /// Every failure after this point, including a session with no
    /// document, is delivered in-band as an error event.
    pub fn ask(&self, token: &str, question: &str, k: Option<usize>) -> AnswerStream {
        let engine = Arc::clone(&self.engine);
        let sessions = Arc::clone(&self.sessions);
        let token = token.to_string();
        let question = question.to_string();

        let compute = async move {
            validate_token(&token).map_err(|e| RetrievalError::InvalidInput(e.to_string()))?;
            let session = lookup(&sessions, &token).await?;
            engine.query(&session, &question, k).await
        };

        let (stream, handle) = spawn_answer_stream(compute, &self.config.stream);
        self.metrics.record_stream_started();

        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            match handle.await {
                Ok(StreamOutcome::Completed { fragments }) => {
                    debug!("Answer stream completed with {} fragments", fragments);
                    metrics.record_query("stream", OUTCOME_OK);
                }
                Ok(StreamOutcome::Failed) => metrics.record_query("stream", "error"),
                Ok(StreamOutcome::Cancelled { fragments }) => {
                    info!("Answer stream cancelled after {} fragments", fragments);
                    metrics.record_stream_cancelled();
                    metrics.record_query("stream", "cancelled");
                }
                Err(e) => warn!("Answer stream producer panicked: {}", e),
            }
        });

        stream
    }

    /// Answer `question` in one response; equal to the concatenation of
    /// the fragments `ask` would produce
    pub async fn ask_once(
        &self,
        token: &str,
        question: &str,
        k: Option<usize>,
    ) -> Result<AskResponse, ApiError> {
        validate_token(token)?;
        let result = async {
            let session = lookup(&self.sessions, token).await?;
            self.engine.query(&session, question, k).await
        }
        .await;

        match result {
            Ok(answer) => {
                self.metrics.record_query("once", OUTCOME_OK);
                Ok(AskResponse {
                    session_id: token.to_string(),
                    answer: answer.text(),
                    passages: answer.passages.into_iter().map(PassageInfo::from).collect(),
                })
            }
            Err(e) => {
                self.metrics.record_query("once", &e.kind().to_string());
                Err(e.into())
            }
        }
    }

    pub async fn session_info(&self, token: &str) -> Result<SessionInfoResponse, ApiError> {
        validate_token(token)?;
        let session = self
            .sessions
            .get(token)
            .await
            .ok_or_else(|| ApiError::NotFound(format!("session {}", token)))?;
        let chunk_count = session
            .snapshot()
            .await
            .map(|store| store.count())
            .unwrap_or(0);

        Ok(SessionInfoResponse {
            session_id: token.to_string(),
            status: session.status().await,
            generation: session.generation().await,
            chunk_count,
            started_at: session.started_at(),
            idle_secs: session.idle_for().as_secs(),
        })
    }

    /// Drop the session and its index
    pub async fn remove_session(&self, token: &str) -> Result<(), ApiError> {
        validate_token(token)?;
        let removed = self.sessions.remove(token).await;
        self.refresh_session_gauge().await;
        if removed {
            info!(session_id = %token, "Session removed");
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("session {}", token)))
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let sessions = self.sessions.len().await;
        self.metrics.set_live_sessions(sessions);
        HealthResponse {
            status: "ok".to_string(),
            version: version::VERSION_NUMBER.to_string(),
            sessions,
            embedding_model: self.engine.model_name().to_string(),
            summarizer: self.summarizer.name().to_string(),
            issues: None,
        }
    }

    pub async fn refresh_session_gauge(&self) {
        self.metrics.set_live_sessions(self.sessions.len().await);
    }

    async fn resolve(
        &self,
        source: ContentSource,
    ) -> Result<(String, Option<String>), ApiError> {
        match source {
            // Blank text falls through to the word floor as a content error
            ContentSource::Text(text) => Ok((text, None)),
            ContentSource::Url(url) => {
                let page = self.fetcher.fetch_content(&url).await?;
                let title = (!page.title.is_empty()).then_some(page.title);
                Ok((page.text, title))
            }
            ContentSource::Document { file_name, bytes } => {
                let document = self.extractor.extract(&file_name, &bytes).await?;
                debug!(
                    "Extracted {} ({}, ocr: {})",
                    file_name, document.kind, document.used_ocr
                );
                Ok((document.text, Some(file_name)))
            }
        }
    }

    async fn summarize(&self, text: &str) -> Option<String> {
        match self.summarizer.summarize(text).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("Summarizer {} failed: {}", self.summarizer.name(), e);
                None
            }
        }
    }
}

async fn lookup(sessions: &SessionStore, token: &str) -> Result<Arc<Session>, RetrievalError> {
    sessions
        .get(token)
        .await
        .ok_or_else(|| RetrievalError::NotReady {
            session_id: token.to_string(),
        })
}
