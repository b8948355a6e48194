// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! Every setting comes from an environment variable (optionally loaded from
//! `.env`) with a default. The `build_*` helpers turn the configuration into
//! the capability objects the service is wired from; each is built once at
//! startup and shared behind an `Arc`.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::api::{QaService, QaServiceConfig, StreamConfig};
use crate::content::{ContentFetchConfig, ContentFetcher, DocumentExtractor, VlmOcrEngine};
use crate::embeddings::{
    EmbeddingAdapter, HashingEmbedder, RemoteEmbeddingClient, RemoteEmbeddingConfig,
};
use crate::monitoring::NodeMetrics;
use crate::rag::{FragmentMode, RetrievalConfig, RetrievalEngine};
use crate::session::{SessionStore, SessionStoreConfig};
use crate::summarize::{
    ChatSummarizer, ChatSummarizerConfig, IterativeSummarizer, LeadSummarizer, Summarizer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Feature hashing; no model files or network needed
    Hash,
    /// HTTP embedding service
    Remote,
    /// Local ONNX model (requires the `onnx` feature)
    Onnx,
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hash" | "hashing" => Ok(Self::Hash),
            "remote" | "http" => Ok(Self::Remote),
            "onnx" => Ok(Self::Onnx),
            other => Err(format!("unknown embedding backend '{}'", other)),
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash => write!(f, "hash"),
            Self::Remote => write!(f, "remote"),
            Self::Onnx => write!(f, "onnx"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryBackend {
    /// First sentences of the document
    Lead,
    /// OpenAI-compatible chat endpoint, iterated over windows
    Chat,
}

impl FromStr for SummaryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lead" => Ok(Self::Lead),
            "chat" | "llm" => Ok(Self::Chat),
            other => Err(format!("unknown summary backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub api_host: String,
    pub api_port: u16,

    pub embedding_backend: EmbeddingBackend,
    pub embedding_dimension: usize,
    pub embedding_model: String,
    pub embedding_url: String,
    pub onnx_model_path: String,
    pub onnx_tokenizer_path: String,
    pub embed_timeout_secs: u64,

    pub retrieval_top_k: usize,
    pub min_content_words: usize,

    pub summary_backend: SummaryBackend,
    pub summary_sentences: usize,
    pub summary_max_input_chars: usize,
    pub summary_max_rounds: usize,
    pub summary_url: String,
    pub summary_model: String,

    /// VLM sidecar for OCR; OCR is disabled when unset
    pub ocr_url: Option<String>,
    pub ocr_model: String,

    /// Zero disables idle eviction
    pub session_idle_ttl_secs: u64,
    pub session_sweep_interval_secs: u64,
    pub max_sessions: usize,

    pub stream_channel_capacity: usize,
    pub stream_fragment_mode: FragmentMode,
    pub stream_fragment_delay_ms: u64,

    pub content: ContentFetchConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            api_host: "127.0.0.1".to_string(),
            api_port: 8080,
            embedding_backend: EmbeddingBackend::Hash,
            embedding_dimension: 384,
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            embedding_url: "http://127.0.0.1:8090/v1/embed".to_string(),
            onnx_model_path: "./models/all-MiniLM-L6-v2-onnx/model.onnx".to_string(),
            onnx_tokenizer_path: "./models/all-MiniLM-L6-v2-onnx/tokenizer.json".to_string(),
            embed_timeout_secs: 30,
            retrieval_top_k: 3,
            min_content_words: 20,
            summary_backend: SummaryBackend::Lead,
            summary_sentences: 3,
            summary_max_input_chars: 1000,
            summary_max_rounds: 4,
            summary_url: "http://127.0.0.1:8081".to_string(),
            summary_model: "flan-t5-large".to_string(),
            ocr_url: None,
            ocr_model: "florence-2".to_string(),
            session_idle_ttl_secs: 3600,
            session_sweep_interval_secs: 300,
            max_sessions: 10_000,
            stream_channel_capacity: 16,
            stream_fragment_mode: FragmentMode::Sentence,
            stream_fragment_delay_ms: 0,
            content: ContentFetchConfig::default(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: String) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

impl NodeConfig {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let d = Self::default();
        Self {
            api_host: env_string("API_HOST", d.api_host),
            api_port: env_parse("API_PORT", d.api_port),
            embedding_backend: env_parse("EMBEDDING_BACKEND", d.embedding_backend),
            embedding_dimension: env_parse("EMBEDDING_DIMENSION", d.embedding_dimension),
            embedding_model: env_string("EMBEDDING_MODEL", d.embedding_model),
            embedding_url: env_string("EMBEDDING_URL", d.embedding_url),
            onnx_model_path: env_string("ONNX_MODEL_PATH", d.onnx_model_path),
            onnx_tokenizer_path: env_string("ONNX_TOKENIZER_PATH", d.onnx_tokenizer_path),
            embed_timeout_secs: env_parse("EMBED_TIMEOUT_SECS", d.embed_timeout_secs),
            retrieval_top_k: env_parse("RETRIEVAL_TOP_K", d.retrieval_top_k),
            min_content_words: env_parse("MIN_CONTENT_WORDS", d.min_content_words),
            summary_backend: env_parse("SUMMARY_BACKEND", d.summary_backend),
            summary_sentences: env_parse("SUMMARY_SENTENCES", d.summary_sentences),
            summary_max_input_chars: env_parse(
                "SUMMARY_MAX_INPUT_CHARS",
                d.summary_max_input_chars,
            ),
            summary_max_rounds: env_parse("SUMMARY_MAX_ROUNDS", d.summary_max_rounds),
            summary_url: env_string("SUMMARY_URL", d.summary_url),
            summary_model: env_string("SUMMARY_MODEL", d.summary_model),
            ocr_url: env::var("OCR_URL").ok().filter(|v| !v.trim().is_empty()),
            ocr_model: env_string("OCR_MODEL", d.ocr_model),
            session_idle_ttl_secs: env_parse("SESSION_IDLE_TTL_SECS", d.session_idle_ttl_secs),
            session_sweep_interval_secs: env_parse(
                "SESSION_SWEEP_INTERVAL_SECS",
                d.session_sweep_interval_secs,
            ),
            max_sessions: env_parse("MAX_SESSIONS", d.max_sessions),
            stream_channel_capacity: env_parse(
                "STREAM_CHANNEL_CAPACITY",
                d.stream_channel_capacity,
            ),
            stream_fragment_mode: env_parse("STREAM_FRAGMENT_MODE", d.stream_fragment_mode),
            stream_fragment_delay_ms: env_parse(
                "STREAM_FRAGMENT_DELAY_MS",
                d.stream_fragment_delay_ms,
            ),
            content: ContentFetchConfig::from_env(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.embedding_dimension == 0 {
            return Err("EMBEDDING_DIMENSION must be at least 1".to_string());
        }
        if self.retrieval_top_k == 0 {
            return Err("RETRIEVAL_TOP_K must be at least 1".to_string());
        }
        if self.embed_timeout_secs == 0 {
            return Err("EMBED_TIMEOUT_SECS must be at least 1".to_string());
        }
        if self.summary_max_input_chars < 100 {
            return Err("SUMMARY_MAX_INPUT_CHARS must be at least 100".to_string());
        }
        if self.summary_max_rounds == 0 {
            return Err("SUMMARY_MAX_ROUNDS must be at least 1".to_string());
        }
        if self.max_sessions == 0 {
            return Err("MAX_SESSIONS must be at least 1".to_string());
        }
        if self.stream_channel_capacity == 0 {
            return Err("STREAM_CHANNEL_CAPACITY must be at least 1".to_string());
        }
        if self.session_idle_ttl_secs > 0 && self.session_sweep_interval_secs == 0 {
            return Err("SESSION_SWEEP_INTERVAL_SECS must be at least 1".to_string());
        }
        self.content.validate()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .with_context(|| format!("invalid API address {}:{}", self.api_host, self.api_port))
    }

    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            default_k: self.retrieval_top_k,
            embed_timeout: Duration::from_secs(self.embed_timeout_secs),
            ..RetrievalConfig::default()
        }
    }

    pub fn session_store_config(&self) -> SessionStoreConfig {
        SessionStoreConfig {
            max_sessions: self.max_sessions,
            idle_ttl: (self.session_idle_ttl_secs > 0)
                .then(|| Duration::from_secs(self.session_idle_ttl_secs)),
            sweep_interval: Duration::from_secs(self.session_sweep_interval_secs.max(1)),
        }
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            capacity: self.stream_channel_capacity,
            mode: self.stream_fragment_mode,
            fragment_delay: Duration::from_millis(self.stream_fragment_delay_ms),
        }
    }

    pub fn build_embedder(&self) -> Result<Arc<dyn EmbeddingAdapter>> {
        let embedder: Arc<dyn EmbeddingAdapter> = match self.embedding_backend {
            EmbeddingBackend::Hash => Arc::new(HashingEmbedder::new(self.embedding_dimension)),
            EmbeddingBackend::Remote => Arc::new(
                RemoteEmbeddingClient::new(RemoteEmbeddingConfig {
                    endpoint: self.embedding_url.clone(),
                    model: self.embedding_model.clone(),
                    dimension: self.embedding_dimension,
                    timeout_secs: self.embed_timeout_secs,
                    ..RemoteEmbeddingConfig::default()
                })
                .context("failed to create embedding client")?,
            ),
            EmbeddingBackend::Onnx => self.build_onnx_embedder()?,
        };

        info!(
            "Embedding backend: {} (model {}, {} dimensions)",
            self.embedding_backend,
            embedder.model_name(),
            embedder.dimension()
        );
        Ok(embedder)
    }

    #[cfg(feature = "onnx")]
    fn build_onnx_embedder(&self) -> Result<Arc<dyn EmbeddingAdapter>> {
        let model = crate::embeddings::OnnxEmbeddingModel::load(
            &self.embedding_model,
            &self.onnx_model_path,
            &self.onnx_tokenizer_path,
        )?;
        Ok(Arc::new(model))
    }

    #[cfg(not(feature = "onnx"))]
    fn build_onnx_embedder(&self) -> Result<Arc<dyn EmbeddingAdapter>> {
        Err(anyhow!(
            "EMBEDDING_BACKEND=onnx requires a build with the `onnx` feature"
        ))
    }

    pub fn build_summarizer(&self) -> Result<Arc<dyn Summarizer>> {
        let summarizer: Arc<dyn Summarizer> = match self.summary_backend {
            SummaryBackend::Lead => Arc::new(LeadSummarizer::new(self.summary_sentences)),
            SummaryBackend::Chat => {
                let chat = ChatSummarizer::new(ChatSummarizerConfig {
                    endpoint: self.summary_url.clone(),
                    model: self.summary_model.clone(),
                    ..ChatSummarizerConfig::default()
                })
                .map_err(|e| anyhow!("failed to create summarizer: {}", e))?;
                Arc::new(IterativeSummarizer::new(
                    chat,
                    self.summary_max_input_chars,
                    self.summary_max_rounds,
                ))
            }
        };
        info!("Summarizer: {}", summarizer.name());
        Ok(summarizer)
    }

    pub fn build_extractor(&self) -> Result<DocumentExtractor> {
        let extractor = DocumentExtractor::new(self.min_content_words, 200_000);
        match &self.ocr_url {
            Some(url) => {
                let ocr = VlmOcrEngine::new(
                    url,
                    &self.ocr_model,
                    Duration::from_secs(self.content.timeout_secs.max(60)),
                )
                .map_err(|e| anyhow!("failed to create OCR engine: {}", e))?;
                Ok(extractor.with_ocr(Arc::new(ocr)))
            }
            None => Ok(extractor),
        }
    }

    /// Wire the full service; also starts the idle-session sweeper
    pub fn build_service(&self, metrics: NodeMetrics) -> Result<QaService> {
        let embedder = self.build_embedder()?;
        let engine = RetrievalEngine::new(embedder, self.retrieval_config());
        let sessions = Arc::new(SessionStore::new(self.session_store_config()));
        if sessions.spawn_sweeper().is_some() {
            info!(
                "Idle sessions expire after {}s",
                self.session_idle_ttl_secs
            );
        }

        let content = ContentFetchConfig {
            min_words: self.min_content_words,
            ..self.content.clone()
        };
        let fetcher = ContentFetcher::new(content)
            .map_err(|e| anyhow!("failed to create content fetcher: {}", e))?;

        Ok(QaService::new(
            sessions,
            Arc::new(engine),
            self.build_summarizer()?,
            fetcher,
            metrics,
        )
        .with_extractor(self.build_extractor()?)
        .with_config(QaServiceConfig {
            min_words: self.min_content_words,
            stream: self.stream_config(),
        }))
    }
}
