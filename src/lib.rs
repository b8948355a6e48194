// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod content;
pub mod embeddings;
pub mod monitoring;
pub mod rag;
pub mod session;
pub mod summarize;
pub mod version;

pub use api::{AnswerStream, ApiError, ContentSource, QaService, StreamEvent};
pub use config::NodeConfig;
pub use embeddings::{EmbeddingAdapter, HashingEmbedder};
pub use rag::{Answer, RetrievalEngine, RetrievalError, SentenceChunker, VectorStore};
pub use session::{Session, SessionStore};
