// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Summarization
//!
//! Summaries are shown to the user next to the ingest result and are never
//! indexed; retrieval always runs over the original text.

pub mod chat;
pub mod iterative;
pub mod lead;

use async_trait::async_trait;
use thiserror::Error;

pub use chat::{ChatSummarizer, ChatSummarizerConfig};
pub use iterative::IterativeSummarizer;
pub use lead::LeadSummarizer;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SummarizeError {
    #[error("Nothing to summarize")]
    EmptyInput,

    #[error("Summarizer request failed: {0}")]
    Request(String),

    #[error("Summarizer returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid summarizer response: {0}")]
    InvalidResponse(String),
}

/// Text → shorter text capability
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError>;

    fn name(&self) -> &str;
}
