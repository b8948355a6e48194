// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;

use super::{SummarizeError, Summarizer};
use crate::rag::{SentenceChunker, PASSAGE_SEPARATOR};

/// Extractive summary: the document's first sentences
#[derive(Debug, Clone)]
pub struct LeadSummarizer {
    sentences: usize,
    chunker: SentenceChunker,
    name: String,
}

impl Default for LeadSummarizer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl LeadSummarizer {
    pub fn new(sentences: usize) -> Self {
        let sentences = sentences.max(1);
        Self {
            sentences,
            chunker: SentenceChunker::new(),
            name: format!("lead-{}", sentences),
        }
    }
}

#[async_trait]
impl Summarizer for LeadSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let sentences = self
            .chunker
            .chunk(text)
            .map_err(|_| SummarizeError::EmptyInput)?;

        Ok(sentences
            .into_iter()
            .take(self.sentences)
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
