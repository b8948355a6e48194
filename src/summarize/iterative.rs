// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Summarize-the-summaries for inputs larger than a model's context
//!
//! Each round splits the current text into sentence-aligned windows of at
//! most `max_input_chars`, summarizes every window and joins the results.
//! Rounds repeat while the joined summary is still too long, up to
//! `max_rounds`; after that the text is truncated on a word boundary.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{SummarizeError, Summarizer};
use crate::content::extractor::truncate_content;
use crate::rag::{SentenceChunker, PASSAGE_SEPARATOR};

pub struct IterativeSummarizer<S> {
    inner: S,
    chunker: SentenceChunker,
    max_input_chars: usize,
    max_rounds: usize,
    name: String,
}

impl<S: Summarizer> IterativeSummarizer<S> {
    pub fn new(inner: S, max_input_chars: usize, max_rounds: usize) -> Self {
        let name = format!("iterative({})", inner.name());
        Self {
            inner,
            chunker: SentenceChunker::new(),
            max_input_chars: max_input_chars.max(1),
            max_rounds: max_rounds.max(1),
            name,
        }
    }

    /// Sentence-aligned windows of at most `max_input_chars` characters
    pub fn windows(&self, text: &str) -> Result<Vec<String>, SummarizeError> {
        let sentences = self
            .chunker
            .chunk(text)
            .map_err(|_| SummarizeError::EmptyInput)?;

        let mut windows = Vec::new();
        let mut current = String::new();

        for sentence in sentences {
            for piece in split_to_fit(&sentence, self.max_input_chars) {
                let needed = if current.is_empty() {
                    piece.chars().count()
                } else {
                    current.chars().count() + 1 + piece.chars().count()
                };
                if needed > self.max_input_chars && !current.is_empty() {
                    windows.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push_str(PASSAGE_SEPARATOR);
                }
                current.push_str(&piece);
            }
        }
        if !current.is_empty() {
            windows.push(current);
        }

        Ok(windows)
    }
}

#[async_trait]
impl<S: Summarizer> Summarizer for IterativeSummarizer<S> {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let mut current = text.trim().to_string();
        if current.is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        for round in 1..=self.max_rounds {
            let windows = self.windows(&current)?;
            let mut summaries = Vec::with_capacity(windows.len());
            for window in &windows {
                summaries.push(self.inner.summarize(window).await?);
            }
            let combined = summaries.join(PASSAGE_SEPARATOR).trim().to_string();

            debug!(
                "Summary round {}: {} windows, {} -> {} chars",
                round,
                windows.len(),
                current.chars().count(),
                combined.chars().count()
            );

            if combined.is_empty() {
                return Err(SummarizeError::InvalidResponse(
                    "summarizer returned empty text".to_string(),
                ));
            }
            if combined.chars().count() <= self.max_input_chars {
                return Ok(combined);
            }
            if combined.chars().count() >= current.chars().count() {
                warn!("Summarizer made no progress in round {}", round);
                current = combined;
                break;
            }
            current = combined;
        }

        Ok(truncate_content(&current, self.max_input_chars))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Break an over-long sentence on word boundaries (or inside a word that is
/// itself too long)
fn split_to_fit(sentence: &str, max_chars: usize) -> Vec<String> {
    if sentence.chars().count() <= max_chars {
        return vec![sentence.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in sentence.split_whitespace() {
        let word_chars: Vec<char> = word.chars().collect();
        for part in word_chars.chunks(max_chars) {
            let part: String = part.iter().collect();
            let needed = current.chars().count() + usize::from(!current.is_empty()) + part.chars().count();
            if needed > max_chars && !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&part);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
