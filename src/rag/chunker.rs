// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sentence chunker
//!
//! Splits raw document text into sentence-level retrieval units. Boundaries
//! come from the Unicode sentence-boundary rules (UAX #29); a second pass
//! re-joins segments that were cut after a known abbreviation or an initial
//! ("Dr. Smith", "J. R. R. Tolkien"), which UAX #29 alone splits.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

/// Abbreviations that end with a period but almost never end a sentence
const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "mt.", "vs.", "e.g.", "i.e.",
    "cf.", "fig.", "no.", "vol.", "approx.", "dept.", "inc.", "ltd.", "co.", "corp.", "gen.",
    "gov.", "sen.", "rep.", "rev.", "capt.", "lt.", "col.", "sgt.", "jan.", "feb.", "mar.",
    "apr.", "jun.", "jul.", "aug.", "sep.", "sept.", "oct.", "nov.", "dec.", "u.s.", "u.k.",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// Text produced no non-empty segment
    #[error("Text contains no sentences to index")]
    EmptyInput,
}

/// Sentence-boundary chunker with abbreviation awareness
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    abbreviations: HashSet<String>,
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceChunker {
    pub fn new() -> Self {
        Self {
            abbreviations: DEFAULT_ABBREVIATIONS
                .iter()
                .map(|a| a.to_string())
                .collect(),
        }
    }

    /// Adds extra abbreviations (case-insensitive, trailing period required)
    pub fn with_abbreviations<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for abbr in extra {
            let abbr = abbr.as_ref().trim().to_lowercase();
            if abbr.ends_with('.') {
                self.abbreviations.insert(abbr);
            }
        }
        self
    }

    /// Split text into trimmed, non-empty sentences in source order
    ///
    /// # Errors
    /// `ChunkError::EmptyInput` when no non-empty sentence remains.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkError> {
        let mut chunks = Vec::new();
        let mut pending = String::new();

        // Line breaks inside a sentence are layout, not boundaries
        let flattened = normalize(text);

        for segment in flattened.split_sentence_bounds() {
            pending.push_str(segment);

            if self.ends_with_abbreviation(&pending) {
                continue;
            }

            let sentence = normalize(&pending);
            if !sentence.is_empty() {
                chunks.push(sentence);
            }
            pending.clear();
        }

        let tail = normalize(&pending);
        if !tail.is_empty() {
            chunks.push(tail);
        }

        if chunks.is_empty() {
            return Err(ChunkError::EmptyInput);
        }

        Ok(chunks)
    }

    fn ends_with_abbreviation(&self, segment: &str) -> bool {
        let last_word = match segment.split_whitespace().last() {
            Some(word) => word.trim_start_matches(|c: char| c == '(' || c == '"' || c == '\''),
            None => return false,
        };

        if !last_word.ends_with('.') {
            return false;
        }

        self.abbreviations.contains(&last_word.to_lowercase()) || initial_pattern().is_match(last_word)
    }
}

/// Single capital letter followed by a period, e.g. the "J." in "J. Smith"
fn initial_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\p{Lu}\.$").expect("static regex is valid"))
}

/// Collapse internal whitespace runs (line breaks from PDFs and HTML) and trim
fn normalize(segment: &str) -> String {
    segment.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-delimited word count, used for minimum-content checks
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
