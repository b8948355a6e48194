// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Extractive answers assembled from ranked passages

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::vector_store::RankedChunk;

/// Separator placed between passages in an answer
pub const PASSAGE_SEPARATOR: &str = " ";

/// Granularity of streamed answer fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentMode {
    /// One passage per fragment
    #[default]
    Sentence,
    /// One word (with its trailing whitespace) per fragment
    Word,
}

impl FromStr for FragmentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sentence" => Ok(FragmentMode::Sentence),
            "word" => Ok(FragmentMode::Word),
            other => Err(format!("unknown fragment mode '{}'", other)),
        }
    }
}

/// Passages retrieved for one question, best first
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub passages: Vec<RankedChunk>,
}

impl Answer {
    pub fn new(passages: Vec<RankedChunk>) -> Self {
        Self { passages }
    }

    /// Passages joined in rank order
    pub fn text(&self) -> String {
        self.passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR)
    }

    /// Split the answer into stream fragments
    ///
    /// Concatenating the fragments always yields exactly [`Answer::text`].
    pub fn fragments(&self, mode: FragmentMode) -> Vec<String> {
        match mode {
            FragmentMode::Sentence => self
                .passages
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    if i == 0 {
                        p.text.clone()
                    } else {
                        format!("{}{}", PASSAGE_SEPARATOR, p.text)
                    }
                })
                .collect(),
            FragmentMode::Word => word_pieces(&self.text()),
        }
    }
}

/// Split into runs of non-whitespace, each carrying the whitespace after it
fn word_pieces(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_space = false;

    for (offset, c) in text.char_indices() {
        if c.is_whitespace() {
            in_space = true;
        } else if in_space {
            pieces.push(text[start..offset].to_string());
            start = offset;
            in_space = false;
        }
    }
    if start < text.len() {
        pieces.push(text[start..].to_string());
    }

    pieces
}
