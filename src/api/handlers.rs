// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::rag::RankedChunk;
use crate::session::SessionStatus;

/// Body of `POST /v1/content`; exactly one of `text` or `url`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub session_id: String,
    /// `None` when summarization failed; the document is still indexed
    pub summary: Option<String>,
    pub chunk_count: usize,
    pub word_count: usize,
    /// "text", "url" or "document"
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PassageInfo {
    pub chunk_index: usize,
    pub distance: f32,
    pub text: String,
}

impl From<RankedChunk> for PassageInfo {
    fn from(chunk: RankedChunk) -> Self {
        Self {
            chunk_index: chunk.chunk_index,
            distance: chunk.distance,
            text: chunk.text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    pub session_id: String,
    pub answer: String,
    pub passages: Vec<PassageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfoResponse {
    pub session_id: String,
    pub status: SessionStatus,
    /// Successful ingests so far
    pub generation: u64,
    pub chunk_count: usize,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub idle_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions: usize,
    pub embedding_model: String,
    pub summarizer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
}
