// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Abstractive summaries from an OpenAI-compatible LLM endpoint
//!
//! Posts one chat-completions request per input. Meant to be wrapped in an
//! [`IterativeSummarizer`](super::IterativeSummarizer) so inputs stay within
//! the model's context.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{SummarizeError, Summarizer};

const SUMMARY_PROMPT: &str =
    "Summarize the following text in a few sentences. Return only the summary.";

#[derive(Debug, Clone)]
pub struct ChatSummarizerConfig {
    /// Base URL; `/v1/chat/completions` is appended
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ChatSummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8081".to_string(),
            model: "flan-t5-large".to_string(),
            max_tokens: 300,
            timeout_secs: 60,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

pub struct ChatSummarizer {
    client: Client,
    config: ChatSummarizerConfig,
    url: String,
}

impl ChatSummarizer {
    pub fn new(config: ChatSummarizerConfig) -> Result<Self, SummarizeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SummarizeError::Request(e.to_string()))?;
        let url = format!(
            "{}/v1/chat/completions",
            config.endpoint.trim_end_matches('/')
        );

        Ok(Self {
            client,
            config,
            url,
        })
    }

    fn build_request<'a>(&'a self, text: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SUMMARY_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
        }
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        let response = self
            .client
            .post(&self.url)
            .json(&self.build_request(text))
            .send()
            .await
            .map_err(|e| SummarizeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SummarizeError::InvalidResponse("no choices returned".to_string()))
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}
