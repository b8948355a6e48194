// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR fallback for documents without an extractable text layer
//!
//! [`VlmOcrEngine`] sends the image to a vision-language model sidecar that
//! speaks the OpenAI chat-completions API and asks it to transcribe the text.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::document::{DocumentKind, ExtractError};

/// Text recognition capability used when direct extraction finds nothing
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize text in `bytes` of the detected `kind`
    async fn recognize(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractError>;

    fn name(&self) -> &str;
}

const OCR_PROMPT: &str = "Extract all text from this image. Return only the extracted text, \
     preserving the reading order. If no text is found, respond with an empty string.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: serde_json::Value,
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

/// OCR through a VLM sidecar (`POST {endpoint}/v1/chat/completions`)
pub struct VlmOcrEngine {
    client: Client,
    endpoint: String,
    model_name: String,
}

impl VlmOcrEngine {
    pub fn new(endpoint: &str, model_name: &str, timeout: Duration) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractError::Ocr(e.to_string()))?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!("OCR sidecar configured: endpoint={}, model={}", endpoint, model_name);

        Ok(Self {
            client,
            endpoint,
            model_name: model_name.to_string(),
        })
    }

    fn build_request<'a>(&'a self, bytes: &[u8], format: &str) -> ChatRequest<'a> {
        let data_url = format!("data:image/{};base64,{}", format, BASE64.encode(bytes));
        ChatRequest {
            model: &self.model_name,
            messages: vec![ChatMessage {
                role: "user",
                content: serde_json::json!([
                    {"type": "text", "text": OCR_PROMPT},
                    {"type": "image_url", "image_url": {"url": data_url}}
                ]),
            }],
            max_tokens: 4096,
            temperature: 0.1,
        }
    }
}

#[async_trait]
impl OcrEngine for VlmOcrEngine {
    async fn recognize(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractError> {
        let DocumentKind::Image(format) = kind else {
            return Err(ExtractError::Unsupported(format!(
                "{} cannot read {} documents",
                self.name(),
                kind
            )));
        };

        let start = Instant::now();
        let request = self.build_request(bytes, format);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractError::Ocr(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Ocr(format!("OCR sidecar returned {}", status)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Ocr(e.to_string()))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        debug!(
            "OCR recognized {} chars in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
