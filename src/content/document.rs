// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Uploaded document → plain text
//!
//! Text, Markdown, HTML and the text layer of PDFs are read directly.
//! Anything else (scans, images, PDFs without a text layer) goes to the
//! configured [`OcrEngine`], if any.

use pulldown_cmark::{Event, Parser};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::config::DEFAULT_MIN_WORDS;
use super::extractor::{clean_text, extract_main_content, truncate_content};
use super::ocr::OcrEngine;
use crate::rag::word_count;

/// Maximum upload size (10MB)
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Document is empty")]
    Empty,

    #[error("Document is {size} bytes, maximum is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("Unsupported document: {0}")]
    Unsupported(String),

    #[error("Document has {words} words, at least {min_words} required")]
    InsufficientContent { words: usize, min_words: usize },

    #[error("OCR failed: {0}")]
    Ocr(String),
}

/// Detected document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Markdown,
    Html,
    Pdf,
    /// Image with its format extension (png, jpeg, ...)
    Image(&'static str),
    Unknown,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::PlainText => f.write_str("text"),
            DocumentKind::Markdown => f.write_str("markdown"),
            DocumentKind::Html => f.write_str("html"),
            DocumentKind::Pdf => f.write_str("pdf"),
            DocumentKind::Image(format) => write!(f, "image/{}", format),
            DocumentKind::Unknown => f.write_str("unknown"),
        }
    }
}

impl DocumentKind {
    /// Detect from content first, then from the file extension
    pub fn detect(file_name: &str, bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF-") {
            return DocumentKind::Pdf;
        }
        if let Ok(format) = image::guess_format(bytes) {
            return DocumentKind::Image(format.extensions_str().first().copied().unwrap_or("png"));
        }

        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension.as_deref() {
            Some("txt") | Some("text") | Some("csv") | Some("log") => DocumentKind::PlainText,
            Some("md") | Some("markdown") => DocumentKind::Markdown,
            Some("html") | Some("htm") | Some("xhtml") => DocumentKind::Html,
            Some("pdf") => DocumentKind::Pdf,
            _ if looks_like_html(bytes) => DocumentKind::Html,
            _ if std::str::from_utf8(bytes).is_ok() => DocumentKind::PlainText,
            _ => DocumentKind::Unknown,
        }
    }
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).to_lowercase();
    let head = head.trim_start();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Extracted text and how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub text: String,
    pub kind: DocumentKind,
    pub used_ocr: bool,
}

#[derive(Clone)]
pub struct DocumentExtractor {
    min_words: usize,
    max_chars: usize,
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_WORDS, 200_000)
    }
}

impl DocumentExtractor {
    pub fn new(min_words: usize, max_chars: usize) -> Self {
        Self {
            min_words,
            max_chars,
            ocr: None,
        }
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn has_ocr(&self) -> bool {
        self.ocr.is_some()
    }

    pub async fn extract(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<ExtractedDocument, ExtractError> {
        if bytes.is_empty() {
            return Err(ExtractError::Empty);
        }
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(ExtractError::TooLarge {
                size: bytes.len(),
                max: MAX_DOCUMENT_BYTES,
            });
        }

        let kind = DocumentKind::detect(file_name, bytes);
        debug!("Extracting {} ({}, {} bytes)", file_name, kind, bytes.len());

        let mut text = match kind {
            DocumentKind::Pdf => self.extract_pdf(file_name, bytes).await,
            _ => self.extract_direct(kind, bytes),
        };
        let mut used_ocr = false;

        if text.is_empty() {
            let Some(ocr) = &self.ocr else {
                return Err(ExtractError::Unsupported(format!(
                    "no text layer in {} document '{}' and no OCR engine configured",
                    kind, file_name
                )));
            };
            debug!("No direct text in {}, trying OCR via {}", file_name, ocr.name());
            let recognized = ocr.recognize(bytes, kind).await.map_err(|e| {
                warn!("OCR failed for {}: {}", file_name, e);
                e
            })?;
            text = truncate_content(&clean_text(&recognized), self.max_chars);
            used_ocr = true;
        }

        let words = word_count(&text);
        if words < self.min_words.max(1) {
            return Err(ExtractError::InsufficientContent {
                words,
                min_words: self.min_words.max(1),
            });
        }

        Ok(ExtractedDocument {
            text,
            kind,
            used_ocr,
        })
    }

    /// Text layer of a PDF; empty for scans and unreadable files
    async fn extract_pdf(&self, file_name: &str, bytes: &[u8]) -> String {
        let owned = bytes.to_vec();
        let text = match tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&owned)
        })
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                debug!("No readable text layer in {}: {}", file_name, e);
                String::new()
            }
            Err(e) => {
                warn!("PDF parser aborted on {}: {}", file_name, e);
                String::new()
            }
        };
        truncate_content(&clean_text(&text), self.max_chars)
    }

    fn extract_direct(&self, kind: DocumentKind, bytes: &[u8]) -> String {
        let text = match kind {
            DocumentKind::PlainText => clean_text(&String::from_utf8_lossy(bytes)),
            DocumentKind::Markdown => markdown_text(&String::from_utf8_lossy(bytes)),
            DocumentKind::Html => {
                extract_main_content(&String::from_utf8_lossy(bytes), self.min_words, self.max_chars)
            }
            DocumentKind::Pdf | DocumentKind::Image(_) | DocumentKind::Unknown => String::new(),
        };
        truncate_content(&text, self.max_chars)
    }
}

/// Markdown with markup removed; block boundaries become spaces
fn markdown_text(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    for event in Parser::new(markdown) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak | Event::End(_) => out.push(' '),
            _ => {}
        }
    }
    clean_text(&out)
}
