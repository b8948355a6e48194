// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Source text acquisition
//!
//! Turns what a user submits into plain text for the retrieval engine:
//!
//! ```text
//! URL  → ContentFetcher → HTML → extract_main_content → text
//!              ↓
//!        ContentCache (30min TTL)
//!
//! file → DocumentExtractor → text | OcrEngine → text
//! ```
//!
//! Both paths reject results under the minimum word count.

pub mod cache;
pub mod config;
pub mod document;
pub mod extractor;
pub mod fetcher;
pub mod ocr;

pub use cache::{ContentCache, ContentCacheStats};
pub use config::{ContentFetchConfig, DEFAULT_MIN_WORDS};
pub use document::{DocumentExtractor, DocumentKind, ExtractError, ExtractedDocument};
pub use extractor::extract_main_content;
pub use fetcher::{ContentFetcher, FetchError, PageContent};
pub use ocr::{OcrEngine, VlmOcrEngine};
