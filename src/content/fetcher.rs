// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Web page fetching
//!
//! Downloads a page, extracts its readable text and rejects pages that do
//! not carry enough words to answer questions about.

use reqwest::Client;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::{Host, Url};

use super::cache::{ContentCache, ContentCacheStats};
use super::config::ContentFetchConfig;
use super::extractor::{extract_main_content, extract_title};
use crate::rag::word_count;

/// Fetched page content
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    pub url: String,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("Timeout fetching: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status} for: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("No substantial content at {url}: {words} words, at least {min_words} required")]
    InsufficientContent {
        url: String,
        words: usize,
        min_words: usize,
    },

    #[error("Unsafe URL blocked: {0}")]
    UnsafeUrl(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Content fetcher with TTL caching
#[derive(Clone)]
pub struct ContentFetcher {
    client: Client,
    cache: Arc<ContentCache>,
    config: ContentFetchConfig,
}

impl ContentFetcher {
    pub fn new(config: ContentFetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        let cache = Arc::new(ContentCache::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.max_cache_entries,
        ));

        Ok(Self {
            client,
            cache,
            config,
        })
    }

    /// Fetch `url` and return its readable text
    pub async fn fetch_content(&self, url: &str) -> Result<PageContent, FetchError> {
        let url = url.trim();
        if !Self::is_safe_url(url) {
            return Err(FetchError::UnsafeUrl(url.to_string()));
        }

        if let Some(cached) = self.cache.get(url) {
            debug!("Content cache hit for: {}", url);
            return Ok(cached);
        }

        debug!("Fetching content from: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Http(e.to_string())
            }
        })?;

        let page = self.page_from_html(url, &html)?;
        self.cache.insert(page.clone());

        info!("Fetched {} chars from: {}", page.text.len(), url);
        Ok(page)
    }

    /// Extract and validate text from an already downloaded page
    pub fn page_from_html(&self, url: &str, html: &str) -> Result<PageContent, FetchError> {
        let text = extract_main_content(html, self.config.min_words, self.config.max_chars);

        let words = word_count(&text);
        if words < self.config.min_words {
            return Err(FetchError::InsufficientContent {
                url: url.to_string(),
                words,
                min_words: self.config.min_words,
            });
        }

        let title = extract_title(html).unwrap_or_else(|| url.to_string());
        Ok(PageContent {
            url: url.to_string(),
            title,
            text,
        })
    }

    /// Only http(s) URLs to public hosts may be fetched
    pub fn is_safe_url(url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };

        if !["http", "https"].contains(&parsed.scheme()) {
            return false;
        }

        match parsed.host() {
            Some(Host::Domain(domain)) => {
                let domain = domain.to_lowercase();
                domain != "localhost" && !domain.ends_with(".localhost")
            }
            Some(Host::Ipv4(ip)) => is_public_ip(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => is_public_ip(IpAddr::V6(ip)),
            None => false,
        }
    }

    pub fn cache_stats(&self) -> ContentCacheStats {
        self.cache.stats()
    }

    pub fn config(&self) -> &ContentFetchConfig {
        &self.config
    }
}

fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation())
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link-local
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| !is_public_ip(IpAddr::V4(v4))))
        }
    }
}
