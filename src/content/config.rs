// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for web page fetching and text extraction

use std::env;

/// Browser-like User-Agent; some sites refuse obvious bots
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36";

/// Pages with fewer words than this are treated as having no content
pub const DEFAULT_MIN_WORDS: usize = 20;

#[derive(Debug, Clone)]
pub struct ContentFetchConfig {
    /// Timeout per page fetch in seconds (default: 15)
    pub timeout_secs: u64,
    /// Maximum characters kept from one page (default: 50000)
    pub max_chars: usize,
    /// Minimum words for a page to count as content (default: 20)
    pub min_words: usize,
    /// Redirects followed before giving up (default: 5)
    pub max_redirects: usize,
    /// Cache TTL in seconds (default: 1800 = 30 minutes)
    pub cache_ttl_secs: u64,
    /// Maximum cache entries (default: 500)
    pub max_cache_entries: usize,
    pub user_agent: String,
}

impl ContentFetchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_secs: env::var("CONTENT_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            max_chars: env::var("CONTENT_FETCH_MAX_CHARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_chars),
            min_words: env::var("MIN_CONTENT_WORDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_words),
            max_redirects: env::var("CONTENT_FETCH_MAX_REDIRECTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_redirects),
            cache_ttl_secs: env::var("CONTENT_FETCH_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_ttl_secs),
            max_cache_entries: env::var("CONTENT_FETCH_MAX_CACHE_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_cache_entries),
            user_agent: env::var("CONTENT_FETCH_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be at least 1".to_string());
        }
        if self.max_chars < 100 {
            return Err("max_chars must be at least 100".to_string());
        }
        if self.max_cache_entries == 0 {
            return Err("max_cache_entries must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for ContentFetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_chars: 50_000,
            min_words: DEFAULT_MIN_WORDS,
            max_redirects: 5,
            cache_ttl_secs: 1800,
            max_cache_entries: 500,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
