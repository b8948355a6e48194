// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! TTL cache of extracted page text
//!
//! Re-submitting the same URL (common when a user retries or several
//! sessions share a link) skips the network round trip.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use url::Url;

use super::fetcher::PageContent;

#[derive(Debug, Clone)]
struct CacheEntry {
    page: PageContent,
    fetched_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCacheStats {
    pub total: usize,
    pub expired: usize,
    pub max: usize,
}

pub struct ContentCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ContentCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Cached page if present and not expired
    pub fn get(&self, url: &str) -> Option<PageContent> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(&Self::cache_key(url))?;

        if entry.fetched_at.elapsed() > self.ttl {
            return None;
        }

        Some(entry.page.clone())
    }

    pub fn insert(&self, page: PageContent) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        let key = Self::cache_key(&page.url);
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, e| e.fetched_at.elapsed() <= ttl);
            if entries.len() >= self.max_entries {
                Self::evict_oldest(&mut entries);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                page,
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn stats(&self) -> ContentCacheStats {
        let Ok(entries) = self.entries.read() else {
            return ContentCacheStats {
                total: 0,
                expired: 0,
                max: self.max_entries,
            };
        };
        ContentCacheStats {
            total: entries.len(),
            expired: entries
                .values()
                .filter(|e| e.fetched_at.elapsed() > self.ttl)
                .count(),
            max: self.max_entries,
        }
    }

    /// Scheme and host are case-insensitive, the path is not; fragments
    /// and a trailing slash never change the fetched page
    fn cache_key(url: &str) -> String {
        match Url::parse(url) {
            Ok(mut parsed) => {
                parsed.set_fragment(None);
                parsed.as_str().trim_end_matches('/').to_string()
            }
            Err(_) => url.trim().trim_end_matches('/').to_string(),
        }
    }

    fn evict_oldest(entries: &mut HashMap<String, CacheEntry>) {
        if let Some(oldest_key) = entries
            .iter()
            .min_by_key(|(_, e)| e.fetched_at)
            .map(|(k, _)| k.clone())
        {
            entries.remove(&oldest_key);
        }
    }
}
