// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::rag::vector_store::VectorStore;

/// Whether a session can answer questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No document has been ingested successfully
    Empty,
    /// A vector store is installed
    Ready,
}

#[derive(Debug, Default)]
struct SessionState {
    raw_text: String,
    store: Option<Arc<VectorStore>>,
    generation: u64,
}

/// One client's document and its index
///
/// The vector store is held behind an `Arc` and replaced wholesale by
/// [`Session::install`]. Readers clone the `Arc` and drop the lock before
/// doing any work, so a query never observes a half-built store and never
/// blocks an ingest for longer than the swap.
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: Instant,
    started_at: DateTime<Utc>,
    /// Milliseconds since `created_at` at last use
    last_activity_ms: AtomicU64,
    state: RwLock<SessionState>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Instant::now(),
            started_at: Utc::now(),
            last_activity_ms: AtomicU64::new(0),
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Wall-clock creation time, for reporting
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Record activity now
    pub fn touch(&self) {
        let elapsed = self.created_at.elapsed().as_millis() as u64;
        self.last_activity_ms.fetch_max(elapsed, Ordering::Relaxed);
    }

    /// Time since the session was last touched
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.created_at.elapsed().saturating_sub(last)
    }

    pub async fn status(&self) -> SessionStatus {
        if self.state.read().await.store.is_some() {
            SessionStatus::Ready
        } else {
            SessionStatus::Empty
        }
    }

    /// Current vector store, if any
    pub async fn snapshot(&self) -> Option<Arc<VectorStore>> {
        self.state.read().await.store.clone()
    }

    /// Source text of the installed store (empty before the first ingest)
    pub async fn raw_text(&self) -> String {
        self.state.read().await.raw_text.clone()
    }

    /// Number of successful ingests so far
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Replace the text and vector store in one assignment
    ///
    /// Returns the new generation number.
    pub async fn install(&self, raw_text: String, store: Arc<VectorStore>) -> u64 {
        let mut state = self.state.write().await;
        state.raw_text = raw_text;
        state.store = Some(store);
        state.generation += 1;
        let generation = state.generation;
        drop(state);

        self.touch();
        generation
    }

    /// Drop the installed store, returning to `Empty`
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = SessionState::default();
    }
}
