// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::session::Session;
use super::SessionError;

/// Longest accepted client-supplied session token
pub const MAX_TOKEN_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    pub max_sessions: usize,
    /// Sessions idle longer than this are evicted; `None` keeps them forever
    pub idle_ttl: Option<Duration>,
    pub sweep_interval: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            idle_ttl: Some(Duration::from_secs(3600)),
            sweep_interval: Duration::from_secs(300), // 5 minutes
        }
    }
}

/// Token → session table
///
/// Lookups take the read lock; only creation and removal take the write
/// lock. Work on a session happens after the table lock is released, so
/// different sessions never contend beyond the map access itself.
#[derive(Debug)]
pub struct SessionStore {
    config: SessionStoreConfig,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionStoreConfig::default())
    }
}

impl SessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SessionStoreConfig {
        &self.config
    }

    /// Fresh random token for clients that did not send one
    pub fn generate_token() -> String {
        Session::generate_id()
    }

    /// Existing session for `token`, or a new empty one
    ///
    /// Two concurrent calls with the same unseen token get the same session.
    pub async fn get_or_create(&self, token: &str) -> Result<Arc<Session>, SessionError> {
        validate_token(token)?;

        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(token) {
                session.touch();
                return Ok(Arc::clone(session));
            }
        }

        let mut sessions = self.sessions.write().await;
        // Re-check under the write lock: another task may have won the race
        if let Some(session) = sessions.get(token) {
            session.touch();
            return Ok(Arc::clone(session));
        }

        if sessions.len() >= self.config.max_sessions {
            return Err(SessionError::CapacityExceeded {
                max: self.config.max_sessions,
            });
        }

        let session = Arc::new(Session::new(token));
        sessions.insert(token.to_string(), Arc::clone(&session));
        debug!("Created session {} ({} live)", token, sessions.len());
        Ok(session)
    }

    pub async fn get(&self, token: &str) -> Option<Arc<Session>> {
        let sessions = self.sessions.read().await;
        sessions.get(token).map(|session| {
            session.touch();
            Arc::clone(session)
        })
    }

    /// Tear down a session; in-flight readers keep their snapshot
    pub async fn remove(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(token).is_some();
        if removed {
            debug!("Removed session {}", token);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove sessions idle for longer than the configured TTL
    pub async fn evict_idle(&self) -> usize {
        let Some(ttl) = self.config.idle_ttl else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for() <= ttl);
        before - sessions.len()
    }

    /// Run `evict_idle` every `sweep_interval` until the store is dropped
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        self.config.idle_ttl?;

        let store: Weak<Self> = Arc::downgrade(self);
        let period = self.config.sweep_interval.max(Duration::from_millis(10));

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let evicted = store.evict_idle().await;
                if evicted > 0 {
                    info!(
                        "Evicted {} idle sessions ({} remaining)",
                        evicted,
                        store.len().await
                    );
                }
            }
        }))
    }
}

pub fn validate_token(token: &str) -> Result<(), SessionError> {
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return Err(SessionError::InvalidToken(format!(
            "token must be 1-{} characters",
            MAX_TOKEN_LEN
        )));
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(SessionError::InvalidToken(
            "token may only contain ASCII letters, digits, '-' and '_'".to_string(),
        ));
    }
    Ok(())
}
