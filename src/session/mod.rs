// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Per-client sessions: one document and one vector store per token

pub mod session;
pub mod store;

use thiserror::Error;

pub use session::{Session, SessionStatus};
pub use store::{validate_token, SessionStore, SessionStoreConfig, MAX_TOKEN_LEN};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Maximum number of sessions reached ({max})")]
    CapacityExceeded { max: usize },
}
