// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod service;
pub mod streaming;
pub mod websocket;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{
    AskRequest, AskResponse, ContentRequest, ContentResponse, HealthResponse, PassageInfo,
    SessionInfoResponse,
};
pub use http_server::{create_app, start_server, AppState, SESSION_HEADER};
pub use service::{ContentSource, QaService, QaServiceConfig};
pub use streaming::{
    spawn_answer_stream, AnswerStream, EndReason, StreamConfig, StreamEvent, StreamOutcome,
};
