// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for the HTTP tests

use axum::{
    body::Body,
    http::{Method, Request, Response},
    Router,
};
use docqa_node::api::{create_app, AppState, QaService, QaServiceConfig, StreamConfig};
use docqa_node::content::{ContentFetchConfig, ContentFetcher, DocumentExtractor};
use docqa_node::embeddings::HashingEmbedder;
use docqa_node::monitoring::NodeMetrics;
use docqa_node::rag::{RetrievalConfig, RetrievalEngine};
use docqa_node::session::{SessionStore, SessionStoreConfig};
use docqa_node::summarize::LeadSummarizer;
use serde_json::Value;
use std::sync::Arc;

/// 40 words, four sentences
pub const DOC: &str = "The cat sat on the warm mat near the door. \
    The dog ran across the green field after the ball. \
    The bird flew over the tall trees at dawn. \
    Fish swim in the cold river all year long.";

pub fn service_with(stream: StreamConfig, extractor: DocumentExtractor) -> QaService {
    let engine = RetrievalEngine::new(
        Arc::new(HashingEmbedder::default()),
        RetrievalConfig::default(),
    );
    let sessions = SessionStore::new(SessionStoreConfig {
        idle_ttl: None,
        ..SessionStoreConfig::default()
    });
    QaService::new(
        Arc::new(sessions),
        Arc::new(engine),
        Arc::new(LeadSummarizer::new(1)),
        ContentFetcher::new(ContentFetchConfig::default()).expect("fetcher"),
        NodeMetrics::new().expect("metrics"),
    )
    .with_extractor(extractor)
    .with_config(QaServiceConfig {
        min_words: 20,
        stream,
    })
}

pub fn test_state() -> Arc<AppState> {
    Arc::new(AppState::new(Arc::new(service_with(
        StreamConfig::default(),
        DocumentExtractor::default(),
    ))))
}

pub fn test_app() -> (Router, Arc<AppState>) {
    let state = test_state();
    (create_app(Arc::clone(&state)), state)
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("x-session-id", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
