// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use docqa_node::embeddings::HashingEmbedder;
use docqa_node::rag::{ErrorKind, RetrievalConfig, RetrievalEngine};
use docqa_node::session::{SessionStore, SessionStoreConfig};
use std::sync::Arc;

fn engine() -> RetrievalEngine {
    RetrievalEngine::new(
        Arc::new(HashingEmbedder::default()),
        RetrievalConfig::default(),
    )
}

#[tokio::test]
async fn test_sessions_answer_from_their_own_document() {
    let engine = engine();
    let store = SessionStore::default();

    let alice = store.get_or_create("alice").await.unwrap();
    let bob = store.get_or_create("bob").await.unwrap();

    engine
        .ingest(&alice, "Rust has ownership. Rust has borrowing.")
        .await
        .unwrap();
    engine
        .ingest(&bob, "Tea grows in hills. Coffee grows in valleys.")
        .await
        .unwrap();

    let answer = engine.query(&alice, "Where does tea grow?", Some(5)).await.unwrap();
    assert_eq!(answer.passages.len(), 2);
    assert!(answer.passages.iter().all(|p| p.text.starts_with("Rust")));

    let answer = engine.query(&bob, "ownership", Some(5)).await.unwrap();
    assert!(answer.passages.iter().all(|p| !p.text.contains("Rust")));
}

#[tokio::test]
async fn test_removed_session_starts_over() {
    let engine = engine();
    let store = SessionStore::default();

    let session = store.get_or_create("carol").await.unwrap();
    engine.ingest(&session, "The lake is cold.").await.unwrap();
    assert!(store.remove("carol").await);

    let fresh = store.get_or_create("carol").await.unwrap();
    let err = engine.query(&fresh, "lake", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotReady);

    // A reader holding the old session keeps working
    let answer = engine.query(&session, "lake", None).await.unwrap();
    assert_eq!(answer.text(), "The lake is cold.");
}

#[tokio::test]
async fn test_same_token_same_session() {
    let store = SessionStore::new(SessionStoreConfig {
        max_sessions: 2,
        ..SessionStoreConfig::default()
    });
    let first = store.get_or_create("dave").await.unwrap();
    let second = store.get_or_create("dave").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.len().await, 1);
}
