// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! A failed ingest must leave the session exactly as it was

use async_trait::async_trait;
use docqa_node::embeddings::{EmbeddingAdapter, EmbeddingError, HashingEmbedder};
use docqa_node::rag::{ErrorKind, RetrievalConfig, RetrievalEngine, Stage};
use docqa_node::session::{Session, SessionStatus};
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Embedder {}

    #[async_trait]
    impl EmbeddingAdapter for Embedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
        fn dimension(&self) -> usize;
        fn model_name(&self) -> &str;
    }
}

const FIRST: &str = "Paris is the capital of France. Berlin is the capital of Germany.";
const POISONED: &str = "This poison document never makes it. It fails to embed.";

/// Hash embeddings for everything except texts mentioning "poison"
fn selective_embedder() -> MockEmbedder {
    let hasher = HashingEmbedder::new(64);
    let mut mock = MockEmbedder::new();
    mock.expect_dimension().return_const(64usize);
    mock.expect_model_name()
        .return_const("mock-embedder".to_string());
    mock.expect_embed()
        .withf(|texts| texts.iter().any(|t| t.contains("poison")))
        .returning(|_| Err(EmbeddingError::ModelUnavailable("backend down".into())));
    mock.expect_embed()
        .withf(|texts| !texts.iter().any(|t| t.contains("poison")))
        .returning(move |texts| Ok(texts.iter().map(|t| hasher.embed_text(t)).collect()));
    mock
}

#[tokio::test]
async fn test_failed_reingest_keeps_previous_store() {
    let engine = RetrievalEngine::new(Arc::new(selective_embedder()), RetrievalConfig::default());
    let session = Session::new("atomic");

    engine.ingest(&session, FIRST).await.unwrap();
    let before = engine
        .query(&session, "capital of Germany", Some(1))
        .await
        .unwrap();
    let generation = session.generation().await;

    let err = engine.ingest(&session, POISONED).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capability);
    assert_eq!(err.stage(), Some(Stage::Embedding));

    assert_eq!(session.generation().await, generation);
    assert_eq!(session.raw_text().await, FIRST);
    let after = engine
        .query(&session, "capital of Germany", Some(1))
        .await
        .unwrap();
    assert_eq!(before, after);
    assert_eq!(after.text(), "Berlin is the capital of Germany.");
}

#[tokio::test]
async fn test_failed_first_ingest_leaves_session_empty() {
    let engine = RetrievalEngine::new(Arc::new(selective_embedder()), RetrievalConfig::default());
    let session = Session::new("atomic-empty");

    assert!(engine.ingest(&session, POISONED).await.is_err());
    assert_eq!(session.status().await, SessionStatus::Empty);
    assert_eq!(session.generation().await, 0);
}

#[tokio::test]
async fn test_wrong_dimension_rejected() {
    let mut mock = MockEmbedder::new();
    mock.expect_dimension().return_const(8usize);
    mock.expect_model_name().return_const("short".to_string());
    mock.expect_embed()
        .returning(|texts| Ok(texts.iter().map(|_| vec![0.5; 4]).collect()));

    let engine = RetrievalEngine::new(Arc::new(mock), RetrievalConfig::default());
    let session = Session::new("dimension");

    let err = engine.ingest(&session, FIRST).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capability);
    assert_eq!(session.status().await, SessionStatus::Empty);
}

#[tokio::test]
async fn test_non_finite_embedding_rejected() {
    let mut mock = MockEmbedder::new();
    mock.expect_dimension().return_const(2usize);
    mock.expect_model_name().return_const("nan".to_string());
    mock.expect_embed()
        .returning(|texts| Ok(texts.iter().map(|_| vec![f32::NAN, 1.0]).collect()));

    let engine = RetrievalEngine::new(Arc::new(mock), RetrievalConfig::default());
    let err = engine
        .ingest(&Session::new("nan"), FIRST)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capability);
    assert_eq!(err.stage(), Some(Stage::IndexBuild));
}

/// Never answers in time
struct StalledEmbedder;

#[async_trait]
impl EmbeddingAdapter for StalledEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }

    fn dimension(&self) -> usize {
        4
    }

    fn model_name(&self) -> &str {
        "stalled"
    }
}

#[tokio::test]
async fn test_embedding_timeout_is_capability_error() {
    let engine = RetrievalEngine::new(
        Arc::new(StalledEmbedder),
        RetrievalConfig {
            embed_timeout: Duration::from_millis(50),
            ..RetrievalConfig::default()
        },
    );
    let session = Session::new("timeout");

    let err = engine.ingest(&session, FIRST).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capability);
    assert_eq!(session.status().await, SessionStatus::Empty);
}
