// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end retrieval scenarios over the hashing embedder

use docqa_node::embeddings::HashingEmbedder;
use docqa_node::rag::{
    ErrorKind, FragmentMode, RetrievalConfig, RetrievalEngine, Stage, VectorStore,
};
use docqa_node::session::{Session, SessionStatus};
use std::sync::Arc;

const ANIMALS: &str = "The cat sat. The dog ran. The bird flew.";

fn engine() -> RetrievalEngine {
    RetrievalEngine::new(
        Arc::new(HashingEmbedder::default()),
        RetrievalConfig::default(),
    )
}

#[tokio::test]
async fn test_which_animal_sat() {
    let engine = engine();
    let session = Session::new("scenario-1");
    engine.ingest(&session, ANIMALS).await.unwrap();

    let answer = engine
        .query(&session, "Which animal sat?", Some(1))
        .await
        .unwrap();

    assert_eq!(answer.passages.len(), 1);
    assert_eq!(answer.text(), "The cat sat.");
    assert_eq!(answer.passages[0].chunk_index, 0);
}

#[tokio::test]
async fn test_fresh_session_not_ready() {
    let session = Session::new("scenario-2");
    let err = engine()
        .query(&session, "Which animal sat?", None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotReady);
    assert_eq!(session.status().await, SessionStatus::Empty);
}

#[tokio::test]
async fn test_k_larger_than_document() {
    let engine = engine();
    let session = Session::new("scenario-3");
    engine.ingest(&session, ANIMALS).await.unwrap();

    let answer = engine
        .query(&session, "Which animal flew?", Some(5))
        .await
        .unwrap();

    assert_eq!(answer.passages.len(), 3);
    for pair in answer.passages.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[tokio::test]
async fn test_fragments_concatenate_to_answer() {
    let engine = engine();
    let session = Session::new("scenario-4");
    engine.ingest(&session, ANIMALS).await.unwrap();

    let answer = engine.query(&session, "animal", Some(3)).await.unwrap();
    for mode in [FragmentMode::Sentence, FragmentMode::Word] {
        assert_eq!(answer.fragments(mode).concat(), answer.text());
    }
    assert_eq!(answer.fragments(FragmentMode::Sentence).len(), 3);
}

#[tokio::test]
async fn test_query_is_idempotent() {
    let engine = engine();
    let session = Session::new("idempotent");
    engine.ingest(&session, ANIMALS).await.unwrap();

    let first = engine.query(&session, "Did the dog run?", Some(2)).await.unwrap();
    let second = engine.query(&session, "Did the dog run?", Some(2)).await.unwrap();
    assert_eq!(first, second);

    engine.ingest(&session, ANIMALS).await.unwrap();
    let after_reingest = engine.query(&session, "Did the dog run?", Some(2)).await.unwrap();
    assert_eq!(first, after_reingest);
}

#[tokio::test]
async fn test_ties_resolve_by_position() {
    let engine = engine();
    let session = Session::new("ties");
    engine
        .ingest(&session, "The cat sat. The cat sat. The dog ran.")
        .await
        .unwrap();

    let answer = engine.query(&session, "cat sat", Some(2)).await.unwrap();
    let indices: Vec<usize> = answer.passages.iter().map(|p| p.chunk_index).collect();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(answer.passages[0].distance, answer.passages[1].distance);
}

#[test]
fn test_store_ties_with_identical_vectors() {
    let store = VectorStore::new(
        vec!["a".into(), "b".into(), "c".into()],
        vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]],
    )
    .unwrap();
    let ranked = store.search(&[0.0, 1.0], 3).unwrap();
    let order: Vec<&str> = ranked.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_k_bound() {
    let engine = engine();
    let session = Session::new("k-bound");
    engine.ingest(&session, ANIMALS).await.unwrap();

    for k in 1..=5 {
        let answer = engine.query(&session, "bird", Some(k)).await.unwrap();
        assert_eq!(answer.passages.len(), k.min(3));
    }

    let err = engine.query(&session, "bird", Some(0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[tokio::test]
async fn test_empty_document_rejected() {
    let engine = engine();
    let session = Session::new("empty");

    for raw in ["", "   \n\t "] {
        let err = engine.ingest(&session, raw).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Content);
        assert_eq!(err.stage(), Some(Stage::Validation));
    }
    assert_eq!(session.status().await, SessionStatus::Empty);
}

#[tokio::test]
async fn test_blank_question_rejected() {
    let engine = engine();
    let session = Session::new("blank-question");
    engine.ingest(&session, ANIMALS).await.unwrap();

    let err = engine.query(&session, "  ", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[tokio::test]
async fn test_default_k_is_three() {
    let engine = engine();
    let session = Session::new("default-k");
    engine
        .ingest(&session, "One is here. Two is here. Three is here. Four is here.")
        .await
        .unwrap();

    let answer = engine.query(&session, "here", None).await.unwrap();
    assert_eq!(answer.passages.len(), 3);
}
