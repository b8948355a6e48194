// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use docqa_node::embeddings::HashingEmbedder;
use docqa_node::rag::{RetrievalConfig, RetrievalEngine};
use docqa_node::session::SessionStore;
use std::sync::Arc;

fn engine() -> Arc<RetrievalEngine> {
    Arc::new(RetrievalEngine::new(
        Arc::new(HashingEmbedder::default()),
        RetrievalConfig::default(),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_sessions_in_parallel() {
    let engine = engine();
    let store = Arc::new(SessionStore::default());

    let mut handles = Vec::new();
    for i in 0..32 {
        let engine = Arc::clone(&engine);
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let token = format!("session-{}", i);
            let session = store.get_or_create(&token).await.unwrap();
            let doc = format!(
                "Document {} talks about topic{}. It also mentions filler words.",
                i, i
            );
            engine.ingest(&session, &doc).await.unwrap();
            let answer = engine
                .query(&session, &format!("topic{}", i), Some(1))
                .await
                .unwrap();
            (i, answer.text())
        }));
    }

    for handle in handles {
        let (i, text) = handle.await.unwrap();
        assert_eq!(text, format!("Document {} talks about topic{}.", i, i));
    }
    assert_eq!(store.len().await, 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingests_never_mix_documents() {
    let engine = engine();
    let store = SessionStore::default();
    let session = store.get_or_create("shared").await.unwrap();

    let docs: Vec<String> = (0..8)
        .map(|i| {
            (0..5)
                .map(|j| format!("Version {} sentence {}.", i, j))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    let mut handles = Vec::new();
    for doc in docs.clone() {
        let engine = Arc::clone(&engine);
        let session = Arc::clone(&session);
        handles.push(tokio::spawn(async move {
            engine.ingest(&session, &doc).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(session.generation().await, 8);
    let installed = session.raw_text().await;
    assert!(docs.contains(&installed));

    let store = session.snapshot().await.unwrap();
    let prefix = &installed[..installed.find(" sentence").unwrap()];
    assert_eq!(store.count(), 5);
    assert!(store.chunks().iter().all(|chunk| chunk.starts_with(prefix)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queries_during_reingest_see_a_whole_store() {
    let engine = engine();
    let store = SessionStore::default();
    let session = store.get_or_create("reader").await.unwrap();
    engine
        .ingest(&session, "Alpha one. Alpha two. Alpha three.")
        .await
        .unwrap();

    let writer = {
        let engine = Arc::clone(&engine);
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            for _ in 0..20 {
                engine
                    .ingest(&session, "Beta one. Beta two. Beta three.")
                    .await
                    .unwrap();
                engine
                    .ingest(&session, "Alpha one. Alpha two. Alpha three.")
                    .await
                    .unwrap();
            }
        })
    };

    for _ in 0..50 {
        let answer = engine.query(&session, "one", Some(3)).await.unwrap();
        let alpha = answer.passages.iter().filter(|p| p.text.starts_with("Alpha")).count();
        assert!(alpha == 0 || alpha == 3, "mixed store observed");
    }
    writer.await.unwrap();
}
