// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use super::helpers::{service_with, DOC};
use docqa_node::api::{create_app, AppState, ContentSource, StreamConfig};
use docqa_node::content::DocumentExtractor;
use docqa_node::rag::FragmentMode;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Serve the app on an ephemeral port with `token` already holding DOC
async fn start(stream: StreamConfig, token: &str) -> String {
    let service = Arc::new(service_with(stream, DocumentExtractor::default()));
    service
        .submit_content(token, ContentSource::Text(DOC.to_string()))
        .await
        .unwrap();

    let app = create_app(Arc::new(AppState::new(service)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{}/v1/ws", addr)
}

async fn send(client: &mut Client, message: Value) {
    client.send(Message::Text(message.to_string())).await.unwrap();
}

async fn recv(client: &mut Client) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("server reply in time")
            .expect("socket open")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Collect messages up to and including `stream_end`
async fn until_end(client: &mut Client) -> Vec<Value> {
    let mut messages = Vec::new();
    loop {
        let message = recv(client).await;
        let done = message["type"] == "stream_end";
        messages.push(message);
        if done {
            return messages;
        }
    }
}

#[tokio::test]
async fn test_ask_streams_chunks_then_end() {
    let url = start(StreamConfig::default(), "ws-reader").await;
    let (mut client, _) = connect_async(format!("{}?sessionId=ws-reader", url))
        .await
        .unwrap();

    send(
        &mut client,
        json!({ "type": "ask", "question": "Where do fish swim?", "k": 2 }),
    )
    .await;
    let messages = until_end(&mut client).await;

    let (end, chunks) = messages.split_last().unwrap();
    assert_eq!(end["reason"], "complete");
    assert_eq!(end["fragments"], 2);
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|m| m["type"] == "stream_chunk"));
    assert_eq!(
        chunks[0]["content"],
        "Fish swim in the cold river all year long."
    );
}

#[tokio::test]
async fn test_stream_cancel() {
    let slow = StreamConfig {
        mode: FragmentMode::Word,
        fragment_delay: Duration::from_millis(200),
        ..StreamConfig::default()
    };
    let url = start(slow, "ws-cancel").await;
    let (mut client, _) = connect_async(format!("{}?sessionId=ws-cancel", url))
        .await
        .unwrap();

    send(
        &mut client,
        json!({ "type": "ask", "question": "animals", "k": 3 }),
    )
    .await;
    let first = recv(&mut client).await;
    assert_eq!(first["type"], "stream_chunk");

    send(&mut client, json!({ "type": "stream_cancel" })).await;
    let messages = until_end(&mut client).await;
    let end = messages.last().unwrap();
    assert_eq!(end["reason"], "cancelled");
    // 3 passages hold far more than a handful of words
    assert!(end["fragments"].as_u64().unwrap() < 10);
}

#[tokio::test]
async fn test_not_ready_session_over_websocket() {
    let url = start(StreamConfig::default(), "ws-ready").await;
    let (mut client, _) = connect_async(url).await.unwrap();

    send(
        &mut client,
        json!({ "type": "ask", "question": "Anything?", "sessionId": "ws-empty" }),
    )
    .await;
    let messages = until_end(&mut client).await;

    assert_eq!(messages[0]["type"], "error");
    assert_eq!(messages[0]["errorType"], "not_ready");
    assert_eq!(messages.last().unwrap()["reason"], "error");
}

#[tokio::test]
async fn test_ask_without_session_and_bad_messages() {
    let url = start(StreamConfig::default(), "ws-misc").await;
    let (mut client, _) = connect_async(url).await.unwrap();

    send(&mut client, json!({ "type": "ask", "question": "Who sat?" })).await;
    let reply = recv(&mut client).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["errorType"], "invalid_request");

    send(&mut client, json!({ "type": "shout" })).await;
    let reply = recv(&mut client).await;
    assert_eq!(reply["errorType"], "invalid_request");

    send(&mut client, json!({ "type": "ping" })).await;
    assert_eq!(recv(&mut client).await["type"], "pong");
}
