// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use super::helpers::{body_json, body_text, json_request, test_app, DOC};
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;

/// Split an SSE body into (event name, data) pairs, skipping keep-alive comments
fn parse_sse(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut name = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("event:") {
                    name = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    data = Some(serde_json::from_str(rest.trim()).unwrap());
                }
            }
            Some((name?, data?))
        })
        .collect()
}

#[tokio::test]
async fn test_sse_stream_matches_ask_once() {
    let (app, _) = test_app();
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/v1/content",
            Some("streamer"),
            json!({ "text": DOC }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let question = json!({ "question": "Which animal sat on the mat?", "k": 2 });
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/v1/ask",
            Some("streamer"),
            question.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let events = parse_sse(&body_text(response).await);
    let (last_name, last) = events.last().expect("at least one event");
    assert_eq!(last_name, "end");
    assert_eq!(last["reason"], "complete");

    let fragments: Vec<&Value> = events
        .iter()
        .filter(|(name, _)| name == "fragment")
        .map(|(_, data)| data)
        .collect();
    assert_eq!(last["fragments"], fragments.len());
    for (expected, fragment) in fragments.iter().enumerate() {
        assert_eq!(fragment["index"], expected);
    }
    let streamed: String = fragments
        .iter()
        .map(|f| f["text"].as_str().unwrap())
        .collect();

    let once = app
        .oneshot(json_request(
            Method::POST,
            "/v1/ask-once",
            Some("streamer"),
            question,
        ))
        .await
        .unwrap();
    let once = body_json(once).await;
    assert_eq!(streamed, once["answer"].as_str().unwrap());
    assert!(streamed.starts_with("The cat sat on the warm mat"));
}

#[tokio::test]
async fn test_sse_reports_not_ready_in_band() {
    let (app, state) = test_app();
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/v1/ask",
            Some("nobody-home"),
            json!({ "question": "Anything?" }),
        ))
        .await
        .unwrap();

    // The stream itself is the response; failures arrive as events
    assert_eq!(response.status(), StatusCode::OK);
    let events = parse_sse(&body_text(response).await);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].0, "error");
    assert_eq!(events[0].1["kind"], "not_ready");
    assert_eq!(events[1].0, "end");
    assert_eq!(events[1].1["reason"], "error");
    assert_eq!(events[1].1["fragments"], 0);

    // Asking never creates a session
    assert!(state.service.sessions().is_empty().await);
}
