// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use super::helpers::{body_json, body_text, json_request, test_app, DOC};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::util::ServiceExt; // for `oneshot`

async fn submit(app: &Router, token: &str) {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/v1/content",
            Some(token),
            json!({ "text": DOC }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["embeddingModel"], "feature-hash-384");
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn test_content_generates_session_token() {
    let (app, _) = test_app();
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/v1/content",
            None,
            json!({ "text": DOC }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let token = response
        .headers()
        .get("x-session-id")
        .expect("session header")
        .to_str()
        .unwrap()
        .to_string();
    let body = body_json(response).await;
    assert_eq!(body["sessionId"], token);
    assert_eq!(body["chunkCount"], 4);
    assert_eq!(body["source"], "text");
    assert_eq!(body["summary"], "The cat sat on the warm mat near the door.");
}

#[tokio::test]
async fn test_short_content_is_content_error() {
    let (app, _) = test_app();
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/v1/content",
            Some("short"),
            json!({ "text": "The cat sat. The dog ran." }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["errorType"], "content_error");
    assert_eq!(body["details"]["stage"], "validation");
}

#[tokio::test]
async fn test_blank_content_is_content_error() {
    let (app, _) = test_app();
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/v1/content",
            Some("blank-text"),
            json!({ "text": "   \n " }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["errorType"], "content_error");
    assert_eq!(body["details"]["stage"], "validation");
}

#[tokio::test]
async fn test_content_needs_exactly_one_source() {
    let (app, _) = test_app();
    for body in [json!({}), json!({ "text": DOC, "url": "https://example.com" })] {
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/v1/content", Some("s"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_private_url_rejected() {
    let (app, _) = test_app();
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/v1/content",
            Some("s"),
            json!({ "url": "http://127.0.0.1:9/page" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errorType"], "validation_error");
    assert_eq!(body["details"]["field"], "url");
}

#[tokio::test]
async fn test_ask_once_before_content() {
    let (app, _) = test_app();
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/v1/ask-once",
            Some("fresh"),
            json!({ "question": "Which animal sat?" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["errorType"], "not_ready");
}

#[tokio::test]
async fn test_ask_once_answers_from_document() {
    let (app, _) = test_app();
    submit(&app, "reader").await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/v1/ask-once",
            Some("reader"),
            json!({ "question": "Where do fish swim?", "k": 1 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-session-id").unwrap(),
        "reader"
    );
    let body = body_json(response).await;
    assert_eq!(body["answer"], "Fish swim in the cold river all year long.");
    assert_eq!(body["passages"][0]["chunkIndex"], 3);
}

#[tokio::test]
async fn test_blank_question_rejected() {
    let (app, _) = test_app();
    submit(&app, "blank").await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/v1/ask-once",
            Some("blank"),
            json!({ "question": "   " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["errorType"], "invalid_request");
}

#[tokio::test]
async fn test_session_info_and_delete() {
    let (app, state) = test_app();
    submit(&app, "owner").await;

    let info = app
        .clone()
        .oneshot(
            Request::get("/v1/session")
                .header("x-session-id", "owner")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(info.status(), StatusCode::OK);
    let body = body_json(info).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["generation"], 1);
    assert_eq!(body["chunkCount"], 4);

    let delete = || {
        Request::delete("/v1/session")
            .header("x-session-id", "owner")
            .body(Body::empty())
            .unwrap()
    };
    let response = app.clone().oneshot(delete()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.service.sessions().is_empty().await);

    let response = app.clone().oneshot(delete()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(Request::delete("/v1/session").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_session_token() {
    let (app, _) = test_app();
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/v1/content",
            Some("not a token!"),
            json!({ "text": DOC }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_exposition() {
    let (app, _) = test_app();
    submit(&app, "metered").await;

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("docqa_ingests_total{outcome=\"ok\"} 1"));
    assert!(text.contains("docqa_sessions_live 1"));
}

#[tokio::test]
async fn test_ask_rejects_get() {
    let (app, _) = test_app();
    let response = app
        .oneshot(Request::get("/v1/ask").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
