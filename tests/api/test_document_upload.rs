// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use super::helpers::{body_json, service_with, test_app, DOC};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use docqa_node::api::{create_app, AppState, StreamConfig};
use docqa_node::content::{DocumentExtractor, DocumentKind, ExtractError, OcrEngine};
use std::io::Write;
use std::sync::Arc;
use tower::util::ServiceExt;

const BOUNDARY: &str = "docqa-test-boundary";
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn multipart_request(field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    write!(
        body,
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .unwrap();
    body.extend_from_slice(bytes);
    write!(body, "\r\n--{BOUNDARY}--\r\n").unwrap();

    Request::post("/v1/document")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("x-session-id", "uploader")
        .body(Body::from(body))
        .unwrap()
}

/// Returns a fixed transcript for any image
struct StubOcr;

#[async_trait]
impl OcrEngine for StubOcr {
    async fn recognize(&self, _bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractError> {
        assert!(matches!(kind, DocumentKind::Image(_)));
        Ok(DOC.to_string())
    }

    fn name(&self) -> &str {
        "stub-ocr"
    }
}

#[tokio::test]
async fn test_text_file_upload() {
    // Round-trip through a real file so the bytes match what a client would send
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DOC.as_bytes()).unwrap();
    let bytes = std::fs::read(file.path()).unwrap();

    let (app, _) = test_app();
    let response = app
        .oneshot(multipart_request("file", "notes.txt", &bytes))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["sessionId"], "uploader");
    assert_eq!(body["source"], "document");
    assert_eq!(body["chunkCount"], 4);
}

#[tokio::test]
async fn test_pdf_upload_reads_text_layer() {
    let pdf = std::fs::read(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/animals.pdf"))
        .unwrap();
    let (app, state) = test_app();
    let response = app
        .oneshot(multipart_request("file", "animals.pdf", &pdf))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["source"], "document");
    assert_eq!(body["wordCount"], 40);

    let answer = state
        .service
        .ask_once("uploader", "Where do fish swim?", Some(1))
        .await
        .unwrap();
    assert_eq!(answer.answer, "Fish swim in the cold river all year long.");
}

#[tokio::test]
async fn test_markdown_upload_strips_markup() {
    let markdown = format!("# Animals\n\n{}", DOC.replace("The dog", "The **dog**"));
    let (app, state) = test_app();
    let response = app
        .oneshot(multipart_request("file", "animals.md", markdown.as_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let answer = state
        .service
        .ask_once("uploader", "Which dog ran after the ball?", Some(1))
        .await
        .unwrap();
    assert!(!answer.answer.contains("**"));
    assert!(answer.answer.contains("dog ran across the green field"));
}

#[tokio::test]
async fn test_image_without_ocr_is_rejected() {
    let (app, state) = test_app();
    let response = app
        .oneshot(multipart_request("file", "scan.png", PNG_MAGIC))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["errorType"], "content_error");
    assert!(state.service.sessions().get("uploader").await.is_none());
}

#[tokio::test]
async fn test_image_with_ocr_is_indexed() {
    let extractor = DocumentExtractor::default().with_ocr(Arc::new(StubOcr));
    let service = service_with(StreamConfig::default(), extractor);
    let app = create_app(Arc::new(AppState::new(Arc::new(service))));

    let response = app
        .oneshot(multipart_request("file", "scan.png", PNG_MAGIC))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["source"], "document");
    assert_eq!(body["chunkCount"], 4);
}

#[tokio::test]
async fn test_missing_file_field() {
    let (app, _) = test_app();
    let response = app
        .oneshot(multipart_request("attachment", "notes.txt", DOC.as_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errorType"], "validation_error");
    assert_eq!(body["details"]["field"], "file");
}
