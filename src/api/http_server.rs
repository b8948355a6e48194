// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::extract::ws::WebSocketUpgrade;
use axum::{
    extract::{DefaultBodyLimit, Json, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Router,
};
use axum_extra::extract::Multipart;
use futures::stream::StreamExt;
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::errors::ApiError;
use super::handlers::{AskRequest, ContentRequest};
use super::service::{ContentSource, QaService};
use super::websocket::handle_socket;
use crate::content::document::MAX_DOCUMENT_BYTES;
use crate::session::SessionStore;

/// Header carrying the session token on every request and response
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QaService>,
}

impl AppState {
    pub fn new(service: Arc<QaService>) -> Self {
        Self { service }
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/content", post(content_handler))
        .route(
            "/v1/document",
            post(document_handler).layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES + 64 * 1024)),
        )
        .route("/v1/ask", post(ask_handler))
        .route("/v1/ask-once", post(ask_once_handler))
        .route("/v1/ws", get(websocket_handler))
        .route(
            "/v1/session",
            get(session_info_handler).delete(delete_session_handler),
        )
        .route("/metrics", get(metrics_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers([header::HeaderName::from_static(SESSION_HEADER)]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Token from the `x-session-id` header, or a fresh one
fn session_token(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(SessionStore::generate_token)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.health().await)
}

async fn content_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ContentRequest>,
) -> Result<Response, ApiError> {
    let token = session_token(&headers);
    let source = match (request.text, request.url) {
        (Some(text), None) => ContentSource::Text(text),
        (None, Some(url)) => ContentSource::Url(url),
        _ => {
            return Err(ApiError::InvalidRequest(
                "provide exactly one of `text` or `url`".to_string(),
            ))
        }
    };

    let response = state.service.submit_content(&token, source).await?;
    Ok(([(SESSION_HEADER, token)], Json(response)).into_response())
}

async fn document_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let token = session_token(&headers);

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("failed to read upload: {}", e)))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(ApiError::ValidationError {
            field: "file".to_string(),
            message: "multipart field `file` is required".to_string(),
        });
    };
    debug!("Received document {} ({} bytes)", file_name, bytes.len());

    let response = state
        .service
        .submit_content(&token, ContentSource::Document { file_name, bytes })
        .await?;
    Ok(([(SESSION_HEADER, token)], Json(response)).into_response())
}

async fn ask_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AskRequest>,
) -> Response {
    let token = session_token(&headers);
    let stream = state.service.ask(&token, &request.question, request.k);

    let events = stream.map(|event| Event::default().event(event.name()).json_data(&event));

    (
        [(SESSION_HEADER, token)],
        Sse::new(events).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

async fn ask_once_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AskRequest>,
) -> Result<Response, ApiError> {
    let token = session_token(&headers);
    let response = state
        .service
        .ask_once(&token, &request.question, request.k)
        .await?;
    Ok(([(SESSION_HEADER, token)], Json(response)).into_response())
}

#[derive(Debug, Deserialize)]
struct WsParams {
    #[serde(default, alias = "sessionId")]
    session_id: Option<String>,
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<WsParams>,
) -> impl IntoResponse {
    let token = params.session_id.or_else(|| {
        headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    });
    let service = Arc::clone(&state.service);
    ws.on_upgrade(move |socket| handle_socket(socket, service, token))
}

/// Token from the `x-session-id` header; required for session management
fn required_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::ValidationError {
            field: SESSION_HEADER.to_string(),
            message: "session header is required".to_string(),
        })
}

async fn session_info_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let info = state.service.session_info(required_token(&headers)?).await?;
    Ok(Json(info).into_response())
}

async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    state.service.remove_session(required_token(&headers)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    state.service.refresh_session_gauge().await;
    let metrics = state.service.metrics();
    let body = metrics
        .render()
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, metrics.content_type())], body).into_response())
}
