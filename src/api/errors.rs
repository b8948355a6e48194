// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::content::{ExtractError, FetchError};
use crate::rag::{RetrievalError, Stage};
use crate::session::SessionError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    /// Document too short or without extractable text
    InsufficientContent {
        message: String,
        stage: Option<Stage>,
    },
    /// Query before any successful ingest
    NotReady(String),
    /// Embedding, index or OCR backend failure
    Capability {
        message: String,
        stage: Option<Stage>,
    },
    /// Web page could not be retrieved
    FetchFailed(String),
    NotFound(String),
    ServiceUnavailable(String),
    InternalError(String),
}

impl ApiError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::ValidationError { .. } => "validation_error",
            ApiError::InsufficientContent { .. } => "content_error",
            ApiError::NotReady(_) => "not_ready",
            ApiError::Capability { .. } => "capability_error",
            ApiError::FetchFailed(_) => "fetch_error",
            ApiError::NotFound(_) => "not_found",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::InternalError(_) => "internal_error",
        }
    }

    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (message, details) = match self {
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                (message.clone(), Some(details))
            }
            ApiError::InsufficientContent { message, stage }
            | ApiError::Capability { message, stage } => {
                let details = stage.map(|stage| {
                    let mut details = HashMap::new();
                    details.insert(
                        "stage".to_string(),
                        serde_json::to_value(stage).unwrap_or(serde_json::Value::Null),
                    );
                    details
                });
                (message.clone(), details)
            }
            ApiError::InvalidRequest(msg)
            | ApiError::NotReady(msg)
            | ApiError::FetchFailed(msg)
            | ApiError::NotFound(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::InternalError(msg) => (msg.clone(), None),
        };

        ErrorResponse {
            error_type: self.error_type().to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => 400,
            ApiError::NotFound(_) => 404,
            ApiError::NotReady(_) => 409,
            ApiError::InsufficientContent { .. } => 422,
            ApiError::InternalError(_) => 500,
            ApiError::Capability { .. } | ApiError::FetchFailed(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::InsufficientContent { message, .. } => {
                write!(f, "Insufficient content: {}", message)
            }
            ApiError::NotReady(msg) => write!(f, "Not ready: {}", msg),
            ApiError::Capability { message, .. } => write!(f, "Backend failure: {}", message),
            ApiError::FetchFailed(msg) => write!(f, "Fetch failed: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        let message = err.to_string();
        match err {
            RetrievalError::InvalidInput(_) => ApiError::InvalidRequest(message),
            RetrievalError::InsufficientContent { stage, .. } => ApiError::InsufficientContent {
                message,
                stage: Some(stage),
            },
            RetrievalError::Capability { stage, .. } => ApiError::Capability {
                message,
                stage: Some(stage),
            },
            RetrievalError::NotReady { .. } => ApiError::NotReady(message),
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        let message = err.to_string();
        match err {
            FetchError::UnsafeUrl(_) => ApiError::ValidationError {
                field: "url".to_string(),
                message,
            },
            FetchError::InsufficientContent { .. } => ApiError::InsufficientContent {
                message,
                stage: Some(Stage::Validation),
            },
            FetchError::Client(_) => ApiError::InternalError(message),
            FetchError::Timeout(_) | FetchError::Http(_) | FetchError::HttpStatus { .. } => {
                ApiError::FetchFailed(message)
            }
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        let message = err.to_string();
        match err {
            ExtractError::TooLarge { .. } => ApiError::ValidationError {
                field: "file".to_string(),
                message,
            },
            ExtractError::Empty
            | ExtractError::InsufficientContent { .. }
            | ExtractError::Unsupported(_) => ApiError::InsufficientContent {
                message,
                stage: Some(Stage::Validation),
            },
            ExtractError::Ocr(_) => ApiError::Capability {
                message,
                stage: None,
            },
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let message = err.to_string();
        match err {
            SessionError::InvalidToken(_) => ApiError::ValidationError {
                field: "x-session-id".to_string(),
                message,
            },
            SessionError::NotFound(_) => ApiError::NotFound(message),
            SessionError::CapacityExceeded { .. } => ApiError::ServiceUnavailable(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response(None))).into_response()
    }
}
