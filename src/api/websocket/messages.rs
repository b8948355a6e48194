// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::api::streaming::{EndReason, StreamEvent};

/// Messages a client sends over `/v1/ws`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start streaming an answer; replaces any stream still running
    Ask {
        question: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        k: Option<usize>,
        /// Overrides the token given when the socket was opened
        #[serde(
            default,
            alias = "sessionId",
            skip_serializing_if = "Option::is_none"
        )]
        session_id: Option<String>,
    },
    /// Stop the running stream
    StreamCancel,
    Ping,
}

/// Messages the node sends over `/v1/ws`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    StreamChunk {
        index: usize,
        content: String,
    },
    Error {
        #[serde(rename = "errorType")]
        error_type: String,
        message: String,
    },
    StreamEnd {
        reason: EndReason,
        fragments: usize,
    },
    Pong,
}

impl ServerMessage {
    pub fn error(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","errorType":"internal_error","message":"serialization failed"}"#
                .to_string()
        })
    }
}

impl From<StreamEvent> for ServerMessage {
    fn from(event: StreamEvent) -> Self {
        match event {
            StreamEvent::Fragment { index, text } => ServerMessage::StreamChunk {
                index,
                content: text,
            },
            StreamEvent::Error { kind, message } => ServerMessage::Error {
                error_type: kind.to_string(),
                message,
            },
            StreamEvent::End { reason, fragments } => ServerMessage::StreamEnd { reason, fragments },
        }
    }
}
