// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! `/v1/ws` connection loop
//!
//! One answer stream per connection at a time. A new `ask` or a
//! `stream_cancel` stops the running stream; closing the socket stops it too.

use axum::extract::ws::{Message, WebSocket};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::messages::{ClientMessage, ServerMessage};
use crate::api::service::QaService;
use crate::api::streaming::{AnswerStream, EndReason, StreamEvent};

struct ActiveStream {
    stream: AnswerStream,
    sent: usize,
}

impl ActiveStream {
    /// Stop the producer and report how many fragments went out
    fn cancel(self) -> ServerMessage {
        self.stream.cancel();
        ServerMessage::StreamEnd {
            reason: EndReason::Cancelled,
            fragments: self.sent,
        }
    }
}

pub async fn handle_socket(
    mut socket: WebSocket,
    service: Arc<QaService>,
    connection_token: Option<String>,
) {
    let mut active: Option<ActiveStream> = None;

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket closed by client");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {}", e);
                        break;
                    }
                };

                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Ask { question, k, session_id }) => {
                        let cancelled = active.take().map(ActiveStream::cancel);
                        match session_id.or_else(|| connection_token.clone()) {
                            Some(token) => {
                                info!(session_id = %token, "WebSocket ask");
                                active = Some(ActiveStream {
                                    stream: service.ask(&token, &question, k),
                                    sent: 0,
                                });
                                cancelled
                            }
                            None => Some(ServerMessage::error(
                                "invalid_request",
                                "sessionId is required",
                            )),
                        }
                    }
                    Ok(ClientMessage::StreamCancel) => active.take().map(ActiveStream::cancel),
                    Ok(ClientMessage::Ping) => Some(ServerMessage::Pong),
                    Err(e) => Some(ServerMessage::error(
                        "invalid_request",
                        format!("unrecognised message: {}", e),
                    )),
                };

                if let Some(reply) = reply {
                    if socket.send(Message::Text(reply.to_json())).await.is_err() {
                        break;
                    }
                }
            }
            event = next_event(&mut active) => {
                let Some(event) = event else {
                    active = None;
                    continue;
                };
                if let (StreamEvent::Fragment { .. }, Some(current)) = (&event, active.as_mut()) {
                    current.sent += 1;
                }
                let finished = event.is_end();
                let message = ServerMessage::from(event);
                if socket.send(Message::Text(message.to_json())).await.is_err() {
                    break;
                }
                if finished {
                    active = None;
                }
            }
        }
    }

    if let Some(current) = active.take() {
        current.cancel();
        debug!("Cancelled answer stream on socket close");
    }
}

async fn next_event(active: &mut Option<ActiveStream>) -> Option<StreamEvent> {
    match active {
        Some(current) => current.stream.next_event().await,
        None => std::future::pending().await,
    }
}
