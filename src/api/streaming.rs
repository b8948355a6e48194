// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Incremental answer delivery
//!
//! A producer task computes the answer, splits it into fragments and writes
//! them to a bounded channel. The consumer side is an [`AnswerStream`].
//! Every stream ends with exactly one `End` event unless the consumer goes
//! away first; a failure is reported as one `Error` event followed by `End`.
//!
//! Cancellation: dropping the `AnswerStream`, or calling
//! [`AnswerStream::cancel`], stops the producer at its next suspension point.

use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::rag::{Answer, ErrorKind, FragmentMode, RetrievalError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Complete,
    Error,
    Cancelled,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Complete => "complete",
            EndReason::Error => "error",
            EndReason::Cancelled => "cancelled",
        }
    }
}

/// One item of an answer stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Fragment { index: usize, text: String },
    Error { kind: ErrorKind, message: String },
    End { reason: EndReason, fragments: usize },
}

impl StreamEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Fragment { .. } => "fragment",
            StreamEvent::Error { .. } => "error",
            StreamEvent::End { .. } => "end",
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, StreamEvent::End { .. })
    }

    fn from_error(err: &RetrievalError) -> Self {
        StreamEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// How the producer terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed { fragments: usize },
    Failed,
    Cancelled { fragments: usize },
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Bounded channel size between producer and consumer
    pub capacity: usize,
    pub mode: FragmentMode,
    /// Pause between fragments (zero disables)
    pub fragment_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            mode: FragmentMode::Sentence,
            fragment_delay: Duration::ZERO,
        }
    }
}

/// Consumer half of an answer stream
pub struct AnswerStream {
    receiver: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
}

impl AnswerStream {
    /// Stop the producer; events already queued can still be drained
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    /// Drain the stream, returning every event in order
    pub async fn collect_events(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.receiver.recv().await {
            events.push(event);
        }
        events
    }
}

impl Drop for AnswerStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Stream for AnswerStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Spawn a producer for `compute` and return its stream
///
/// `compute` runs inside the producer task, so the caller returns at once.
/// The join handle resolves to how the producer finished.
pub fn spawn_answer_stream<F>(
    compute: F,
    config: &StreamConfig,
) -> (AnswerStream, JoinHandle<StreamOutcome>)
where
    F: Future<Output = Result<Answer, RetrievalError>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.capacity.max(1));
    let cancel = CancellationToken::new();
    let producer = Producer {
        tx,
        cancel: cancel.clone(),
        mode: config.mode,
        delay: config.fragment_delay,
    };

    let handle = tokio::spawn(producer.run(compute));

    (
        AnswerStream {
            receiver: rx,
            cancel,
        },
        handle,
    )
}

struct Producer {
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    mode: FragmentMode,
    delay: Duration,
}

impl Producer {
    async fn run<F>(self, compute: F) -> StreamOutcome
    where
        F: Future<Output = Result<Answer, RetrievalError>>,
    {
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return self.cancelled(0),
            _ = self.tx.closed() => return self.cancelled(0),
            result = compute => result,
        };

        let answer = match result {
            Ok(answer) => answer,
            Err(e) => {
                debug!("Answer stream failed: {}", e);
                if !self.emit(StreamEvent::from_error(&e)).await {
                    return self.cancelled(0);
                }
                self.emit(StreamEvent::End {
                    reason: EndReason::Error,
                    fragments: 0,
                })
                .await;
                return StreamOutcome::Failed;
            }
        };

        let fragments = answer.fragments(self.mode);
        let total = fragments.len();

        for (index, text) in fragments.into_iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return self.cancelled(index),
                    _ = self.tx.closed() => return self.cancelled(index),
                    _ = tokio::time::sleep(self.delay) => {}
                }
            }
            if !self.emit(StreamEvent::Fragment { index, text }).await {
                return self.cancelled(index);
            }
        }

        if !self
            .emit(StreamEvent::End {
                reason: EndReason::Complete,
                fragments: total,
            })
            .await
        {
            return self.cancelled(total);
        }

        StreamOutcome::Completed { fragments: total }
    }

    /// Send one event; false once the consumer is gone or cancelled
    async fn emit(&self, event: StreamEvent) -> bool {
        if self.cancel.is_cancelled() || self.tx.is_closed() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }

    fn cancelled(&self, fragments: usize) -> StreamOutcome {
        debug!("Answer stream cancelled after {} fragments", fragments);
        StreamOutcome::Cancelled { fragments }
    }
}
