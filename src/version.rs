// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the DocQA node

/// Full version string with feature description
pub const VERSION: &str = "v1.2.0-streaming-answers-2025-11-04";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.2.0";

pub const VERSION_MAJOR: u32 = 1;
pub const VERSION_MINOR: u32 = 2;
pub const VERSION_PATCH: u32 = 0;

/// Build date
pub const BUILD_DATE: &str = "2025-11-04";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "session-isolation",
    "sentence-chunking",
    "exact-l2-search",
    "atomic-reingest",
    "streaming-answers",
    "sse",
    "websocket",
    "url-ingest",
    "document-upload",
    "ocr-fallback",
    "iterative-summaries",
    "idle-session-eviction",
    "prometheus-metrics",
];

/// Breaking changes from previous version
pub const BREAKING_CHANGES: &[&str] = &[
    "Answer streams always end with an `end` event carrying the reason",
    "Errors inside a stream are delivered as a single `error` event",
    "POST /v1/ask-once replaces the non-streaming mode of POST /v1/ask",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("DocQA Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
        "breaking_changes": BREAKING_CHANGES,
    })
}
