// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prometheus metrics for ingestion, queries and streams
//!
//! - `docqa_ingests_total{outcome}` - ingests by outcome (`ok`, error kind)
//! - `docqa_queries_total{mode,outcome}` - one-shot and streamed queries
//! - `docqa_streams_started_total` / `docqa_streams_cancelled_total`
//! - `docqa_sessions_live` - sessions currently held
//! - `docqa_ingest_duration_seconds` - ingest latency
//! - `docqa_chunks_indexed_total` - chunks embedded across all ingests

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

pub const OUTCOME_OK: &str = "ok";

/// Latency buckets in seconds, from a cached hash embedding to a slow
/// remote model
const INGEST_BUCKETS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    ingests: IntCounterVec,
    queries: IntCounterVec,
    streams_started: IntCounter,
    streams_cancelled: IntCounter,
    sessions_live: IntGauge,
    ingest_duration: Histogram,
    chunks_indexed: IntCounter,
}

impl NodeMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let ingests = IntCounterVec::new(
            Opts::new("docqa_ingests_total", "Document ingests by outcome"),
            &["outcome"],
        )?;
        let queries = IntCounterVec::new(
            Opts::new("docqa_queries_total", "Queries by delivery mode and outcome"),
            &["mode", "outcome"],
        )?;
        let streams_started = IntCounter::with_opts(Opts::new(
            "docqa_streams_started_total",
            "Answer streams started",
        ))?;
        let streams_cancelled = IntCounter::with_opts(Opts::new(
            "docqa_streams_cancelled_total",
            "Answer streams stopped by the consumer before completion",
        ))?;
        let sessions_live = IntGauge::with_opts(Opts::new(
            "docqa_sessions_live",
            "Sessions currently held in memory",
        ))?;
        let ingest_duration = Histogram::with_opts(
            HistogramOpts::new(
                "docqa_ingest_duration_seconds",
                "Time from raw text to installed vector store",
            )
            .buckets(INGEST_BUCKETS.to_vec()),
        )?;
        let chunks_indexed = IntCounter::with_opts(Opts::new(
            "docqa_chunks_indexed_total",
            "Chunks embedded and indexed",
        ))?;

        registry.register(Box::new(ingests.clone()))?;
        registry.register(Box::new(queries.clone()))?;
        registry.register(Box::new(streams_started.clone()))?;
        registry.register(Box::new(streams_cancelled.clone()))?;
        registry.register(Box::new(sessions_live.clone()))?;
        registry.register(Box::new(ingest_duration.clone()))?;
        registry.register(Box::new(chunks_indexed.clone()))?;

        Ok(Self {
            registry,
            ingests,
            queries,
            streams_started,
            streams_cancelled,
            sessions_live,
            ingest_duration,
            chunks_indexed,
        })
    }

    pub fn record_ingest(&self, outcome: &str, elapsed: Duration, chunks: usize) {
        self.ingests.with_label_values(&[outcome]).inc();
        if outcome == OUTCOME_OK {
            self.ingest_duration.observe(elapsed.as_secs_f64());
            self.chunks_indexed.inc_by(chunks as u64);
        }
    }

    pub fn record_query(&self, mode: &str, outcome: &str) {
        self.queries.with_label_values(&[mode, outcome]).inc();
    }

    pub fn record_stream_started(&self) {
        self.streams_started.inc();
    }

    pub fn record_stream_cancelled(&self) {
        self.streams_cancelled.inc();
    }

    pub fn set_live_sessions(&self, count: usize) {
        self.sessions_live.set(count as i64);
    }

    /// Prometheus text exposition of every registered metric
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
