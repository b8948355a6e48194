// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// src/monitoring/mod.rs - Metrics exported at /metrics

pub mod metrics;

pub use metrics::{NodeMetrics, OUTCOME_OK};
