// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use docqa_node::{
    api::{create_app, AppState},
    config::NodeConfig,
    monitoring::NodeMetrics,
    version,
};
use std::{env, sync::Arc};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting DocQA Node...\n");
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!("📅 Build Date: {}", version::BUILD_DATE);
    println!();

    let config = NodeConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {}", e))?;

    println!("🧠 Initializing retrieval engine...");
    let metrics = NodeMetrics::new()?;
    let service = Arc::new(config.build_service(metrics)?);
    println!(
        "✅ Embedding model: {} ({} passages per answer)",
        service.engine().model_name(),
        config.retrieval_top_k
    );
    println!("✅ Minimum document size: {} words", config.min_content_words);
    if config.session_idle_ttl_secs > 0 {
        println!(
            "✅ Idle sessions expire after {}s",
            config.session_idle_ttl_secs
        );
    }

    let addr = config.socket_addr()?;
    let app = create_app(Arc::new(AppState::new(service)));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("\n🌐 API server listening on http://{}", listener.local_addr()?);
    println!("   POST /v1/content     index text or a URL");
    println!("   POST /v1/document    index an uploaded file");
    println!("   POST /v1/ask         stream an answer (SSE)");
    println!("   POST /v1/ask-once    answer in one response");
    println!("   GET  /v1/ws          WebSocket streaming");
    println!("   GET  /metrics        Prometheus metrics");
    println!("\nPress Ctrl+C to stop\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            println!("\n🛑 Shutting down...");
        })
        .await?;

    Ok(())
}
