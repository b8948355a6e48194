// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{start_server, AppState, ContentSource, QaService, StreamEvent};
use crate::config::NodeConfig;
use crate::monitoring::NodeMetrics;
use crate::session::SessionStore;

/// DocQA Node CLI
#[derive(Parser, Debug)]
#[command(name = "docqa-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Ask questions about a document from the command line", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP/WebSocket server
    Serve(ServeArgs),

    /// Index one document and answer a question about it
    Ask(AskArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address host (overrides API_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides API_PORT)
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
#[command(group(
    clap::ArgGroup::new("source")
        .required(true)
        .args(["text", "file", "url"]),
))]
pub struct AskArgs {
    /// Document text
    #[arg(long)]
    pub text: Option<String>,

    /// Document file (text, markdown, HTML or an image with OCR_URL set)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Web page to fetch
    #[arg(long)]
    pub url: Option<String>,

    /// Question to answer
    #[arg(long, short)]
    pub question: String,

    /// Number of passages (defaults to RETRIEVAL_TOP_K)
    #[arg(long, short)]
    pub k: Option<usize>,

    /// Print fragments as they are produced
    #[arg(long)]
    pub stream: bool,

    /// Print the document summary
    #[arg(long)]
    pub summary: bool,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve(args) => {
            let mut config = NodeConfig::from_env();
            if let Some(host) = args.host {
                config.api_host = host;
            }
            if let Some(port) = args.port {
                config.api_port = port;
            }
            serve(config).await
        }
        Commands::Ask(args) => ask(args).await,
    }
}

/// Validate `config`, wire the service and serve until shutdown
pub async fn serve(config: NodeConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {}", e))?;
    let addr = config.socket_addr()?;
    let service = config.build_service(NodeMetrics::new()?)?;
    start_server(Arc::new(AppState::new(Arc::new(service))), addr).await
}

async fn ask(args: AskArgs) -> Result<()> {
    let config = NodeConfig {
        session_idle_ttl_secs: 0,
        ..NodeConfig::from_env()
    };
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {}", e))?;
    let service = config.build_service(NodeMetrics::new()?)?;

    let source = if let Some(text) = args.text {
        ContentSource::Text(text)
    } else if let Some(url) = args.url {
        ContentSource::Url(url)
    } else if let Some(path) = args.file {
        let bytes = tokio::fs::read(&path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        ContentSource::Document { file_name, bytes }
    } else {
        return Err(anyhow!("one of --text, --file or --url is required"));
    };

    let token = SessionStore::generate_token();
    let content = service.submit_content(&token, source).await?;
    eprintln!(
        "📄 Indexed {} chunks ({} words)",
        content.chunk_count, content.word_count
    );
    if args.summary {
        match &content.summary {
            Some(summary) => println!("📝 Summary: {}\n", summary),
            None => eprintln!("⚠️  Summary unavailable"),
        }
    }

    if args.stream {
        stream_answer(&service, &token, &args.question, args.k).await
    } else {
        let answer = service.ask_once(&token, &args.question, args.k).await?;
        println!("{}", answer.answer);
        for passage in &answer.passages {
            eprintln!(
                "   #{} (distance {:.4}): {}",
                passage.chunk_index, passage.distance, passage.text
            );
        }
        Ok(())
    }
}

async fn stream_answer(
    service: &QaService,
    token: &str,
    question: &str,
    k: Option<usize>,
) -> Result<()> {
    let mut stream = service.ask(token, question, k);
    let mut stdout = std::io::stdout();

    while let Some(event) = stream.next_event().await {
        match event {
            StreamEvent::Fragment { text, .. } => {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            StreamEvent::Error { kind, message } => {
                writeln!(stdout)?;
                return Err(anyhow!("{}: {}", kind, message));
            }
            StreamEvent::End { .. } => break,
        }
    }
    writeln!(stdout)?;
    Ok(())
}
