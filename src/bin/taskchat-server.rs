// ABOUTME: Server binary entry point for the Taskchat assistant backend
// ABOUTME: Wires configuration, logging, storage, the LLM provider, and axum
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Taskchat server binary

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use taskchat::config::ServerConfig;
use taskchat::database::Database;
use taskchat::llm::OpenAiCompatibleProvider;
use taskchat::logging;
use taskchat::routes::{self, AppState};

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "taskchat-server", about = "Conversational task assistant backend")]
struct Args {
    /// HTTP port to listen on (overrides HTTP_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env().context("Failed to initialize logging")?;

    let mut config = ServerConfig::from_env().context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    let database = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    info!("Database ready at {}", config.database_url);

    let provider =
        OpenAiCompatibleProvider::from_env().context("Failed to initialize LLM provider")?;

    let state = AppState {
        database,
        llm: Arc::new(provider),
        config: Arc::new(config.clone()),
    };

    let app = routes::router(state)
        .layer(axum::middleware::from_fn(routes::trusted_header_auth));

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Taskchat server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
