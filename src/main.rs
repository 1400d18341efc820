//! respkv server entry point
//!
//! Sets up logging, the shared storage engine and the TCP listener, then
//! hands each accepted client to its own task.

use anyhow::Context;
use clap::Parser;
use respkv::commands::CommandHandler;
use respkv::connection::{handle_connection, ConnectionStats};
use respkv::storage::StorageEngine;
use respkv::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &Config) {
    println!(
        r#"
respkv v{} - In-Memory Key-Value Server
──────────────────────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        respkv::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // RUST_LOG takes precedence over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.log_level))
                .context("invalid log level")?,
        )
        .with_target(false)
        .init();

    let storage = Arc::new(StorageEngine::new());
    info!("Storage engine initialized with 64 shards");

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;

    print_banner(&config);
    info!("Listening on {}", config.bind_address());

    tokio::select! {
        _ = accept_loop(listener, storage, Arc::clone(&stats), config.max_buffer) => {}
        result = signal::ctrl_c() => {
            result.context("failed to listen for Ctrl+C")?;
            info!("Shutdown signal received, stopping server...");
        }
    }

    info!(
        connections = stats.connections_accepted.load(std::sync::atomic::Ordering::Relaxed),
        commands = stats.commands_processed.load(std::sync::atomic::Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
    max_buffer: usize,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    error!(client = %addr, "Failed to set TCP_NODELAY: {}", e);
                }

                let handler = CommandHandler::new(Arc::clone(&storage));
                let stats = Arc::clone(&stats);

                tokio::spawn(handle_connection(stream, addr, handler, stats, max_buffer));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
