//! # respkv - An In-Memory Key-Value Server Speaking RESP
//!
//! respkv accepts TCP clients that send commands in the Redis serialization
//! protocol, keeps string and list values in a shared in-memory store and
//! answers with RESP replies. Any RESP-speaking client, `redis-cli`
//! included, can talk to it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              respkv                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │   Frame     │    │              StorageEngine                   │   │
//! │  │   Parser    │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │  └─────────────┘    │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use respkv::commands::CommandHandler;
//! use respkv::connection::{handle_connection, ConnectionStats, DEFAULT_MAX_BUFFER_SIZE};
//! use respkv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Arc::new(StorageEngine::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await?;
//!         let handler = CommandHandler::new(Arc::clone(&storage));
//!         let stats = Arc::clone(&stats);
//!
//!         tokio::spawn(handle_connection(stream, addr, handler, stats, DEFAULT_MAX_BUFFER_SIZE));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING [message]`
//! - `ECHO message`
//! - `SET key value [PX milliseconds]`
//! - `GET key`
//! - `RPUSH key element [element ...]` / `LPUSH key element [element ...]`
//! - `LRANGE key start stop`
//! - `LLEN key`
//! - `DEL key [key ...]` / `EXISTS key [key ...]`
//! - `TYPE key`
//! - `DBSIZE`
//!
//! ## Module Overview
//!
//! - [`protocol`]: Command frame decoder and reply types
//! - [`storage`]: Thread-safe storage engine with per-key expiry
//! - [`commands`]: Command dispatch and execution
//! - [`connection`]: Client connection management
//! - [`config`]: Command-line and environment configuration
//!
//! ## Expiry
//!
//! Expiry is lazy only. A key whose deadline has passed is invisible to
//! every command, and the first access that notices it removes it.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{CommandError, CommandHandler};
pub use config::Config;
pub use connection::{handle_connection, ConnectionError, ConnectionStats};
pub use protocol::{FrameParser, ParseError, RespValue};
pub use storage::{StorageEngine, StorageError};

/// The default port respkv listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host respkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of respkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
