//! Storage Engine Module
//!
//! A thread-safe, sharded key-value store where every key holds a string or
//! a list, optionally with an expiry deadline.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **Typed Values**: Strings and lists, with type checks on every access
//! - **Lazy Expiry**: An expired entry is removed by the first access that
//!   sees it; there is no background sweeper
//!
//! ## Example
//!
//! ```
//! use respkv::storage::{Expiry, StorageEngine};
//! use bytes::Bytes;
//! use std::time::{Duration, Instant};
//!
//! let engine = StorageEngine::new();
//!
//! engine.set_string(Bytes::from("name"), Bytes::from("Ariz"), Expiry::Never);
//! assert_eq!(engine.get_string(b"name"), Ok(Some(Bytes::from("Ariz"))));
//!
//! // Set with a deadline
//! let expiry = Expiry::after(Instant::now(), Duration::from_secs(3600));
//! engine.set_string(Bytes::from("session"), Bytes::from("token123"), expiry);
//!
//! engine.rpush(Bytes::from("queue"), vec![Bytes::from("a"), Bytes::from("b")]).unwrap();
//! assert_eq!(engine.lrange(b"queue", 0, -1).unwrap().len(), 2);
//! ```

pub mod engine;
pub mod value;

// Re-export commonly used types
pub use engine::{resolve_range, StorageEngine, StorageError, StorageStats};
pub use value::{Entry, Expiry, StoredValue};
