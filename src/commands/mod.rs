//! Command Handler Module
//!
//! Receives decoded command frames, executes them against the storage
//! engine and produces exactly one reply per command.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Frame Parser   │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Dispatch     │
//! │  - Validate     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! ### Connection
//! - `PING`, `ECHO`
//!
//! ### Strings
//! - `SET` (with `PX`), `GET`
//!
//! ### Lists
//! - `RPUSH`, `LPUSH`, `LRANGE`, `LLEN`
//!
//! ### Keys
//! - `DEL`, `EXISTS`, `TYPE`, `DBSIZE`

pub mod error;
pub mod handler;

pub use error::CommandError;
pub use handler::CommandHandler;
