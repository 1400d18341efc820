//! RESP Protocol Implementation
//!
//! The server only ever receives one shape of frame, an array of bulk
//! strings, and replies with the handful of RESP forms a command can
//! produce.
//!
//! ## Modules
//!
//! - `types`: Defines the `RespValue` reply enum and its serialization
//! - `parser`: Incremental decoder for incoming command frames
//!
//! ## Example
//!
//! ```
//! use respkv::protocol::{FrameParser, RespValue};
//! use bytes::Bytes;
//!
//! // Decoding incoming data
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (args, consumed) = FrameParser::new().parse(data).unwrap().unwrap();
//! assert_eq!(args, vec![Bytes::from("GET"), Bytes::from("name")]);
//! assert_eq!(consumed, data.len());
//!
//! // Building replies
//! let response = RespValue::bulk_string(Bytes::from("Ariz"));
//! assert_eq!(response.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{Frame, FrameParser, ParseError, ParseResult, MAX_ARGS, MAX_BULK_SIZE};
pub use types::RespValue;
