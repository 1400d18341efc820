//! Incremental RESP Command Decoder
//!
//! Clients send every command as an array of bulk strings:
//!
//! ```text
//! *<N>\r\n
//! $<L1>\r\n<L1 bytes>\r\n
//! ...
//! $<LN>\r\n<LN bytes>\r\n
//! ```
//!
//! The parser works on whatever bytes have been read so far and returns:
//! - `Ok(Some((args, consumed)))` - a full frame was decoded from the first `consumed` bytes
//! - `Ok(None)` - the frame is incomplete, read more and try again
//! - `Err(ParseError)` - the bytes can never form a valid frame; close the connection
//!
//! Nothing is consumed on `Ok(None)`, so the caller simply retries with a
//! longer buffer. A frame with `N = 0` decodes to an empty argument list.

use crate::protocol::types::{prefix, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that make a frame undecodable. All of them are fatal to the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A header line did not start with the required type byte
    #[error("expected '{expected}', got {found:?}")]
    UnexpectedPrefix { expected: char, found: char },

    /// A count or length was not a decimal integer
    #[error("invalid {what}: {value:?}")]
    InvalidInteger { what: &'static str, value: String },

    /// A count or length was negative (null forms are not valid in requests)
    #[error("invalid {what}: {value}")]
    NegativeLength { what: &'static str, value: i64 },

    /// A bulk string was not followed by CRLF
    #[error("bulk string missing trailing CRLF")]
    MissingCrlf,

    /// The frame exceeds a size limit
    #[error("{what} too large: {size} (max: {max})")]
    MessageTooLarge {
        what: &'static str,
        size: usize,
        max: usize,
    },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of elements in one command frame
pub const MAX_ARGS: usize = 1024 * 1024;

/// A decoded frame: the argument list and how many bytes it occupied.
pub type Frame = (Vec<Bytes>, usize);

/// Decodes command frames from a byte buffer.
///
/// # Example
///
/// ```
/// use respkv::protocol::FrameParser;
///
/// let parser = FrameParser::new();
/// let input = b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n";
/// let (args, consumed) = parser.parse(input).unwrap().unwrap();
/// assert_eq!(args, vec!["ECHO", "hi"]);
/// assert_eq!(consumed, input.len());
/// ```
#[derive(Debug, Clone)]
pub struct FrameParser {
    max_bulk_len: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            max_bulk_len: MAX_BULK_SIZE,
        }
    }

    /// Creates a parser that rejects bulk strings longer than `max_bulk_len`.
    pub fn with_max_bulk_len(max_bulk_len: usize) -> Self {
        Self { max_bulk_len }
    }

    /// Attempts to decode one command frame from the start of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<Frame>> {
        if buf.is_empty() {
            return Ok(None);
        }

        let (count, mut pos) = match read_header(buf, prefix::ARRAY, "multibulk length")? {
            Some(header) => header,
            None => return Ok(None),
        };

        if count > MAX_ARGS {
            return Err(ParseError::MessageTooLarge {
                what: "multibulk length",
                size: count,
                max: MAX_ARGS,
            });
        }

        // The declared count is untrusted; don't preallocate all of it.
        let mut args = Vec::with_capacity(count.min(64));

        for _ in 0..count {
            match self.parse_bulk(&buf[pos..])? {
                Some((data, consumed)) => {
                    args.push(data);
                    pos += consumed;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((args, pos)))
    }

    /// Parses one bulk string: `$<length>\r\n<data>\r\n`
    fn parse_bulk(&self, buf: &[u8]) -> ParseResult<Option<(Bytes, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        let (length, data_start) = match read_header(buf, prefix::BULK_STRING, "bulk length")? {
            Some(header) => header,
            None => return Ok(None),
        };

        if length > self.max_bulk_len {
            return Err(ParseError::MessageTooLarge {
                what: "bulk length",
                size: length,
                max: self.max_bulk_len,
            });
        }

        let data_end = data_start + length;
        let total = data_end + CRLF.len();
        if buf.len() < total {
            return Ok(None);
        }

        if &buf[data_end..total] != CRLF {
            return Err(ParseError::MissingCrlf);
        }

        let data = Bytes::copy_from_slice(&buf[data_start..data_end]);
        Ok(Some((data, total)))
    }
}

/// Reads a `<prefix><non-negative integer>\r\n` line.
///
/// Returns the integer and the number of bytes the line occupied.
fn read_header(buf: &[u8], expected: u8, what: &'static str) -> ParseResult<Option<(usize, usize)>> {
    // The prefix is checked before waiting for the line end so garbage is
    // rejected as soon as its first byte arrives.
    if buf[0] != expected {
        return Err(ParseError::UnexpectedPrefix {
            expected: expected as char,
            found: buf[0] as char,
        });
    }

    let line_end = match find_crlf(&buf[1..]) {
        Some(pos) => 1 + pos,
        None => return Ok(None),
    };

    let value = parse_length(&buf[1..line_end], what)?;
    Ok(Some((value, line_end + CRLF.len())))
}

/// Parses a decimal count or length. Only ASCII digits are accepted.
fn parse_length(digits: &[u8], what: &'static str) -> ParseResult<usize> {
    let invalid = || ParseError::InvalidInteger {
        what,
        value: String::from_utf8_lossy(digits).into_owned(),
    };

    if let Some(rest) = digits.strip_prefix(b"-") {
        if !rest.is_empty() && rest.iter().all(u8::is_ascii_digit) {
            let value = std::str::from_utf8(rest)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .map(|n| -n)
                .ok_or_else(invalid)?;
            return Err(ParseError::NegativeLength { what, value });
        }
        return Err(invalid());
    }

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }

    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(invalid)
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}
