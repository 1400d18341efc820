//! Command Errors
//!
//! Failures that are reported to the client as an error reply while the
//! connection stays open. The `Display` text of each variant is exactly the
//! message that goes on the wire after the `-` prefix.

use crate::protocol::RespValue;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Argument count does not fit the command. Holds the lowercase command name.
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// Command name not recognised. Holds the name as the client sent it.
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
}

impl From<StorageError> for CommandError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::WrongType => CommandError::WrongType,
        }
    }
}

impl From<CommandError> for RespValue {
    fn from(err: CommandError) -> Self {
        RespValue::error(err.to_string())
    }
}
