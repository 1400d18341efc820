//! Command Handler
//!
//! Turns a decoded argument list into exactly one reply. Command names are
//! matched case-insensitively; keys and values are used byte-for-byte.
//!
//! ## Supported Commands
//!
//! - `PING [message]` - Test connection
//! - `ECHO message` - Echo message
//! - `SET key value [PX milliseconds]` - Set a string, optionally expiring
//! - `GET key` - Get a string
//! - `RPUSH key element [element ...]` - Append to a list
//! - `LPUSH key element [element ...]` - Prepend to a list
//! - `LRANGE key start stop` - Read an inclusive range of a list
//! - `LLEN key` - List length
//! - `DEL key [key ...]` - Delete keys
//! - `EXISTS key [key ...]` - Count live keys
//! - `TYPE key` - `string`, `list` or `none`
//! - `DBSIZE` - Number of stored keys
//!
//! Every failure is a [`CommandError`] turned into an error reply; none of
//! them end the connection.

use crate::commands::error::CommandError;
use crate::protocol::RespValue;
use crate::storage::{Expiry, StorageEngine, StorageError};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

type CommandResult = Result<RespValue, CommandError>;

/// Executes commands against the shared storage engine.
///
/// Cheap to clone; every session gets its own handle to the same store.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Executes one command and returns its reply.
    ///
    /// `args[0]` is the command name. An empty argument list is not a
    /// command and produces no reply.
    pub fn execute(&self, args: &[Bytes]) -> Option<RespValue> {
        let (name, args) = args.split_first()?;
        let cmd = String::from_utf8_lossy(name).to_ascii_uppercase();

        let reply = self
            .dispatch(&cmd, name, args)
            .unwrap_or_else(RespValue::from);
        Some(reply)
    }

    /// Dispatches a command to its handler.
    fn dispatch(&self, cmd: &str, name: &Bytes, args: &[Bytes]) -> CommandResult {
        match cmd {
            // Connection
            "PING" => self.cmd_ping(args),
            "ECHO" => self.cmd_echo(args),

            // Strings
            "SET" => self.cmd_set(args),
            "GET" => self.cmd_get(args),

            // Lists
            "RPUSH" => self.cmd_push(args, "rpush", StorageEngine::rpush),
            "LPUSH" => self.cmd_push(args, "lpush", StorageEngine::lpush),
            "LRANGE" => self.cmd_lrange(args),
            "LLEN" => self.cmd_llen(args),

            // Keys
            "DEL" => self.cmd_del(args),
            "EXISTS" => self.cmd_exists(args),
            "TYPE" => self.cmd_type(args),
            "DBSIZE" => self.cmd_dbsize(args),

            _ => {
                let name = String::from_utf8_lossy(name).into_owned();
                debug!(command = %name, "Unknown command");
                Err(CommandError::UnknownCommand(name))
            }
        }
    }

    // ========================================================================
    // Connection Commands
    // ========================================================================

    /// PING [message]
    fn cmd_ping(&self, args: &[Bytes]) -> CommandResult {
        match args {
            [] => Ok(RespValue::pong()),
            [message] => Ok(RespValue::bulk_string(message.clone())),
            _ => Err(CommandError::WrongArity("ping")),
        }
    }

    /// ECHO message
    fn cmd_echo(&self, args: &[Bytes]) -> CommandResult {
        match args {
            [message] => Ok(RespValue::bulk_string(message.clone())),
            _ => Err(CommandError::WrongArity("echo")),
        }
    }

    // ========================================================================
    // String Commands
    // ========================================================================

    /// SET key value [PX milliseconds]
    fn cmd_set(&self, args: &[Bytes]) -> CommandResult {
        let (key, value, expiry) = match args {
            [key, value] => (key, value, Expiry::Never),
            [key, value, option, amount] => {
                if !option.eq_ignore_ascii_case(b"PX") {
                    return Err(CommandError::Syntax);
                }
                let ms = parse_integer(amount)?;
                let now = Instant::now();
                // A negative duration is a deadline already in the past
                let expiry = match u64::try_from(ms) {
                    Ok(ms) => Expiry::after(now, Duration::from_millis(ms)),
                    Err(_) => Expiry::At(now),
                };
                (key, value, expiry)
            }
            _ => return Err(CommandError::WrongArity("set")),
        };

        self.storage.set_string(key.clone(), value.clone(), expiry);
        Ok(RespValue::ok())
    }

    /// GET key
    fn cmd_get(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("get"));
        };

        Ok(match self.storage.get_string(key)? {
            Some(value) => RespValue::bulk_string(value),
            None => RespValue::null(),
        })
    }

    // ========================================================================
    // List Commands
    // ========================================================================

    /// RPUSH / LPUSH key element [element ...]
    fn cmd_push<F>(&self, args: &[Bytes], name: &'static str, push: F) -> CommandResult
    where
        F: FnOnce(&StorageEngine, Bytes, Vec<Bytes>) -> Result<usize, StorageError>,
    {
        let [key, elements @ ..] = args else {
            return Err(CommandError::WrongArity(name));
        };
        if elements.is_empty() {
            return Err(CommandError::WrongArity(name));
        }

        let len = push(&*self.storage, key.clone(), elements.to_vec())?;
        Ok(RespValue::integer(len as i64))
    }

    /// LRANGE key start stop
    fn cmd_lrange(&self, args: &[Bytes]) -> CommandResult {
        let [key, start, stop] = args else {
            return Err(CommandError::WrongArity("lrange"));
        };
        let start = parse_integer(start)?;
        let stop = parse_integer(stop)?;

        let items = self.storage.lrange(key, start, stop)?;
        Ok(RespValue::bulk_array(items))
    }

    /// LLEN key
    fn cmd_llen(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("llen"));
        };

        let len = self.storage.llen(key)?;
        Ok(RespValue::integer(len as i64))
    }

    // ========================================================================
    // Key Commands
    // ========================================================================

    /// DEL key [key ...]
    fn cmd_del(&self, args: &[Bytes]) -> CommandResult {
        if args.is_empty() {
            return Err(CommandError::WrongArity("del"));
        }

        let deleted = args.iter().filter(|key| self.storage.remove(key)).count();
        Ok(RespValue::integer(deleted as i64))
    }

    /// EXISTS key [key ...]
    fn cmd_exists(&self, args: &[Bytes]) -> CommandResult {
        if args.is_empty() {
            return Err(CommandError::WrongArity("exists"));
        }

        let count = args.iter().filter(|key| self.storage.exists(key)).count();
        Ok(RespValue::integer(count as i64))
    }

    /// TYPE key
    fn cmd_type(&self, args: &[Bytes]) -> CommandResult {
        let [key] = args else {
            return Err(CommandError::WrongArity("type"));
        };

        Ok(RespValue::simple_string(self.storage.key_type(key)))
    }

    /// DBSIZE
    fn cmd_dbsize(&self, args: &[Bytes]) -> CommandResult {
        if !args.is_empty() {
            return Err(CommandError::WrongArity("dbsize"));
        }

        Ok(RespValue::integer(self.storage.len() as i64))
    }
}

/// Parses a decimal `i64` argument.
fn parse_integer(arg: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::NotAnInteger)
}
