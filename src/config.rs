//! Server configuration
//!
//! Every option can come from the command line or from an environment
//! variable; the command line wins.

use crate::connection::DEFAULT_MAX_BUFFER_SIZE;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "respkv", version, about = "In-memory key-value server speaking RESP")]
pub struct Config {
    /// Host to bind to
    #[arg(long, env = "RESPKV_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "RESPKV_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Maximum bytes buffered per connection before it is dropped
    #[arg(long, env = "RESPKV_MAX_BUFFER", default_value_t = DEFAULT_MAX_BUFFER_SIZE)]
    pub max_buffer: usize,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "RESPKV_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_buffer: DEFAULT_MAX_BUFFER_SIZE,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let config = Config::try_parse_from([
            "respkv",
            "--host",
            "0.0.0.0",
            "-p",
            "6380",
            "--max-buffer",
            "1024",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:6380");
        assert_eq!(config.max_buffer, 1024);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(Config::try_parse_from(["respkv", "--port", "70000"]).is_err());
        assert!(Config::try_parse_from(["respkv", "--port", "abc"]).is_err());
    }

    #[test]
    fn test_default_bind_address() {
        assert_eq!(Config::default().bind_address(), "127.0.0.1:6379");
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Config::command().debug_assert();
    }
}
