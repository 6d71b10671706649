//! Server and client configuration
//! Handles dynamic configuration parameters for the hub and the client driver

use crate::constants::{
    DEFAULT_CHAT_COOLDOWN_MS, DEFAULT_HISTORY_SIZE, DEFAULT_HOST, DEFAULT_PERSIST_QUEUE_CAPACITY,
    DEFAULT_PING_INTERVAL_SECS, DEFAULT_PING_TIMEOUT_SECS, DEFAULT_PORT, WS_PATH,
};
use crate::error::{LiveSocksError, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Idle time before a connection is probed with a ping
    pub ping_interval: Duration,
    /// Time a probed connection has to answer before it is dropped
    pub ping_timeout: Duration,
    /// Minimum spacing between two chat/gift events on one connection
    pub chat_cooldown: Duration,
    /// Capacity of the fire-and-forget persistence queue
    pub persist_queue_capacity: usize,
    /// Number of records kept by the in-memory store
    pub history_size: usize,
    /// Append chat records to this JSON-lines file instead of memory
    pub persist_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ping_interval: Duration::from_secs(DEFAULT_PING_INTERVAL_SECS),
            ping_timeout: Duration::from_secs(DEFAULT_PING_TIMEOUT_SECS),
            chat_cooldown: Duration::from_millis(DEFAULT_CHAT_COOLDOWN_MS),
            persist_queue_capacity: DEFAULT_PERSIST_QUEUE_CAPACITY,
            history_size: DEFAULT_HISTORY_SIZE,
            persist_path: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("LIVE_SOCKS_HOST").unwrap_or(defaults.host);
        let port = parse_var(&lookup, "LIVE_SOCKS_PORT", defaults.port)?;

        let ping_secs = parse_var(&lookup, "LIVE_SOCKS_PING_INTERVAL", DEFAULT_PING_INTERVAL_SECS)?;
        let timeout_secs = parse_var(&lookup, "LIVE_SOCKS_PING_TIMEOUT", DEFAULT_PING_TIMEOUT_SECS)?;
        let cooldown_ms = parse_var(&lookup, "LIVE_SOCKS_CHAT_COOLDOWN_MS", DEFAULT_CHAT_COOLDOWN_MS)?;

        let persist_queue_capacity = parse_var(
            &lookup,
            "LIVE_SOCKS_PERSIST_QUEUE",
            defaults.persist_queue_capacity,
        )?;
        let history_size = parse_var(&lookup, "LIVE_SOCKS_HISTORY_SIZE", defaults.history_size)?;

        let persist_path = lookup("LIVE_SOCKS_PERSIST_PATH")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        if ping_secs == 0 || timeout_secs == 0 {
            return Err(LiveSocksError::ConfigError(
                "ping interval and ping timeout must be at least one second".to_string(),
            ));
        }
        if persist_queue_capacity == 0 {
            return Err(LiveSocksError::ConfigError(
                "LIVE_SOCKS_PERSIST_QUEUE must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            ping_interval: Duration::from_secs(ping_secs),
            ping_timeout: Duration::from_secs(timeout_secs),
            chat_cooldown: Duration::from_millis(cooldown_ms),
            persist_queue_capacity,
            history_size,
            persist_path,
        })
    }

    /// Address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            LiveSocksError::ConfigError(format!("{} has an invalid value: {}", key, raw))
        }),
        None => Ok(default),
    }
}

/// Client driver configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: Url,
    /// Identity stamped on outgoing chat/gift events by the terminal client
    pub user: String,
}

impl ClientConfig {
    /// Validate a WebSocket URL and build the configuration
    pub fn new(url: &str, user: impl Into<String>) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| LiveSocksError::ConfigError(format!("Invalid server URL {}: {}", url, e)))?;

        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(LiveSocksError::ConfigError(format!(
                    "Unsupported URL scheme '{}', expected ws or wss",
                    other
                )))
            }
        }

        Ok(Self {
            url,
            user: user.into(),
        })
    }

    /// Default endpoint of a locally running server
    pub fn default_url() -> String {
        format!("ws://{}:{}/{}", DEFAULT_HOST, DEFAULT_PORT, WS_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_reference_values() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8765);
        assert_eq!(config.ping_interval, Duration::from_secs(20));
        assert_eq!(config.chat_cooldown, Duration::from_secs(2));
        assert!(config.persist_path.is_none());
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("LIVE_SOCKS_HOST", "0.0.0.0"),
            ("LIVE_SOCKS_PORT", "9000"),
            ("LIVE_SOCKS_CHAT_COOLDOWN_MS", "500"),
            ("LIVE_SOCKS_PERSIST_PATH", "/tmp/chat.jsonl"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.chat_cooldown, Duration::from_millis(500));
        assert_eq!(config.persist_path, Some(PathBuf::from("/tmp/chat.jsonl")));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = ServerConfig::from_lookup(lookup_from(&[("LIVE_SOCKS_PORT", "http")]));
        assert!(result.unwrap_err().to_string().contains("LIVE_SOCKS_PORT"));
    }

    #[test]
    fn test_zero_ping_interval_is_rejected() {
        let result = ServerConfig::from_lookup(lookup_from(&[("LIVE_SOCKS_PING_INTERVAL", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_client_config_requires_ws_scheme() {
        assert!(ClientConfig::new("ws://127.0.0.1:8765/ws", "alice").is_ok());
        assert!(ClientConfig::new("http://127.0.0.1:8765/ws", "alice").is_err());
        assert!(ClientConfig::new("not a url", "alice").is_err());
    }
}
