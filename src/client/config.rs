//! Client Configuration

use std::time::Duration;

/// Environment variable naming the game server URL.
pub const SERVER_URL_ENV: &str = "TICTACTOE_SERVER_URL";

/// Environment variable for the disconnect grace period, in milliseconds.
pub const SHUTDOWN_TIMEOUT_ENV: &str = "TICTACTOE_SHUTDOWN_TIMEOUT_MS";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket URL of the game server.
    pub server_url: String,
    /// How long a closing connection may take to shut down cleanly
    /// before its I/O task is aborted.
    pub shutdown_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:3000".to_string(),
            shutdown_timeout: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            server_url: lookup(SERVER_URL_ENV)
                .filter(|url| !url.is_empty())
                .unwrap_or(defaults.server_url),
            shutdown_timeout: lookup(SHUTDOWN_TIMEOUT_ENV)
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_timeout),
        }
    }
}
