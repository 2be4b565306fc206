//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server and poller configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `POLL_INTERVAL_SECS` — seconds between reconciler runs (default: `300`)
/// - `POLL_CALL_DELAY_MS` — pause between vendor calls in a run (default: `250`)
/// - `POLL_MAX_CALLS` — vendor call ceiling per run (default: `100`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub poll_interval: Duration,
    pub poll_call_delay: Duration,
    pub poll_max_calls: usize,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT", 3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            poll_interval: Duration::from_secs(env_parse("POLL_INTERVAL_SECS", 300)),
            poll_call_delay: Duration::from_millis(env_parse("POLL_CALL_DELAY_MS", 250)),
            poll_max_calls: env_parse("POLL_MAX_CALLS", 100),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            poll_interval: Duration::from_secs(300),
            poll_call_delay: Duration::from_millis(250),
            poll_max_calls: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.poll_max_calls, 100);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
