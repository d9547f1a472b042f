//! Application settings
//!
//! Runtime settings loaded from the environment: upstream timeouts, the
//! usage log location, and logging preferences. Binding configuration
//! lives in the JSON store (`config::file`), not here.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Upstream HTTP client configuration
    pub upstream: UpstreamConfig,
    /// Accounting configuration
    pub accounting: AccountingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Upstream HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Request timeout in seconds for non-streaming calls
    pub timeout: u64,
    /// Request timeout in seconds for streaming calls
    pub stream_timeout: u64,
}

/// Accounting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingConfig {
    /// Path of the append-only usage log
    pub usage_log: PathBuf,
    /// Capacity of the dispatch event ring buffer
    pub events_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

impl Settings {
    /// Create a new settings instance from the environment
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let settings = Self {
            upstream: UpstreamConfig {
                timeout: parse_env("MODELGATE_UPSTREAM_TIMEOUT", 30),
                stream_timeout: parse_env("MODELGATE_STREAM_TIMEOUT", 300),
            },
            accounting: AccountingConfig {
                usage_log: env::var("MODELGATE_USAGE_LOG")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("usage.jsonl")),
                events_capacity: parse_env("MODELGATE_EVENTS_CAPACITY", 256),
            },
            logging: LoggingConfig {
                level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
                format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            },
        };

        Ok(settings)
    }
}

fn parse_env<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("Invalid value for {}: '{}', using default", name, value);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new().unwrap();
        assert!(settings.upstream.timeout > 0);
        assert!(settings.upstream.stream_timeout >= settings.upstream.timeout);
        assert!(settings.accounting.events_capacity > 0);
    }

    #[test]
    fn test_parse_env_fallback() {
        std::env::set_var("MODELGATE_TEST_BAD_NUM", "not-a-number");
        let value: u64 = parse_env("MODELGATE_TEST_BAD_NUM", 42);
        assert_eq!(value, 42);
        std::env::remove_var("MODELGATE_TEST_BAD_NUM");
    }
}
