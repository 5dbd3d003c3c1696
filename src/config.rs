//! Configuration Module
//!
//! Handles loading gateway configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL every upstream endpoint is appended to
    pub api_base_url: String,
    /// Per-attempt request timeout in milliseconds
    pub api_timeout_ms: u64,
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Fixed delay between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Default cache TTL in seconds
    pub cache_ttl: u64,
    /// Maximum number of cached entries
    pub max_entries: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Value sent in the `X-Client-Version` header
    pub client_version: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_BASE_URL` - Upstream base URL (default: https://api.cryptopulsepro.com/v1)
    /// - `API_TIMEOUT_MS` - Per-attempt timeout (default: 10000)
    /// - `MAX_RETRIES` - Retries after the first attempt (default: 3)
    /// - `RETRY_DELAY_MS` - Delay between attempts (default: 1000)
    /// - `CACHE_TTL` - Default TTL in seconds (default: 300)
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLIENT_VERSION` - Client version header (default: 2.1.0)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            api_timeout_ms: parse_var("API_TIMEOUT_MS").unwrap_or(defaults.api_timeout_ms),
            max_retries: parse_var("MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_delay_ms: parse_var("RETRY_DELAY_MS").unwrap_or(defaults.retry_delay_ms),
            cache_ttl: parse_var("CACHE_TTL").unwrap_or(defaults.cache_ttl),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            client_version: env::var("CLIENT_VERSION").unwrap_or(defaults.client_version),
        }
    }

    /// Rejects settings the fetcher cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("API_BASE_URL cannot be empty".to_string()));
        }
        if self.api_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "API_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.cryptopulsepro.com/v1".to_string(),
            api_timeout_ms: 10_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
            cache_ttl: 300,
            max_entries: 1000,
            server_port: 3000,
            client_version: "2.1.0".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
