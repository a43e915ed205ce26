//! Client configuration.
//!
//! Values come from code or from the environment:
//! `WAREHOUSE_API_URL` (default `http://localhost:3000`),
//! `WAREHOUSE_API_TIMEOUT_MS` (default 15000) and
//! `WAREHOUSE_API_MAX_RESPONSE_BYTES` (default 10 MiB).

use std::time::Duration;

use crate::error::ConfigError;
use crate::http::Credentials;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 10 * 1024 * 1024;

pub const ENV_BASE_URL: &str = "WAREHOUSE_API_URL";
pub const ENV_TIMEOUT_MS: &str = "WAREHOUSE_API_TIMEOUT_MS";
pub const ENV_MAX_RESPONSE_BYTES: &str = "WAREHOUSE_API_MAX_RESPONSE_BYTES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Credentials mode used when a call does not set its own.
    pub credentials: Credentials,
    pub max_response_bytes: u64,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            credentials: Credentials::default(),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_max_response_bytes(mut self, limit: u64) -> Self {
        self.max_response_bytes = limit;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = match lookup(ENV_BASE_URL) {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => url,
            Some(url) => {
                return Err(ConfigError::InvalidUrl {
                    var: ENV_BASE_URL,
                    value: url,
                })
            }
            None => DEFAULT_BASE_URL.to_string(),
        };
        let mut config = Self::new(&base_url);
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            config.timeout = Duration::from_millis(positive(ENV_TIMEOUT_MS, raw)?);
        }
        if let Some(raw) = lookup(ENV_MAX_RESPONSE_BYTES) {
            config.max_response_bytes = positive(ENV_MAX_RESPONSE_BYTES, raw)?;
        }
        Ok(config)
    }

    /// Join `path` onto the base URL. Absolute URLs are used as given.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

fn positive(var: &'static str, raw: String) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber { var, value: raw }),
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
