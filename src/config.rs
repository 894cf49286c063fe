//! Collector configuration.
//!
//! Everything the pipeline needs is passed in explicitly; there is no
//! process-wide client or settings object.

use std::time::Duration;

use crate::collector::fpm::format::Format;

/// Status URL polled when none is configured.
pub const DEFAULT_URL: &str = "http://127.0.0.1/status?full&json";

/// Per-request timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Largest status body accepted, in bytes.
pub const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Error type for invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyUrl,
    /// Only plain `http://` URLs can be polled; the HTTP client is built without TLS.
    UnsupportedScheme(String),
    ZeroTimeout,
    ZeroBodyLimit,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyUrl => write!(f, "status URL is empty"),
            ConfigError::UnsupportedScheme(url) => {
                write!(f, "status URL must start with http:// (TLS is not supported): {}", url)
            }
            ConfigError::ZeroTimeout => write!(f, "timeout must be greater than zero"),
            ConfigError::ZeroBodyLimit => write!(f, "body size limit must be greater than zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings for one status collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Status page URL. Its `json`/`full` query keys select the decode path.
    pub url: String,
    /// Upper bound for one fetch, connect included.
    pub timeout: Duration,
    /// Overrides the format derived from the URL.
    pub format: Option<Format>,
    pub max_body_size: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            format: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl CollectorConfig {
    /// Creates a config for `url` with default timeout and limits.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_format(mut self, format: Option<Format>) -> Self {
        self.format = format;
        self
    }

    /// Checks the settings before the first poll.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if !url.starts_with("http://") {
            return Err(ConfigError::UnsupportedScheme(url.to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_body_size == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }
        Ok(())
    }
}
