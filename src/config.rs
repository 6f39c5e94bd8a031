//! Relay configuration with environment-driven defaults.

use crate::{Error, ErrorContext, Result};
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BOOTSTRAP_PATH: &str = "/";

pub const ENV_BASE_URL: &str = "CONTENT_RELAY_BASE_URL";
pub const ENV_BOOTSTRAP_PATH: &str = "CONTENT_RELAY_BOOTSTRAP_PATH";
pub const ENV_CACHE_TTL_SECS: &str = "CONTENT_RELAY_CACHE_TTL_SECS";
pub const ENV_DEDUP_TIMEOUT_MS: &str = "CONTENT_RELAY_DEDUP_TIMEOUT_MS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "CONTENT_RELAY_HTTP_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub base_url: String,
    pub bootstrap_path: String,
    pub cache_ttl: Duration,
    /// How long a caller waits on a deduplicated fetch; `None` waits forever.
    pub dedup_timeout: Option<Duration>,
    pub http_timeout: Duration,
}

impl RelayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bootstrap_path: DEFAULT_BOOTSTRAP_PATH.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            dedup_timeout: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn with_bootstrap_path(mut self, path: impl Into<String>) -> Self {
        self.bootstrap_path = path.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_dedup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.dedup_timeout = timeout;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Read the configuration from `CONTENT_RELAY_*` environment variables.
    ///
    /// - `CONTENT_RELAY_BASE_URL` (required)
    /// - `CONTENT_RELAY_BOOTSTRAP_PATH` (default `/`)
    /// - `CONTENT_RELAY_CACHE_TTL_SECS` (default 300)
    /// - `CONTENT_RELAY_DEDUP_TIMEOUT_MS` (default: no timeout)
    /// - `CONTENT_RELAY_HTTP_TIMEOUT_SECS` (default 30)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    /// Unparseable numbers fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup(ENV_BASE_URL)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "base url is not configured",
                    ErrorContext::new()
                        .with_field_path(ENV_BASE_URL)
                        .with_source("relay_config"),
                )
            })?;
        let number = |name: &str| lookup(name).and_then(|s| s.trim().parse::<u64>().ok());

        let mut cfg = Self::new(base_url);
        if let Some(path) = lookup(ENV_BOOTSTRAP_PATH).filter(|s| !s.trim().is_empty()) {
            cfg.bootstrap_path = path;
        }
        if let Some(secs) = number(ENV_CACHE_TTL_SECS) {
            cfg.cache_ttl = Duration::from_secs(secs);
        }
        cfg.dedup_timeout = number(ENV_DEDUP_TIMEOUT_MS)
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        if let Some(secs) = number(ENV_HTTP_TIMEOUT_SECS) {
            cfg.http_timeout = Duration::from_secs(secs.max(1));
        }
        Ok(cfg)
    }
}
