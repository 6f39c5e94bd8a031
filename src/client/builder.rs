use super::core::ContentClient;
use crate::cache::{CacheHandle, CacheKeyGenerator, SafeCache, SafeCacheConfig, TtlCache};
use crate::config::{RelayConfig, DEFAULT_BOOTSTRAP_PATH, DEFAULT_CACHE_TTL, DEFAULT_HTTP_TIMEOUT};
use crate::resilience::Deduplicator;
use crate::session::{SessionConfig, SessionManager};
use crate::transport::{HttpClient, HttpTransport};
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`ContentClient`].
///
/// Every collaborator can be injected; whatever is not falls back to a
/// default: a reqwest transport and a `SafeCache` over two `TtlCache`s.
pub struct ContentClientBuilder {
    base_url: Option<String>,
    bootstrap_path: String,
    cache_ttl: Duration,
    dedup_timeout: Option<Duration>,
    http_timeout: Duration,
    http: Option<Arc<dyn HttpClient>>,
    cache: Option<CacheHandle<Value>>,
    safe_cache: SafeCacheConfig,
    key_prefix: Option<String>,
}

impl ContentClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            bootstrap_path: DEFAULT_BOOTSTRAP_PATH.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            dedup_timeout: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            http: None,
            cache: None,
            safe_cache: SafeCacheConfig::default(),
            key_prefix: None,
        }
    }

    /// Start from a [`RelayConfig`], e.g. one read with `RelayConfig::from_env()`.
    pub fn from_config(config: RelayConfig) -> Self {
        Self {
            base_url: Some(config.base_url),
            bootstrap_path: config.bootstrap_path,
            cache_ttl: config.cache_ttl,
            dedup_timeout: config.dedup_timeout,
            http_timeout: config.http_timeout,
            ..Self::new()
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Endpoint used solely to obtain session cookies.
    pub fn bootstrap_path(mut self, path: impl Into<String>) -> Self {
        self.bootstrap_path = path.into();
        self
    }

    /// TTL of the default cache. Ignored when a cache is injected.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn dedup_timeout(mut self, timeout: Duration) -> Self {
        self.dedup_timeout = Some(timeout);
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Use a caller-owned cache. The client will not destroy it on shutdown.
    pub fn cache(mut self, cache: CacheHandle<Value>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Breaker settings of the default cache.
    pub fn safe_cache_config(mut self, cfg: SafeCacheConfig) -> Self {
        self.safe_cache = cfg;
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn build(self) -> Result<ContentClient> {
        let base_url_raw = self.base_url.ok_or_else(|| {
            Error::configuration_with_context(
                "base url is required",
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_source("content_client_builder"),
            )
        })?;
        let base_url = url::Url::parse(&base_url_raw).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base url: {}", e),
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(base_url_raw.clone()),
            )
        })?;

        let http: Arc<dyn HttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(HttpTransport::new(self.http_timeout)?),
        };
        let session = SessionManager::new(
            SessionConfig::new(base_url_raw).with_bootstrap_path(self.bootstrap_path),
            Arc::clone(&http),
        )?;

        let (cache, owns_cache) = match self.cache {
            Some(cache) => (cache, false),
            None => {
                let primary = CacheHandle::managed(Arc::new(TtlCache::new(self.cache_ttl)));
                let fallback = CacheHandle::managed(Arc::new(TtlCache::new(self.cache_ttl)));
                let safe = SafeCache::with_config(primary, fallback, self.safe_cache);
                (CacheHandle::managed(Arc::new(safe)), true)
            }
        };

        let keys = match self.key_prefix {
            Some(prefix) => CacheKeyGenerator::new().with_prefix(prefix),
            None => CacheKeyGenerator::new(),
        };

        Ok(ContentClient {
            base_url,
            http,
            session,
            cache,
            dedup: Deduplicator::new(),
            keys,
            dedup_timeout: self.dedup_timeout,
            owns_cache,
        })
    }
}

impl Default for ContentClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
