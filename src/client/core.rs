use crate::cache::{Cache, CacheHandle, CacheKey, CacheKeyGenerator, CacheStats};
use crate::resilience::Deduplicator;
use crate::session::SessionManager;
use crate::transport::{HttpClient, TransportError};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cached, deduplicated, session-aware access to the content API.
///
/// Build one with [`ContentClientBuilder`](super::ContentClientBuilder).
pub struct ContentClient {
    pub(super) base_url: url::Url,
    pub(super) http: Arc<dyn HttpClient>,
    pub(super) session: SessionManager,
    pub(super) cache: CacheHandle<Value>,
    pub(super) dedup: Deduplicator<Value>,
    pub(super) keys: CacheKeyGenerator,
    pub(super) dedup_timeout: Option<Duration>,
    /// Whether the cache was created by the builder (and so is ours to destroy).
    pub(super) owns_cache: bool,
}

impl ContentClient {
    /// GET `path` with `query` and return the JSON body.
    ///
    /// Served from cache when possible; otherwise concurrent identical
    /// requests share a single upstream call whose result is cached.
    pub async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let key = self.cache_key(path, query);
        // a failed read counts as a miss
        match self.cache.get(key.as_str()).await {
            Ok(Some(hit)) => {
                debug!(key = %key, "cache hit");
                return Ok(hit);
            }
            Ok(None) => {}
            Err(e) => warn!(
                key = %key,
                cache = self.cache.name(),
                error = %e,
                "cache read failed, treating as miss"
            ),
        }

        let url = self.url_for(path, query)?;
        let http = Arc::clone(&self.http);
        let session = self.session.clone();
        let value = self
            .dedup
            .deduplicate(
                key.as_str(),
                move || fetch_json(http, session, url),
                self.dedup_timeout,
            )
            .await?;

        if let Err(e) = self.cache.set(key.as_str(), value.clone()).await {
            warn!(key = %key, cache = self.cache.name(), error = %e, "cache write-back failed");
        }
        Ok(value)
    }

    /// Like [`get_json`](Self::get_json), deserialized into `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let value = self.get_json(path, query).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Drop the cached response for a request, if any.
    pub async fn invalidate(&self, path: &str, query: &[(&str, &str)]) -> Result<bool> {
        let key = self.cache_key(path, query);
        self.cache.delete(key.as_str()).await
    }

    pub fn cache_key(&self, path: &str, query: &[(&str, &str)]) -> CacheKey {
        self.keys.for_request(path, query)
    }

    pub async fn cache_stats(&self) -> Result<CacheStats> {
        Ok(self.cache.stats().await?.unwrap_or_default())
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Upstream fetches currently in flight.
    pub fn pending_fetches(&self) -> usize {
        self.dedup.pending_count()
    }

    /// Release the cache if the builder created it. Injected caches belong to
    /// the caller and are left alone.
    pub async fn shutdown(&self) -> Result<()> {
        if self.owns_cache {
            self.cache.destroy().await?;
        }
        Ok(())
    }

    fn url_for(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| Error::Transport(TransportError::InvalidUrl(format!("{}: {}", path, e))))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().copied());
        }
        Ok(url.into())
    }
}

async fn fetch_json(http: Arc<dyn HttpClient>, session: SessionManager, url: String) -> Result<Value> {
    session.ensure_session(false).await?;

    let response = match http.get(&url, &session.get_auth_headers()).await {
        Err(e) if e.is_auth_failure() => {
            warn!(url = %url, status = e.status(), "upstream rejected session, refreshing");
            session.ensure_session(true).await?;
            http.get(&url, &session.get_auth_headers()).await?
        }
        other => other?,
    };

    session.handle_response(&response);
    response.json()
}
