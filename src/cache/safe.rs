//! Primary/fallback cache composite with a one-way breaker.

use super::backend::{Cache, CacheHandle, CacheLifecycle, CacheStats, CacheStatsProvider};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

#[derive(Debug, Clone)]
pub struct SafeCacheConfig {
    pub failure_threshold: u32,
}

impl Default for SafeCacheConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

impl SafeCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of primary failures after which the primary is abandoned.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeCacheSnapshot {
    pub failure_threshold: u32,
    pub failures: u32,
    pub fallback_mode: bool,
}

/// Cache that shields callers from a misbehaving primary.
///
/// - Every primary error is logged, counted and the call is retried on the fallback
/// - The count is shared by all operations and never reset by a success
/// - At the threshold the primary is abandoned for the lifetime of the instance
///
/// Errors only reach the caller when the fallback fails as well.
pub struct SafeCache<V: Send + Sync + 'static> {
    primary: CacheHandle<V>,
    fallback: CacheHandle<V>,
    cfg: SafeCacheConfig,
    failures: AtomicU32,
    fallback_mode: AtomicBool,
}

impl<V: Clone + Send + Sync + 'static> SafeCache<V> {
    pub fn new(primary: CacheHandle<V>, fallback: CacheHandle<V>) -> Self {
        Self::with_config(primary, fallback, SafeCacheConfig::default())
    }

    pub fn with_config(
        primary: CacheHandle<V>,
        fallback: CacheHandle<V>,
        cfg: SafeCacheConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            cfg,
            failures: AtomicU32::new(0),
            fallback_mode: AtomicBool::new(false),
        }
    }

    pub fn is_fallback_mode(&self) -> bool {
        self.fallback_mode.load(Ordering::SeqCst)
    }

    pub fn failure_count(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SafeCacheSnapshot {
        SafeCacheSnapshot {
            failure_threshold: self.cfg.failure_threshold,
            failures: self.failure_count(),
            fallback_mode: self.is_fallback_mode(),
        }
    }

    fn record_failure(&self, operation: &'static str, err: &Error) {
        // fetch_add hands out each count exactly once, so only one caller trips the switch
        let attempt = self.failures.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let threshold = self.cfg.failure_threshold;
        tracing::warn!(
            operation,
            attempt,
            threshold,
            primary = self.primary.name(),
            error = %err,
            "primary cache failed (attempt {}/{}), using fallback",
            attempt,
            threshold
        );
        if attempt == threshold {
            self.fallback_mode.store(true, Ordering::SeqCst);
            tracing::warn!(
                primary = self.primary.name(),
                fallback = self.fallback.name(),
                "primary cache failed {} times, switching to fallback permanently",
                threshold
            );
        }
    }

    async fn call<'a, R, F>(&'a self, operation: &'static str, f: F) -> Result<R>
    where
        F: Fn(&'a CacheHandle<V>) -> BoxFuture<'a, Result<R>>,
    {
        if !self.is_fallback_mode() {
            match f(&self.primary).await {
                Ok(value) => return Ok(value),
                Err(e) => self.record_failure(operation, &e),
            }
        }
        f(&self.fallback).await
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> Cache<V> for SafeCache<V> {
    async fn get(&self, key: &str) -> Result<Option<V>> {
        self.call("get", |c| c.get(key)).await
    }
    async fn set(&self, key: &str, value: V) -> Result<()> {
        self.call("set", |c| c.set(key, value.clone())).await
    }
    async fn has(&self, key: &str) -> Result<bool> {
        self.call("has", |c| c.has(key)).await
    }
    async fn delete(&self, key: &str) -> Result<bool> {
        self.call("delete", |c| c.delete(key)).await
    }
    async fn clear(&self) -> Result<()> {
        self.call("clear", |c| c.clear()).await
    }
    fn name(&self) -> &'static str {
        "safe"
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> CacheStatsProvider for SafeCache<V> {
    /// Stats of whichever delegate is serving; `CacheStats::default()` when
    /// neither declares the capability.
    async fn stats(&self) -> Result<CacheStats> {
        if !self.is_fallback_mode() && self.primary.supports_stats() {
            match self.primary.stats().await {
                Ok(Some(stats)) => return Ok(stats),
                Ok(None) => {}
                Err(e) => self.record_failure("stats", &e),
            }
        }
        Ok(self.fallback.stats().await?.unwrap_or_default())
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> CacheLifecycle for SafeCache<V> {
    /// Destroys both delegates. Failures are logged and swallowed.
    async fn destroy(&self) -> Result<()> {
        if let Err(e) = self.primary.destroy().await {
            tracing::warn!(cache = self.primary.name(), error = %e, "failed to destroy primary cache");
        }
        if let Err(e) = self.fallback.destroy().await {
            tracing::warn!(cache = self.fallback.name(), error = %e, "failed to destroy fallback cache");
        }
        Ok(())
    }
}
