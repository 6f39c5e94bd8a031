//! Cache capabilities and the tagged handle used to compose them.

use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Base cache capability. Every backend provides these five operations.
///
/// A miss is `Ok(None)`, never an error. `Err` is reserved for backends
/// that can actually fail (remote stores, broken connections).
#[async_trait]
pub trait Cache<V>: Send + Sync
where
    V: Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>>;
    async fn set(&self, key: &str, value: V) -> Result<()>;
    async fn has(&self, key: &str) -> Result<bool>;
    /// Returns whether an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Optional capability: report size and counters.
#[async_trait]
pub trait CacheStatsProvider: Send + Sync {
    async fn stats(&self) -> Result<CacheStats>;
}

/// Optional capability: release background tasks and stored data.
#[async_trait]
pub trait CacheLifecycle: Send + Sync {
    async fn destroy(&self) -> Result<()>;
}

pub trait StatsCache<V: Send + Sync + 'static>: Cache<V> + CacheStatsProvider {}
impl<V, T> StatsCache<V> for T
where
    V: Send + Sync + 'static,
    T: Cache<V> + CacheStatsProvider + ?Sized,
{
}

pub trait LifecycleCache<V: Send + Sync + 'static>: Cache<V> + CacheLifecycle {}
impl<V, T> LifecycleCache<V> for T
where
    V: Send + Sync + 'static,
    T: Cache<V> + CacheLifecycle + ?Sized,
{
}

pub trait ManagedCache<V: Send + Sync + 'static>:
    Cache<V> + CacheStatsProvider + CacheLifecycle
{
}
impl<V, T> ManagedCache<V> for T
where
    V: Send + Sync + 'static,
    T: Cache<V> + CacheStatsProvider + CacheLifecycle + ?Sized,
{
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub ttl: Option<Duration>,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A cache together with the capabilities it declares.
///
/// The variant is chosen when the handle is built, so callers such as
/// [`SafeCache`](super::SafeCache) know statically whether `stats`/`destroy`
/// can be delegated.
pub enum CacheHandle<V: Send + Sync + 'static> {
    Basic(Arc<dyn Cache<V>>),
    WithStats(Arc<dyn StatsCache<V>>),
    WithLifecycle(Arc<dyn LifecycleCache<V>>),
    Managed(Arc<dyn ManagedCache<V>>),
}

macro_rules! dispatch {
    ($handle:expr, $c:ident => $body:expr) => {
        match $handle {
            CacheHandle::Basic($c) => $body,
            CacheHandle::WithStats($c) => $body,
            CacheHandle::WithLifecycle($c) => $body,
            CacheHandle::Managed($c) => $body,
        }
    };
}

impl<V: Send + Sync + 'static> CacheHandle<V> {
    pub fn basic<C: Cache<V> + 'static>(cache: Arc<C>) -> Self {
        Self::Basic(cache)
    }

    pub fn with_stats<C: StatsCache<V> + 'static>(cache: Arc<C>) -> Self {
        Self::WithStats(cache)
    }

    pub fn with_lifecycle<C: LifecycleCache<V> + 'static>(cache: Arc<C>) -> Self {
        Self::WithLifecycle(cache)
    }

    pub fn managed<C: ManagedCache<V> + 'static>(cache: Arc<C>) -> Self {
        Self::Managed(cache)
    }

    pub fn supports_stats(&self) -> bool {
        matches!(self, Self::WithStats(_) | Self::Managed(_))
    }

    pub fn supports_lifecycle(&self) -> bool {
        matches!(self, Self::WithLifecycle(_) | Self::Managed(_))
    }

    /// Stats of the underlying cache, or `None` if it declares no such capability.
    pub async fn stats(&self) -> Result<Option<CacheStats>> {
        match self {
            Self::WithStats(c) => c.stats().await.map(Some),
            Self::Managed(c) => c.stats().await.map(Some),
            Self::Basic(_) | Self::WithLifecycle(_) => Ok(None),
        }
    }

    /// Destroy the underlying cache. A no-op for caches without a lifecycle.
    pub async fn destroy(&self) -> Result<()> {
        match self {
            Self::WithLifecycle(c) => c.destroy().await,
            Self::Managed(c) => c.destroy().await,
            Self::Basic(_) | Self::WithStats(_) => Ok(()),
        }
    }
}

impl<V: Send + Sync + 'static> Clone for CacheHandle<V> {
    fn clone(&self) -> Self {
        match self {
            Self::Basic(c) => Self::Basic(Arc::clone(c)),
            Self::WithStats(c) => Self::WithStats(Arc::clone(c)),
            Self::WithLifecycle(c) => Self::WithLifecycle(Arc::clone(c)),
            Self::Managed(c) => Self::Managed(Arc::clone(c)),
        }
    }
}

#[async_trait]
impl<V: Send + Sync + 'static> Cache<V> for CacheHandle<V> {
    async fn get(&self, key: &str) -> Result<Option<V>> {
        dispatch!(self, c => c.get(key).await)
    }
    async fn set(&self, key: &str, value: V) -> Result<()> {
        dispatch!(self, c => c.set(key, value).await)
    }
    async fn has(&self, key: &str) -> Result<bool> {
        dispatch!(self, c => c.has(key).await)
    }
    async fn delete(&self, key: &str) -> Result<bool> {
        dispatch!(self, c => c.delete(key).await)
    }
    async fn clear(&self) -> Result<()> {
        dispatch!(self, c => c.clear().await)
    }
    fn name(&self) -> &'static str {
        dispatch!(self, c => c.name())
    }
}

/// Cache that never stores anything.
pub struct NullCache;
impl NullCache {
    pub fn new() -> Self {
        Self
    }
}
impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V: Send + Sync + 'static> Cache<V> for NullCache {
    async fn get(&self, _: &str) -> Result<Option<V>> {
        Ok(None)
    }
    async fn set(&self, _: &str, _: V) -> Result<()> {
        Ok(())
    }
    async fn has(&self, _: &str) -> Result<bool> {
        Ok(false)
    }
    async fn delete(&self, _: &str) -> Result<bool> {
        Ok(false)
    }
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
    fn name(&self) -> &'static str {
        "null"
    }
}
