//! Expiring in-memory cache with a background sweeper.

use super::backend::{Cache, CacheLifecycle, CacheStats, CacheStatsProvider};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Upper bound on the sweep period, so long TTLs are still swept hourly.
pub const MAX_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

struct CacheEntry<V> {
    data: V,
    timestamp: Instant,
}

impl<V> CacheEntry<V> {
    fn new(data: V) -> Self {
        Self {
            data,
            timestamp: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.timestamp.elapsed() >= ttl
    }
}

type Store<V> = Mutex<HashMap<String, CacheEntry<V>>>;

fn lock<V>(store: &Store<V>) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

fn sweep<V>(store: &Store<V>, ttl: Duration) -> usize {
    let mut entries = lock(store);
    let before = entries.len();
    entries.retain(|_, e| !e.is_expired(ttl));
    before - entries.len()
}

/// Generic key/value cache where every entry lives for the same `ttl`.
///
/// Expiry is checked lazily in [`get`](TtlCache::get); a background task
/// additionally runs [`cleanup`](TtlCache::cleanup) every `min(ttl, 1h)` to
/// reclaim entries nobody reads again. The task only holds a weak reference to
/// the store and is aborted by [`destroy`](TtlCache::destroy) or on drop.
///
/// A cache created outside a Tokio runtime starts its sweeper on the first
/// [`set`](TtlCache::set) made inside one.
pub struct TtlCache<V> {
    store: Arc<Store<V>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Create a cache. When called inside a Tokio runtime the sweeper is
    /// started immediately; otherwise it is deferred to the first write made
    /// from within a runtime.
    pub fn new(ttl: Duration) -> Self {
        let store = Arc::new(Mutex::new(HashMap::new()));
        let sweeper = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(spawn_sweeper(&runtime, Arc::downgrade(&store), ttl)),
            Err(_) => {
                tracing::debug!("no tokio runtime yet; ttl cache sweeper deferred to first write");
                None
            }
        };
        Self {
            store,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sweeper: Mutex::new(sweeper),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = lock(&self.store);
        match entries.get(key) {
            Some(entry) if entry.is_expired(self.ttl) => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.data.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: V) {
        lock(&self.store).insert(key.to_string(), CacheEntry::new(value));
        self.ensure_sweeper();
    }

    /// Same expiry rule as `get`, by construction.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&self, key: &str) -> bool {
        lock(&self.store).remove(key).is_some()
    }

    pub fn clear(&self) {
        lock(&self.store).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.store).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            ttl: Some(self.ttl),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Remove every expired entry and return how many were dropped.
    pub fn cleanup(&self) -> usize {
        sweep(&self.store, self.ttl)
    }

    /// Stop the sweeper and drop all entries. Safe to call repeatedly.
    ///
    /// The sweeper is not restarted afterwards; entries written to a destroyed
    /// cache still expire on read and via [`cleanup`](TtlCache::cleanup).
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
        if let Some(handle) = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.clear();
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    fn ensure_sweeper(&self) {
        if self.destroyed.load(Ordering::Acquire) {
            return;
        }
        let mut sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if sweeper.is_some() {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            tracing::debug!(ttl_ms = self.ttl.as_millis() as u64, "starting deferred ttl cache sweeper");
            *sweeper = Some(spawn_sweeper(&runtime, Arc::downgrade(&self.store), self.ttl));
        }
    }
}

fn spawn_sweeper<V: Send + 'static>(
    runtime: &tokio::runtime::Handle,
    store: Weak<Store<V>>,
    ttl: Duration,
) -> JoinHandle<()> {
    // interval() panics on a zero period
    let period = ttl.min(MAX_CLEANUP_INTERVAL).max(Duration::from_millis(1));

    runtime.spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(store) = store.upgrade() else {
                break;
            };
            let removed = sweep(&store, ttl);
            if removed > 0 {
                tracing::debug!(removed, "ttl cache swept expired entries");
            }
        }
    })
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        if let Some(handle) = self
            .sweeper
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> Cache<V> for TtlCache<V> {
    async fn get(&self, key: &str) -> Result<Option<V>> {
        Ok(TtlCache::get(self, key))
    }
    async fn set(&self, key: &str, value: V) -> Result<()> {
        TtlCache::set(self, key, value);
        Ok(())
    }
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(TtlCache::has(self, key))
    }
    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(TtlCache::delete(self, key))
    }
    async fn clear(&self) -> Result<()> {
        TtlCache::clear(self);
        Ok(())
    }
    fn name(&self) -> &'static str {
        "ttl-memory"
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> CacheStatsProvider for TtlCache<V> {
    async fn stats(&self) -> Result<CacheStats> {
        Ok(TtlCache::stats(self))
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> CacheLifecycle for TtlCache<V> {
    async fn destroy(&self) -> Result<()> {
        TtlCache::destroy(self);
        Ok(())
    }
}
