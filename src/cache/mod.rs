//! Caching layer: capabilities, the TTL cache and the resilient composite.
//!
//! # Caching Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Cache`] | Base capability: `get`/`set`/`has`/`delete`/`clear` |
//! | [`CacheStatsProvider`], [`CacheLifecycle`] | Optional capabilities |
//! | [`CacheHandle`] | A cache tagged with the capabilities it declares |
//! | [`TtlCache`] | In-memory expiring cache with a background sweeper |
//! | [`SafeCache`] | Primary/fallback composite that survives a failing primary |
//! | [`NullCache`] | No-op cache |
//! | [`CacheKeyGenerator`] | Stable keys for upstream requests |
//!
//! ## Example
//!
//! ```rust,no_run
//! use content_relay::cache::{Cache, CacheHandle, SafeCache, TtlCache};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> content_relay::Result<()> {
//! let ttl = Duration::from_secs(300);
//! let primary = CacheHandle::managed(Arc::new(TtlCache::<String>::new(ttl)));
//! let fallback = CacheHandle::managed(Arc::new(TtlCache::<String>::new(ttl)));
//! let cache = SafeCache::new(primary, fallback);
//!
//! cache.set("greeting", "hello".to_string()).await?;
//! assert_eq!(cache.get("greeting").await?, Some("hello".to_string()));
//! # Ok(())
//! # }
//! ```

mod backend;
mod key;
mod safe;
mod ttl;

pub use backend::{
    Cache, CacheHandle, CacheLifecycle, CacheStats, CacheStatsProvider, LifecycleCache,
    ManagedCache, NullCache, StatsCache,
};
pub use key::{CacheKey, CacheKeyGenerator};
pub use safe::{SafeCache, SafeCacheConfig, SafeCacheSnapshot, DEFAULT_FAILURE_THRESHOLD};
pub use ttl::{TtlCache, MAX_CLEANUP_INTERVAL};
