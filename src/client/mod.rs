//! Content client: the composition of cache, deduplicator and session.
//!
//! A request is first looked up in the cache. On a miss the fetch goes
//! through the [`Deduplicator`](crate::resilience::Deduplicator), so N
//! concurrent identical requests cost one upstream call; the fetch itself
//! attaches session cookies, retries once with a refreshed session on 401/403
//! and the result is written back to the cache.

mod builder;
mod core;

pub use self::builder::ContentClientBuilder;
pub use self::core::ContentClient;
