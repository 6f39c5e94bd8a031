//! Resilience primitives.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Deduplicator`] | Single-flight execution: concurrent identical operations share one run |
//!
//! The primary/fallback breaker for caches lives with the caches themselves,
//! see [`crate::cache::SafeCache`].
//!
//! ```rust,no_run
//! use content_relay::resilience::Deduplicator;
//! use std::time::Duration;
//!
//! # async fn demo() -> content_relay::Result<()> {
//! let dedup: Deduplicator<String> = Deduplicator::new();
//! let body = dedup
//!     .deduplicate(
//!         "GET /articles/42",
//!         || async { Ok("article body".to_string()) },
//!         Some(Duration::from_secs(10)),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod dedup;

pub use dedup::Deduplicator;
