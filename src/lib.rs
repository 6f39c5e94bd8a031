//! # content-relay
//!
//! Resilient caching and session layer for adapters that front a single
//! content API.
//!
//! ## Overview
//!
//! An adapter that turns tool, resource and prompt calls into upstream
//! requests mostly does straight value mapping. The parts that are not simple
//! live here:
//!
//! - **Redundant calls**: identical concurrent requests collapse into one
//!   upstream execution ([`resilience::Deduplicator`])
//! - **Cache failures**: a broken primary cache degrades to a fallback instead
//!   of failing requests ([`cache::SafeCache`])
//! - **Memory growth**: cached entries expire and are swept in the background
//!   ([`cache::TtlCache`])
//! - **Authentication**: one cookie session shared by every caller, bootstrapped
//!   at most once at a time ([`session::SessionManager`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use content_relay::{ContentClientBuilder, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> content_relay::Result<()> {
//!     content_relay::telemetry::init_tracing();
//!
//!     let client = ContentClientBuilder::from_config(RelayConfig::from_env()?).build()?;
//!     let article = client.get_json("/articles/42", &[("lang", "en")]).await?;
//!     println!("{}", article);
//!
//!     client.shutdown().await
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Cache capabilities, TTL cache, primary/fallback composite |
//! | [`resilience`] | Single-flight deduplication |
//! | [`session`] | Cookie session bootstrap and reuse |
//! | [`transport`] | HTTP capability and the reqwest transport |
//! | [`client`] | The composed content client |
//! | [`config`] | Environment-driven configuration |
//! | [`telemetry`] | Logging bootstrap |

pub mod cache;
pub mod client;
pub mod config;
pub mod resilience;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use client::{ContentClient, ContentClientBuilder};
pub use config::RelayConfig;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
