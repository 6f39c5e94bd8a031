//! Upstream session handling.
//!
//! The content API authenticates callers with cookies handed out by any of
//! its endpoints. [`SessionManager`] obtains them once through a cheap
//! bootstrap request, keeps them fresh from ordinary responses and rebuilds
//! the `Cookie` header for outgoing calls.
//!
//! ```rust,no_run
//! use content_relay::session::{SessionConfig, SessionManager};
//! use content_relay::transport::HttpTransport;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> content_relay::Result<()> {
//! let http = Arc::new(HttpTransport::new(Duration::from_secs(30))?);
//! let session = SessionManager::new(
//!     SessionConfig::new("https://content.example.com").with_bootstrap_path("/robots.txt"),
//!     http,
//! )?;
//! session.ensure_session(false).await?;
//! let headers = session.get_auth_headers();
//! # Ok(())
//! # }
//! ```

mod cookie;
mod manager;

pub use cookie::{parse_set_cookie, CookieJar};
pub use manager::{SessionConfig, SessionManager};
