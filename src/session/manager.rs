use super::cookie::{parse_set_cookie, CookieJar};
use crate::transport::{HttpClient, HttpResponse};
use crate::{Error, ErrorContext, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub base_url: String,
    /// Cheap, stable endpoint requested only to collect `Set-Cookie` headers.
    pub bootstrap_path: String,
}

impl SessionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bootstrap_path: "/".to_string(),
        }
    }

    pub fn with_bootstrap_path(mut self, path: impl Into<String>) -> Self {
        self.bootstrap_path = path.into();
        self
    }

    pub fn bootstrap_url(&self) -> Result<String> {
        let base = url::Url::parse(&self.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base url: {}", e),
                ErrorContext::new()
                    .with_field_path("session.base_url")
                    .with_details(self.base_url.clone()),
            )
        })?;
        let joined = base.join(&self.bootstrap_path).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid bootstrap path: {}", e),
                ErrorContext::new()
                    .with_field_path("session.bootstrap_path")
                    .with_details(self.bootstrap_path.clone()),
            )
        })?;
        Ok(joined.into())
    }
}

struct InFlight {
    id: u64,
    result: Shared<BoxFuture<'static, Result<()>>>,
}

struct SessionInner {
    http: Arc<dyn HttpClient>,
    bootstrap_url: String,
    jar: Mutex<CookieJar>,
    in_flight: Mutex<Option<InFlight>>,
    next_id: AtomicU64,
    bootstraps: AtomicU64,
}

impl SessionInner {
    fn jar(&self) -> MutexGuard<'_, CookieJar> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn bootstrap(&self) -> Result<()> {
        self.bootstraps.fetch_add(1, Ordering::Relaxed);
        tracing::info!(url = %self.bootstrap_url, "bootstrapping upstream session");

        let response = match self.http.get(&self.bootstrap_url, &HashMap::new()).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "session bootstrap failed");
                return Err(e);
            }
        };
        if !response.is_success() {
            tracing::warn!(status = response.status, "session bootstrap rejected");
            return Err(Error::Remote {
                status: response.status,
                message: "session bootstrap rejected".to_string(),
            });
        }

        // parse everything first so the jar is never partially written
        let cookies: Vec<(String, String)> = response
            .set_cookies()
            .into_iter()
            .filter_map(parse_set_cookie)
            .collect();
        if cookies.is_empty() {
            tracing::debug!("session bootstrap returned no cookies");
        }
        let mut jar = self.jar();
        for (name, value) in cookies {
            jar.set(name, value);
        }
        tracing::debug!(cookies = jar.len(), "session established");
        Ok(())
    }
}

/// Cookie-based session shared by every caller of one upstream.
///
/// At most one bootstrap request is in flight at a time; concurrent callers
/// of [`ensure_session`](Self::ensure_session) await that same request and
/// see the same outcome. Cloning is cheap and clones share the session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, http: Arc<dyn HttpClient>) -> Result<Self> {
        let bootstrap_url = config.bootstrap_url()?;
        Ok(Self {
            inner: Arc::new(SessionInner {
                http,
                bootstrap_url,
                jar: Mutex::new(CookieJar::new()),
                in_flight: Mutex::new(None),
                next_id: AtomicU64::new(0),
                bootstraps: AtomicU64::new(0),
            }),
        })
    }

    /// Resolve once a usable session exists.
    ///
    /// - An in-flight bootstrap is always joined rather than duplicated
    /// - Without `force_refresh`, existing cookies short-circuit with no request
    /// - With `force_refresh`, cookies are dropped and a new bootstrap runs,
    ///   unless a joined bootstrap already produced cookies
    ///
    /// # Panics
    ///
    /// Panics if a bootstrap has to be started outside a Tokio runtime; the
    /// request runs as its own task so that callers who stop waiting do not
    /// cancel it for the others.
    pub async fn ensure_session(&self, force_refresh: bool) -> Result<()> {
        loop {
            let (started, result) = {
                let mut slot = self.inner.in_flight();
                match slot.as_ref() {
                    Some(in_flight) => (false, in_flight.result.clone()),
                    None => {
                        if !force_refresh && self.has_session() {
                            return Ok(());
                        }
                        if force_refresh {
                            self.clear_session();
                        }
                        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                        let result = self.start_bootstrap(id);
                        *slot = Some(InFlight {
                            id,
                            result: result.clone(),
                        });
                        (true, result)
                    }
                }
            };

            result.await?;
            if started || !force_refresh || self.has_session() {
                return Ok(());
            }
            // joined a bootstrap that yielded no cookies; the refresh is still owed
        }
    }

    fn start_bootstrap(&self, id: u64) -> Shared<BoxFuture<'static, Result<()>>> {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = inner.bootstrap().await;
            let mut slot = inner.in_flight();
            if slot.as_ref().map(|f| f.id == id).unwrap_or(false) {
                *slot = None;
            }
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(Error::session_with_context(
                    format!("session bootstrap did not complete: {}", e),
                    ErrorContext::new().with_source("session_manager"),
                ))
            })
        }
        .boxed()
        .shared()
    }

    /// `{"Cookie": "a=1; b=2"}`, or an empty map when there is no session.
    pub fn get_auth_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(cookie) = self.inner.jar().header_value() {
            headers.insert("Cookie".to_string(), cookie);
        }
        headers
    }

    /// Fold any `Set-Cookie` headers of an ordinary response into the session.
    pub fn handle_response(&self, response: &HttpResponse) {
        let set_cookies = response.set_cookies();
        if set_cookies.is_empty() {
            return;
        }
        let merged = self.inner.jar().merge_set_cookies(set_cookies);
        if merged > 0 {
            tracing::debug!(merged, "refreshed session cookies from response");
        }
    }

    pub fn clear_session(&self) {
        self.inner.jar().clear();
    }

    pub fn has_session(&self) -> bool {
        !self.inner.jar().is_empty()
    }

    pub fn is_bootstrapping(&self) -> bool {
        self.inner.in_flight().is_some()
    }

    /// Total bootstrap requests issued so far.
    pub fn bootstrap_count(&self) -> u64 {
        self.inner.bootstraps.load(Ordering::Relaxed)
    }

    pub fn bootstrap_url(&self) -> &str {
        &self.inner.bootstrap_url
    }
}
