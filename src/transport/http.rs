use super::{HttpClient, HttpResponse, TransportError};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Proxy;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// `reqwest`-backed [`HttpClient`].
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(
                env::var("CONTENT_RELAY_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("CONTENT_RELAY_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for HttpTransport {
    async fn get(&self, url: &str, headers: &HashMap<String, String>) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        for (k, v) in headers {
            request = request.header(k, v);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::from(e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(TransportError::from(e)))?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&body).chars().take(512).collect();
            tracing::debug!(url, status = status.as_u16(), "upstream returned non-success status");
            return Err(Error::Remote {
                status: status.as_u16(),
                message,
            });
        }

        Ok(HttpResponse::new(status.as_u16(), headers, body))
    }
}
