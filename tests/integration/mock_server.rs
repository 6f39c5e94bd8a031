//! Mock HTTP server setup for integration tests

use content_relay::session::{SessionConfig, SessionManager};
use content_relay::transport::HttpTransport;
use content_relay::{ContentClient, ContentClientBuilder};
use mockito::{Mock, Server, ServerGuard};
use std::sync::Arc;
use std::time::Duration;

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    pub fn transport(&self) -> Arc<HttpTransport> {
        Arc::new(HttpTransport::new(Duration::from_secs(5)).expect("transport"))
    }

    pub fn session(&self, bootstrap_path: &str) -> SessionManager {
        SessionManager::new(
            SessionConfig::new(&self.base_url).with_bootstrap_path(bootstrap_path),
            self.transport(),
        )
        .expect("session manager")
    }

    /// Client pointed at the mock server with the default cache.
    pub fn client(&self, bootstrap_path: &str) -> ContentClient {
        ContentClientBuilder::new()
            .base_url(&self.base_url)
            .bootstrap_path(bootstrap_path)
            .http_timeout(Duration::from_secs(5))
            .build()
            .expect("content client")
    }

    /// Bootstrap endpoint answering with the given `Set-Cookie` values.
    pub async fn mock_bootstrap(&mut self, path: &str, cookies: &[&str], hits: usize) -> Mock {
        let mut mock = self.server.mock("GET", path).with_status(204);
        for c in cookies {
            mock = mock.with_header("set-cookie", c);
        }
        mock.expect(hits).create_async().await
    }

    /// JSON endpoint; `path` may include the query string.
    pub async fn mock_json(&mut self, path: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock("GET", path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }
}
