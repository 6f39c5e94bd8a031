//! HTTP capability consumed by the session manager and the content client.
//!
//! The relay never talks to `reqwest` directly outside of [`HttpTransport`];
//! everything else goes through the [`HttpClient`] trait so tests can count
//! calls or script responses.

mod http;

pub use http::HttpTransport;

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

/// Minimal GET-only HTTP capability.
///
/// Implementations return `Error::Remote` for non-2xx statuses and
/// `Error::Transport` when no response was received at all.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, headers: &HashMap<String, String>) -> Result<HttpResponse>;
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// All `Set-Cookie` values, in the order the server sent them.
    ///
    /// `HeaderMap` lookups are case-insensitive, so `set-cookie` and
    /// `Set-Cookie` are treated the same.
    pub fn set_cookies(&self) -> Vec<&str> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(Arc<reqwest::Error>),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_set_cookies_collects_every_value() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1; Path=/"));
        headers.append("Set-Cookie", HeaderValue::from_static("b=2; HttpOnly"));
        headers.insert("content-type", HeaderValue::from_static("text/html"));

        let resp = HttpResponse::new(200, headers, "");
        assert_eq!(resp.set_cookies(), vec!["a=1; Path=/", "b=2; HttpOnly"]);
    }

    #[test]
    fn test_json_body() {
        let resp = HttpResponse::new(200, HeaderMap::new(), r#"{"title":"hello"}"#);
        let value: serde_json::Value = resp.json().unwrap();
        assert_eq!(value["title"], "hello");
        assert!(resp.is_success());
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let resp = HttpResponse::new(200, HeaderMap::new(), "<html>");
        let err = resp.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, crate::Error::Serialization(_)));
    }
}
