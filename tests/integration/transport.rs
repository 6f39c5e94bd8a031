//! reqwest transport against the mock server

use crate::integration::mock_server::MockServerFixture;
use content_relay::transport::{HttpClient, HttpTransport};
use content_relay::Error;
use std::collections::HashMap;
use std::time::Duration;

#[tokio::test]
async fn test_success_exposes_status_headers_and_body() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("GET", "/doc")
        .with_status(200)
        .with_header("set-cookie", "a=1; Path=/")
        .with_header("set-cookie", "b=2")
        .with_body(r#"{"id":7}"#)
        .create_async()
        .await;

    let resp = fixture
        .transport()
        .get(&format!("{}/doc", fixture.base_url), &HashMap::new())
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.set_cookies(), vec!["a=1; Path=/", "b=2"]);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["id"], 7);
}

#[tokio::test]
async fn test_non_success_status_is_remote_error() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_json("/down", 503, r#"{"error":"maintenance"}"#).await;

    let err = fixture
        .transport()
        .get(&format!("{}/down", fixture.base_url), &HashMap::new())
        .await
        .unwrap_err();

    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("maintenance"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_headers_are_forwarded() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/private")
        .match_header("cookie", "sid=abc")
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let mut headers = HashMap::new();
    headers.insert("Cookie".to_string(), "sid=abc".to_string());
    fixture
        .transport()
        .get(&format!("{}/private", fixture.base_url), &headers)
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
    let err = transport
        .get("http://127.0.0.1:1/", &HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}
