//! End-to-end client tests: session cookie, dedup and cache over real HTTP

use crate::integration::mock_server::MockServerFixture;
use content_relay::{ContentClientBuilder, Error, RelayConfig};
use futures::future::join_all;
use std::collections::HashMap;

#[tokio::test]
async fn test_get_json_bootstraps_once_and_caches() {
    let mut fixture = MockServerFixture::new().await;
    let bootstrap = fixture.mock_bootstrap("/session", &["sid=abc; Path=/"], 1).await;
    let content = fixture
        .server
        .mock("GET", "/articles/1?lang=en")
        .match_header("cookie", "sid=abc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":1,"title":"Hello"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = fixture.client("/session");

    let concurrent =
        join_all((0..5).map(|_| client.get_json("/articles/1", &[("lang", "en")]))).await;
    for r in concurrent {
        assert_eq!(r.unwrap()["title"], "Hello");
    }
    let again = client.get_json("/articles/1", &[("lang", "en")]).await.unwrap();
    assert_eq!(again["id"], 1);

    bootstrap.assert_async().await;
    content.assert_async().await;

    let stats = client.cache_stats().await.unwrap();
    assert_eq!(stats.size, 1);
    assert!(stats.hits >= 1);
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_remote_error_is_not_cached() {
    let mut fixture = MockServerFixture::new().await;
    let _bootstrap = fixture.mock_bootstrap("/", &["sid=abc"], 1).await;
    let missing = fixture
        .server
        .mock("GET", "/missing")
        .with_status(404)
        .with_body("not found")
        .expect(2)
        .create_async()
        .await;

    let client = fixture.client("/");
    for _ in 0..2 {
        let err = client.get_json("/missing", &[]).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    missing.assert_async().await;
    assert_eq!(client.cache_stats().await.unwrap().size, 0);
}

#[tokio::test]
async fn test_client_from_lookup_config() {
    let mut fixture = MockServerFixture::new().await;
    let _bootstrap = fixture.mock_bootstrap("/start", &["sid=cfg"], 1).await;
    let _content = fixture.mock_json("/items", 200, r#"[1,2,3]"#).await;

    let vars: HashMap<&str, String> = [
        ("CONTENT_RELAY_BASE_URL", fixture.base_url.clone()),
        ("CONTENT_RELAY_BOOTSTRAP_PATH", "/start".to_string()),
        ("CONTENT_RELAY_DEDUP_TIMEOUT_MS", "2000".to_string()),
    ]
    .into_iter()
    .collect();
    let config = RelayConfig::from_lookup(|name| vars.get(name).cloned()).unwrap();
    let client = ContentClientBuilder::from_config(config).build().unwrap();

    let items: Vec<u32> = client.get("/items", &[]).await.unwrap();
    assert_eq!(items, vec![1, 2, 3]);
    assert_eq!(
        client.session().get_auth_headers().get("Cookie").map(String::as_str),
        Some("sid=cfg")
    );
}

#[tokio::test]
async fn test_bootstrap_failure_surfaces_to_caller() {
    let mut fixture = MockServerFixture::new().await;
    let _bootstrap = fixture.mock_json("/", 503, "unavailable").await;

    let client = fixture.client("/");
    let err = client.get_json("/anything", &[]).await.unwrap_err();
    assert!(matches!(err, Error::Remote { status: 503, .. }));
    assert!(!client.session().has_session());
}
