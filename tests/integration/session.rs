//! Session bootstrap over real HTTP

use crate::integration::mock_server::MockServerFixture;
use futures::future::join_all;

#[tokio::test]
async fn test_concurrent_bootstrap_hits_server_once() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_bootstrap("/robots.txt", &["a=1; Path=/", "b=2; HttpOnly"], 1)
        .await;
    let session = fixture.session("/robots.txt");

    let results = join_all((0..10).map(|_| session.ensure_session(false))).await;
    assert!(results.iter().all(|r| r.is_ok()));
    mock.assert_async().await;

    let headers = session.get_auth_headers();
    assert_eq!(headers.get("Cookie").map(String::as_str), Some("a=1; b=2"));
}

#[tokio::test]
async fn test_forced_refresh_from_many_callers_hits_server_once_more() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_bootstrap("/", &["sid=xyz"], 2).await;
    let session = fixture.session("/");

    session.ensure_session(false).await.unwrap();
    let results = join_all((0..6).map(|_| session.ensure_session(true))).await;

    assert!(results.iter().all(|r| r.is_ok()));
    mock.assert_async().await;
    assert_eq!(session.bootstrap_count(), 2);
}

#[tokio::test]
async fn test_failed_bootstrap_leaves_no_session() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_json("/", 500, r#"{"error":"boom"}"#).await;
    let session = fixture.session("/");

    let results = join_all((0..3).map(|_| session.ensure_session(false))).await;
    for r in results {
        assert_eq!(r.unwrap_err().status(), Some(500));
    }
    assert!(!session.has_session());
    assert!(session.get_auth_headers().is_empty());
}
