//! Integration tests for GithubCommentSource.
//!
//! Uses wiremock for HTTP mocking. Tests cover the three comment streams,
//! pagination, status mapping (401/403/404/429/5xx) and retry behavior.

use std::time::Duration;

use benchgate_core::override_gate::{CommentKind, CommentSource};
use benchgate_review::{GithubCommentSource, ReviewConfig, ReviewError, REVIEW_USER_AGENT};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPO: &str = "acme/server";

fn config(mock_server: &MockServer) -> ReviewConfig {
    ReviewConfig::default()
        .with_url(mock_server.uri())
        .with_repository(REPO)
        .with_token("test-token")
        .with_max_retries(0)
}

fn source(mock_server: &MockServer) -> GithubCommentSource {
    GithubCommentSource::new(config(mock_server)).expect("failed to create client")
}

async fn mount_empty(mock_server: &MockServer, p: &str) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_reads_all_three_streams() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/server/issues/42/comments"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("user-agent", REVIEW_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "body": "Perf Threshold Check Override", "user": {"login": "alice"}}
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/server/pulls/42/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "body": "nit", "user": {"login": "bob"}, "path": "src/x.cpp"}
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/server/pulls/42/commits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"sha": "abc123"}, {"sha": "def456"}
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/server/commits/abc123/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "body": "perf threshold check override", "user": null}
        ])))
        .mount(&mock_server)
        .await;
    mount_empty(&mock_server, "/repos/acme/server/commits/def456/comments").await;

    let comments = source(&mock_server).comments(42).await.expect("lookup failed");
    let kinds: Vec<_> = comments.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![CommentKind::Issue, CommentKind::Review, CommentKind::Commit]
    );
    assert_eq!(comments[0].author, "alice");
    assert_eq!(comments[2].author, "", "deleted user keeps an empty login");
}

#[tokio::test]
async fn test_pagination_until_short_page() {
    let mock_server = MockServer::start().await;

    let full_page: Vec<_> = (0..100)
        .map(|i| json!({"body": format!("comment {i}"), "user": {"login": "bot"}}))
        .collect();

    Mock::given(method("GET"))
        .and(path("/repos/acme/server/issues/7/comments"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(full_page)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/server/issues/7/comments"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"body": "last", "user": {"login": "alice"}}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let comments = source(&mock_server).issue_comments(7).await.unwrap();
    assert_eq!(comments.len(), 101);
    assert_eq!(comments[100].body, "last");
}

#[tokio::test]
async fn test_unauthorized() {
    let mock_server = MockServer::start().await;

    for status in [401, 403] {
        mock_server.reset().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&mock_server)
            .await;

        let result = source(&mock_server).issue_comments(1).await;
        assert!(
            matches!(result, Err(ReviewError::Unauthorized { .. })),
            "status {status} should map to Unauthorized"
        );
    }
}

#[tokio::test]
async fn test_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/server/pulls/9/comments"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let result = source(&mock_server).review_comments(9).await;
    match result {
        Err(ReviewError::NotFound { url }) => assert!(url.contains("/pulls/9/comments")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limiting_with_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "5"))
        .mount(&mock_server)
        .await;

    match source(&mock_server).issue_comments(1).await {
        Err(ReviewError::RateLimited { retry_after }) => {
            assert_eq!(retry_after, Some(Duration::from_secs(5)));
        }
        other => panic!("expected RateLimited error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_on_429_with_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = GithubCommentSource::new(config(&mock_server).with_max_retries(1)).unwrap();

    let start = std::time::Instant::now();
    let result = client.issue_comments(1).await;
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(ReviewError::RateLimited { .. })));
    assert!(
        elapsed.as_millis() >= 850,
        "Should have waited for retry-after (with jitter), elapsed: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_server_error_is_retried_then_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/server/issues/3/comments"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/server/issues/3/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let client = GithubCommentSource::new(config(&mock_server).with_max_retries(1)).unwrap();
    assert!(client.issue_comments(3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_server_error_without_retries_is_network_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal server error"))
        .mount(&mock_server)
        .await;

    match source(&mock_server).issue_comments(1).await {
        Err(ReviewError::Network { message }) => assert!(message.contains("HTTP 500")),
        other => panic!("expected Network error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&mock_server)
        .await;

    let result = source(&mock_server).issue_comments(1).await;
    assert!(matches!(result, Err(ReviewError::InvalidResponse { .. })));
}

#[tokio::test]
async fn test_lookup_error_surfaces_through_trait() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let err = source(&mock_server).comments(1).await.unwrap_err();
    assert!(err.to_string().contains("unauthorized"));
}
