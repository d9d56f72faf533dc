use super::*;
use axum::http::Request;
use tower::ServiceExt;

use crate::rate_limit::{RateLimitConfig, RateLimitError};
use crate::routes::app;
use crate::services::chat::ChatError;
use crate::state::test_helpers::{self, MockUpstream};

fn relay_request(query: &str, dev_user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(format!("/relay{query}"));
    if let Some(user) = dev_user {
        builder = builder.header("x-dev-user", user);
    }
    builder.body(Body::empty()).unwrap()
}

#[test]
fn parse_session_id_accepts_integers_only() {
    assert_eq!(parse_session_id(Some("42")), Some(42));
    assert_eq!(parse_session_id(Some(" 7 ")), Some(7));
    assert_eq!(parse_session_id(Some("")), None);
    assert_eq!(parse_session_id(Some("abc")), None);
    assert_eq!(parse_session_id(Some("1.5")), None);
    assert_eq!(parse_session_id(None), None);
}

#[test]
fn relay_errors_map_to_statuses() {
    assert_eq!(relay_error_to_status(RelayError::NotConfigured), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        relay_error_to_status(RelayError::RateLimited(RateLimitError::GlobalExceeded { limit: 1, window_secs: 60 })),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(relay_error_to_status(RelayError::Chat(ChatError::Forbidden(3))), StatusCode::FORBIDDEN);
    assert_eq!(relay_error_to_status(RelayError::Chat(ChatError::NotFound(3))), StatusCode::NOT_FOUND);
    assert_eq!(
        relay_error_to_status(RelayError::Upstream(LlmError::ApiResponse { status: 500, body: String::new() })),
        StatusCode::BAD_GATEWAY
    );
}

#[tokio::test]
async fn missing_session_id_is_bad_request_and_never_reaches_upstream() {
    let upstream = MockUpstream::new(vec!["data: [DONE]\n\n"]);
    let state = test_helpers::test_app_state_with_upstream(upstream.clone(), RateLimitConfig::default());

    let response = app(state.clone()).oneshot(relay_request("", Some("alice"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app(state).oneshot(relay_request("?sessionId=abc", Some("alice"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn relay_requires_credentials() {
    let upstream = MockUpstream::new(vec![]);
    let state = test_helpers::test_app_state_with_upstream(upstream.clone(), RateLimitConfig::default());

    let response = app(state).oneshot(relay_request("?sessionId=1", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn relay_without_upstream_is_unavailable() {
    let response = app(test_helpers::test_app_state())
        .oneshot(relay_request("?sessionId=1", Some("alice")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn relay_over_limit_is_too_many_requests() {
    let upstream = MockUpstream::new(vec![]);
    let limits = RateLimitConfig { global_limit: 0, ..RateLimitConfig::default() };
    let state = test_helpers::test_app_state_with_upstream(upstream.clone(), limits);

    let response = app(state).oneshot(relay_request("?sessionId=1", Some("alice"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(upstream.calls(), 0);
}
