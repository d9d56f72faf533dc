//! Relay route — `GET /relay?sessionId=<id>` streams a completion as SSE.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::llm::LlmError;
use crate::routes::auth::AuthUser;
use crate::routes::rpc::chat_error_to_status;
use crate::services::relay::{self, RelayError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RelayQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Parse the raw `sessionId` query value.
pub(crate) fn parse_session_id(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

pub(crate) fn relay_error_to_status(err: RelayError) -> StatusCode {
    match err {
        RelayError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        RelayError::RateLimited(e) => {
            tracing::info!(error = %e, "relay rate limited");
            StatusCode::TOO_MANY_REQUESTS
        }
        RelayError::Chat(e) => chat_error_to_status(e),
        RelayError::Upstream(e) => {
            match &e {
                LlmError::ApiResponse { status, body } => {
                    tracing::error!(%status, %body, "upstream returned error status");
                }
                other => tracing::error!(error = %other, "upstream request failed"),
            }
            StatusCode::BAD_GATEWAY
        }
    }
}

/// `GET /relay?sessionId=<id>` — pass the upstream event stream through.
pub async fn relay(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RelayQuery>,
) -> Result<Response, StatusCode> {
    let Some(session_id) = parse_session_id(query.session_id.as_deref()) else {
        return Err(StatusCode::BAD_REQUEST);
    };

    let stream = relay::open_relay(&state, &auth.identity, session_id)
        .await
        .map_err(relay_error_to_status)?;

    let mut response = Body::from_stream(stream).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(response)
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
