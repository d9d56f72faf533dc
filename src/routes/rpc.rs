//! RPC routes — authenticated JSON procedures over sessions and messages.
//!
//! Every procedure resolves the caller through [`AuthUser`] and checks
//! session ownership before touching a session. An absent `sessionId` is a
//! no-op for writes and an empty result for reads.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Json;
use client::api::{AddMessageRequest, CreateSessionRequest, CreateSessionResponse, Message, SessionRef, SessionSummary};

use crate::routes::auth::AuthUser;
use crate::services::chat::{self, ChatError};
use crate::state::AppState;

pub(crate) fn chat_error_to_status(err: ChatError) -> StatusCode {
    match err {
        ChatError::NotFound(_) => StatusCode::NOT_FOUND,
        ChatError::Forbidden(_) => StatusCode::FORBIDDEN,
        ChatError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ChatError::Database(e) => {
            tracing::error!(error = %e, "chat persistence failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, StatusCode> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(error = %rejection, "rpc request body rejected");
        StatusCode::BAD_REQUEST
    })
}

/// `GET /api/rpc/getSessions` — the caller's sessions, most recent first.
pub async fn get_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<SessionSummary>>, StatusCode> {
    let sessions = chat::list_sessions(&state.pool, auth.user_id())
        .await
        .map_err(chat_error_to_status)?;
    Ok(Json(sessions))
}

/// `POST /api/rpc/createSession` — new session plus its first user message.
pub async fn create_session(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<Json<CreateSessionResponse>, StatusCode> {
    let body = json_body(payload)?;
    let created = chat::create_session(&state.pool, auth.user_id(), &body.question)
        .await
        .map_err(chat_error_to_status)?;
    Ok(Json(created))
}

/// `POST /api/rpc/deleteSession` — delete one of the caller's sessions.
///
/// Deleting an absent or already-deleted session succeeds.
pub async fn delete_session(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<SessionRef>, JsonRejection>,
) -> Result<StatusCode, StatusCode> {
    let Some(session_id) = json_body(payload)?.session_id else {
        return Ok(StatusCode::NO_CONTENT);
    };

    match chat::require_owner(&state.pool, &auth.identity, session_id).await {
        Ok(_) => {}
        Err(ChatError::NotFound(_)) => return Ok(StatusCode::NO_CONTENT),
        Err(e) => return Err(chat_error_to_status(e)),
    }

    chat::delete_session(&state.pool, session_id)
        .await
        .map_err(chat_error_to_status)?;
    tracing::info!(%session_id, user_id = %auth.user_id(), "session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/rpc/deleteAllSessions` — delete every session the caller owns.
pub async fn delete_all_sessions(State(state): State<AppState>, auth: AuthUser) -> Result<StatusCode, StatusCode> {
    chat::delete_all_sessions(&state.pool, auth.user_id())
        .await
        .map_err(chat_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/rpc/getSessionMessages` — a session's messages in order.
pub async fn get_session_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<SessionRef>, JsonRejection>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    let Some(session_id) = json_body(payload)?.session_id else {
        return Ok(Json(Vec::new()));
    };

    chat::require_owner(&state.pool, &auth.identity, session_id)
        .await
        .map_err(chat_error_to_status)?;
    let messages = chat::list_messages(&state.pool, session_id)
        .await
        .map_err(chat_error_to_status)?;
    Ok(Json(messages))
}

/// `POST /api/rpc/addMessage` — append a turn to one of the caller's sessions.
pub async fn add_message(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<AddMessageRequest>, JsonRejection>,
) -> Result<StatusCode, StatusCode> {
    let body = json_body(payload)?;
    let Some(session_id) = body.session_id else {
        return Ok(StatusCode::NO_CONTENT);
    };

    chat::require_owner(&state.pool, &auth.identity, session_id)
        .await
        .map_err(chat_error_to_status)?;
    chat::add_message(&state.pool, session_id, body.role, &body.content)
        .await
        .map_err(chat_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "rpc_test.rs"]
mod tests;
