//! Chat service — session and message persistence.
//!
//! DESIGN
//! ======
//! Plain query functions over `sessions` and `messages`. Ownership is not
//! checked here: the boundary (RPC routes and the relay) calls
//! [`require_owner`] with the caller's verified [`Identity`] before invoking
//! any session-scoped query.
//!
//! ERROR HANDLING
//! ==============
//! Session creation, deletion and message appends each run in one
//! transaction, so an interrupted request never leaves a session without its
//! first message or messages without their session. Deleting an id that does
//! not exist is a no-op.

use chrono::{DateTime, Utc};
use client::api::{CreateSessionResponse, Message, Role, SessionSummary, UNTITLED_SESSION};
use futures::future::try_join_all;
use sqlx::{PgPool, Postgres, Transaction};

use crate::services::auth::Identity;

/// Session names are the first this-many characters of the first question.
pub const SESSION_NAME_CHARS: usize = 20;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    NotFound(i64),
    #[error("session {0} belongs to another user")]
    Forbidden(i64),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row returned from session lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub id: i64,
    pub name: Option<String>,
    pub user_id: String,
    pub updated_at: DateTime<Utc>,
}

type MessageTuple = (i64, String, i64, DateTime<Utc>, String);

fn message_from_row((id, content, session_id, created_at, role): MessageTuple) -> Result<Message, ChatError> {
    let role = Role::parse(&role)
        .ok_or_else(|| ChatError::Database(sqlx::Error::Decode(format!("unknown message role '{role}'").into())))?;
    Ok(Message { id, content, session_id, created_at, role })
}

/// Derive a session name from the first question, by characters.
#[must_use]
pub fn session_name(question: &str) -> String {
    question.chars().take(SESSION_NAME_CHARS).collect()
}

// =============================================================================
// AUTHORIZATION
// =============================================================================

/// Check that `identity` owns `session_id`, given the stored owner.
///
/// # Errors
///
/// Returns [`ChatError::NotFound`] when there is no owner (no such session)
/// and [`ChatError::Forbidden`] when another user owns it.
pub fn authorize(identity: &Identity, session_id: i64, owner: Option<&str>) -> Result<(), ChatError> {
    match owner {
        None => Err(ChatError::NotFound(session_id)),
        Some(owner) if owner == identity.user_id => Ok(()),
        Some(_) => Err(ChatError::Forbidden(session_id)),
    }
}

/// Look up the owner of `session_id` and [`authorize`] the caller.
///
/// # Errors
///
/// Returns the [`authorize`] errors, or a database error.
pub async fn require_owner(pool: &PgPool, identity: &Identity, session_id: i64) -> Result<SessionRow, ChatError> {
    let session = find_session(pool, session_id).await?;
    authorize(identity, session_id, session.as_ref().map(|s| s.user_id.as_str()))?;
    session.ok_or(ChatError::NotFound(session_id))
}

// =============================================================================
// SESSIONS
// =============================================================================

/// Load one session row.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_session(pool: &PgPool, session_id: i64) -> Result<Option<SessionRow>, ChatError> {
    let row = sqlx::query_as::<_, (i64, Option<String>, String, DateTime<Utc>)>(
        "SELECT id, name, user_id, updated_at FROM sessions WHERE id = $1",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, name, user_id, updated_at)| SessionRow { id, name, user_id, updated_at }))
}

/// List a user's sessions, most recently updated first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_sessions(pool: &PgPool, user_id: &str) -> Result<Vec<SessionSummary>, ChatError> {
    let rows = sqlx::query_as::<_, (i64, Option<String>)>(
        "SELECT id, name
         FROM sessions
         WHERE user_id = $1
         ORDER BY updated_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name)| SessionSummary { id, name: name.unwrap_or_else(|| UNTITLED_SESSION.to_owned()) })
        .collect())
}

/// Create a session together with its first user message.
///
/// # Errors
///
/// Returns [`ChatError::InvalidInput`] for a blank question, or a database
/// error if either insert fails (nothing is persisted in that case).
pub async fn create_session(pool: &PgPool, user_id: &str, question: &str) -> Result<CreateSessionResponse, ChatError> {
    if question.trim().is_empty() {
        return Err(ChatError::InvalidInput("question must not be empty".into()));
    }

    let mut tx = pool.begin().await?;
    let session_id: i64 = sqlx::query_scalar("INSERT INTO sessions (name, user_id) VALUES ($1, $2) RETURNING id")
        .bind(session_name(question))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    let message = insert_message(&mut tx, session_id, Role::User, question).await?;
    tx.commit().await?;

    tracing::info!(%session_id, %user_id, "session created");
    Ok(CreateSessionResponse { session_id, message })
}

/// Delete a session and its messages. Returns `false` if it did not exist.
///
/// # Errors
///
/// Returns a database error if either delete fails; the transaction is then
/// rolled back and nothing is removed.
pub async fn delete_session(pool: &PgPool, session_id: i64) -> Result<bool, ChatError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM messages WHERE session_id = $1")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;
    let removed = sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(session_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;

    Ok(removed > 0)
}

/// Delete every session owned by `user_id`. Returns how many were removed.
///
/// # Errors
///
/// Returns the first database error; sessions already deleted stay deleted.
pub async fn delete_all_sessions(pool: &PgPool, user_id: &str) -> Result<usize, ChatError> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    let removed = try_join_all(ids.into_iter().map(|id| delete_session(pool, id))).await?;
    let count = removed.into_iter().filter(|r| *r).count();

    tracing::info!(%user_id, count, "sessions cleared");
    Ok(count)
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Messages of a session in conversation order.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_messages(pool: &PgPool, session_id: i64) -> Result<Vec<Message>, ChatError> {
    let rows = sqlx::query_as::<_, MessageTuple>(
        "SELECT id, content, session_id, created_at, role
         FROM messages
         WHERE session_id = $1
         ORDER BY created_at ASC, id ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(message_from_row).collect()
}

/// Append a message and bump the session's `updated_at`.
///
/// # Errors
///
/// Returns a database error if the insert fails, including a foreign-key
/// violation when the session does not exist.
pub async fn add_message(pool: &PgPool, session_id: i64, role: Role, content: &str) -> Result<Message, ChatError> {
    let mut tx = pool.begin().await?;
    let message = insert_message(&mut tx, session_id, role, content).await?;
    sqlx::query("UPDATE sessions SET updated_at = now() WHERE id = $1")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(message)
}

async fn insert_message(
    tx: &mut Transaction<'_, Postgres>,
    session_id: i64,
    role: Role,
    content: &str,
) -> Result<Message, ChatError> {
    let row = sqlx::query_as::<_, MessageTuple>(
        "INSERT INTO messages (content, session_id, role)
         VALUES ($1, $2, $3)
         RETURNING id, content, session_id, created_at, role",
    )
    .bind(content)
    .bind(session_id)
    .bind(role.as_str())
    .fetch_one(&mut **tx)
    .await?;

    message_from_row(row)
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
