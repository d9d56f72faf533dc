//! Transcript page — `GET /sessions/{id}` renders a session as HTML.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use client::api::{Message, UNTITLED_SESSION};
use client::markdown::{escape_html, render_message_html};

use crate::routes::auth::AuthUser;
use crate::routes::rpc::chat_error_to_status;
use crate::services::chat;
use crate::state::AppState;

const PAGE_STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
.message{padding:.75rem 1rem;border-radius:.5rem;margin:.75rem 0}\
.message--user{background:#eef2ff}.message--bot{background:#f4f4f5}\
.message__role{font-size:.75rem;text-transform:uppercase;color:#71717a}\
pre{overflow-x:auto;padding:.75rem;background:#18181b;color:#fafafa;border-radius:.375rem}";

/// Render a full HTML document for one session.
#[must_use]
pub fn render_transcript_page(title: &str, messages: &[Message]) -> String {
    let title = escape_html(title);
    let mut out = String::with_capacity(1024 + messages.iter().map(|m| m.content.len() * 2).sum::<usize>());
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{title}</title>\n<style>{PAGE_STYLE}</style>\n</head>\n<body>\n"));
    out.push_str(&format!("<h1>{title}</h1>\n<main class=\"transcript\">\n"));

    if messages.is_empty() {
        out.push_str("<p class=\"transcript__empty\">No messages yet.</p>\n");
    }
    for message in messages {
        let role = message.role.as_str();
        out.push_str(&format!(
            "<article class=\"message message--{role}\" id=\"message-{}\">\n<div class=\"message__role\">{role}</div>\n",
            message.id
        ));
        out.push_str(&render_message_html(message.role, &message.content));
        out.push_str("</article>\n");
    }

    out.push_str("</main>\n</body>\n</html>\n");
    out
}

/// `GET /sessions/{id}` — server-rendered transcript for the session owner.
pub async fn transcript_page(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<Html<String>, StatusCode> {
    let session = chat::require_owner(&state.pool, &auth.identity, session_id)
        .await
        .map_err(chat_error_to_status)?;
    let messages = chat::list_messages(&state.pool, session_id)
        .await
        .map_err(chat_error_to_status)?;
    tracing::debug!(session_id = session.id, updated_at = %session.updated_at, count = messages.len(), "rendering transcript");

    let title = session.name.as_deref().unwrap_or(UNTITLED_SESSION);
    Ok(Html(render_transcript_page(title, &messages)))
}

#[cfg(test)]
#[path = "transcript_test.rs"]
mod tests;
