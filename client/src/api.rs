//! RPC request/response DTOs for the client/server boundary.
//!
//! DESIGN
//! ======
//! Field names are camelCase on the wire. Optional `session_id` inputs mirror
//! procedures that treat an absent id as "nothing to do" rather than an error.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shown for sessions persisted without a name.
pub const UNTITLED_SESSION: &str = "Untitled Session";

/// Author of a persisted message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Self::User),
            "bot" => Some(Self::Bot),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sidebar entry returned by `getSessions`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: i64,
    pub name: String,
}

/// A persisted conversation turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub content: String,
    pub session_id: i64,
    pub created_at: DateTime<Utc>,
    pub role: Role,
}

/// `createSession` input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub question: String,
}

/// `createSession` output: the new session and its persisted first message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: i64,
    pub message: Message,
}

/// Input for procedures scoped to one (possibly absent) session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    #[serde(default)]
    pub session_id: Option<i64>,
}

/// `addMessage` input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMessageRequest {
    #[serde(default)]
    pub session_id: Option<i64>,
    pub role: Role,
    pub content: String,
}
