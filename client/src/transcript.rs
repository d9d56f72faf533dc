//! Displayed conversation: persisted history plus the in-flight bot answer.

#[cfg(test)]
#[path = "transcript_test.rs"]
mod transcript_test;

use crate::api::{Message, Role};

/// One rendered turn. Streamed bot text has no database id yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayMessage {
    pub id: Option<i64>,
    pub role: Role,
    pub content: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<DisplayMessage>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the displayed turns with a session's persisted history.
    #[must_use]
    pub fn from_history(history: &[Message]) -> Self {
        Self {
            messages: history
                .iter()
                .map(|m| DisplayMessage { id: Some(m.id), role: m.role, content: m.content.clone() })
                .collect(),
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    #[must_use]
    pub fn last(&self) -> Option<&DisplayMessage> {
        self.messages.last()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(DisplayMessage { id: None, role: Role::User, content: content.into() });
    }

    pub fn push(&mut self, message: &Message) {
        self.messages.push(DisplayMessage {
            id: Some(message.id),
            role: message.role,
            content: message.content.clone(),
        });
    }

    /// Append a streamed chunk: extend the trailing bot message when it
    /// already has text, otherwise start a new bot message.
    pub fn apply_delta(&mut self, chunk: &str) {
        if let Some(last) = self.messages.last_mut() {
            if last.role == Role::Bot && !last.content.is_empty() {
                last.content.push_str(chunk);
                return;
            }
        }
        self.messages.push(DisplayMessage { id: None, role: Role::Bot, content: chunk.to_owned() });
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
