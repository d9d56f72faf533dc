//! Relay event-stream consumer.
//!
//! DESIGN
//! ======
//! One [`TurnStream`] exists per conversation turn. It moves through
//! `Idle -> Streaming -> Completing -> Closed` (or `Streaming -> Closed` on
//! error) and folds typed [`StreamEvent`]s into an accumulator and the
//! displayed [`Transcript`].
//!
//! ERROR HANDLING
//! ==============
//! A connection error closes the turn and discards the accumulated answer.
//! Nothing is persisted and nothing is retried; the dropped text is handed
//! back in [`TurnOutcome::Dropped`] so a front end can show what was lost.

#[cfg(test)]
#[path = "stream_test.rs"]
mod stream_test;

use serde_json::Value;

use crate::transcript::Transcript;

/// Literal payload that terminates the upstream completion stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Typed view of one event received from the relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental answer text.
    Delta(String),
    /// The upstream sent the end-of-stream sentinel.
    Done,
    /// The connection failed before the sentinel arrived.
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("event payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Parse the `data` field of one server-sent event.
///
/// Returns `Ok(None)` for well-formed chunks that carry no text, such as the
/// role-only first chunk of a completion.
///
/// # Errors
///
/// Returns [`ParseError::InvalidJson`] when the payload is neither the
/// sentinel nor JSON.
pub fn parse_event_data(data: &str) -> Result<Option<StreamEvent>, ParseError> {
    let trimmed = data.trim();
    if trimmed == DONE_SENTINEL {
        return Ok(Some(StreamEvent::Done));
    }

    let root: Value = serde_json::from_str(trimmed)?;
    let chunk = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("");

    if chunk.is_empty() {
        return Ok(None);
    }
    Ok(Some(StreamEvent::Delta(chunk.to_owned())))
}

// =============================================================================
// STATE MACHINE
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// Created, connection not yet opened.
    Idle,
    /// Receiving deltas.
    Streaming,
    /// Sentinel received; the answer is being persisted.
    Completing,
    /// Finished or failed. Further events are ignored.
    Closed,
}

/// What the caller should do after an event has been applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Text was appended to the accumulator and the transcript.
    Appended,
    /// Persist this bot answer, then call [`TurnStream::finish`].
    Persist(String),
    /// The turn failed; `partial` was discarded.
    Dropped { partial: String, reason: String },
    /// A payload without text; nothing changed.
    Skipped,
    /// A payload that could not be parsed; nothing changed.
    Malformed(String),
    /// The event arrived outside `Streaming` and was ignored.
    Ignored,
}

#[derive(Debug)]
pub struct TurnStream {
    state: StreamState,
    buffer: String,
}

impl Default for TurnStream {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnStream {
    #[must_use]
    pub fn new() -> Self {
        Self { state: StreamState::Idle, buffer: String::new() }
    }

    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Text accumulated so far in this turn.
    #[must_use]
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// `true` while the "thinking" indicator should be shown.
    #[must_use]
    pub fn is_thinking(&self) -> bool {
        matches!(self.state, StreamState::Streaming | StreamState::Completing)
    }

    /// Mark the connection as open. Only valid from `Idle`.
    pub fn open(&mut self) -> bool {
        if self.state != StreamState::Idle {
            return false;
        }
        self.state = StreamState::Streaming;
        true
    }

    /// Parse a raw event payload and apply it.
    pub fn feed(&mut self, data: &str, transcript: &mut Transcript) -> TurnOutcome {
        match parse_event_data(data) {
            Ok(Some(event)) => self.handle(event, transcript),
            Ok(None) if self.state == StreamState::Streaming => TurnOutcome::Skipped,
            Ok(None) => TurnOutcome::Ignored,
            Err(e) if self.state == StreamState::Streaming => TurnOutcome::Malformed(e.to_string()),
            Err(_) => TurnOutcome::Ignored,
        }
    }

    /// Apply one typed event.
    pub fn handle(&mut self, event: StreamEvent, transcript: &mut Transcript) -> TurnOutcome {
        if self.state != StreamState::Streaming {
            return TurnOutcome::Ignored;
        }

        match event {
            StreamEvent::Delta(chunk) => {
                self.buffer.push_str(&chunk);
                transcript.apply_delta(&chunk);
                TurnOutcome::Appended
            }
            StreamEvent::Done => {
                self.state = StreamState::Completing;
                TurnOutcome::Persist(std::mem::take(&mut self.buffer))
            }
            StreamEvent::Error(reason) => {
                self.state = StreamState::Closed;
                TurnOutcome::Dropped { partial: std::mem::take(&mut self.buffer), reason }
            }
        }
    }

    /// Close the turn once the completed answer has been handed off.
    pub fn finish(&mut self) {
        if self.state == StreamState::Completing {
            self.state = StreamState::Closed;
        }
    }
}
