//! Client-side chat logic shared by every front end.
//!
//! SYSTEM CONTEXT
//! ==============
//! The server renders transcripts with [`markdown`] and speaks the RPC DTOs in
//! [`api`]. Front ends (the terminal client today) consume the relay's event
//! stream with [`stream::TurnStream`], which reassembles completion deltas
//! into a [`transcript::Transcript`] and decides what gets persisted.

pub mod api;
pub mod markdown;
pub mod stream;
pub mod transcript;

pub use api::{Message, Role, SessionSummary};
pub use stream::{DONE_SENTINEL, StreamEvent, StreamState, TurnOutcome, TurnStream, parse_event_data};
pub use transcript::{DisplayMessage, Transcript};
