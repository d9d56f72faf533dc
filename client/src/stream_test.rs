use super::*;
use crate::api::Role;

fn delta_payload(text: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "choices": [{ "index": 0, "delta": { "content": text }, "finish_reason": null }]
    })
    .to_string()
}

// =============================================================================
// parse_event_data
// =============================================================================

#[test]
fn parse_done_sentinel() {
    assert_eq!(parse_event_data("[DONE]").unwrap(), Some(StreamEvent::Done));
    assert_eq!(parse_event_data(" [DONE]\n").unwrap(), Some(StreamEvent::Done));
}

#[test]
fn parse_delta_content() {
    assert_eq!(parse_event_data(&delta_payload("Hel")).unwrap(), Some(StreamEvent::Delta("Hel".into())));
}

#[test]
fn parse_role_only_chunk_has_no_event() {
    let payload = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
    assert_eq!(parse_event_data(payload).unwrap(), None);
}

#[test]
fn parse_empty_choices_has_no_event() {
    assert_eq!(parse_event_data(r#"{"choices":[]}"#).unwrap(), None);
    assert_eq!(parse_event_data(&delta_payload("")).unwrap(), None);
}

#[test]
fn parse_malformed_payload_is_error() {
    assert!(matches!(parse_event_data("{not json"), Err(ParseError::InvalidJson(_))));
}

// =============================================================================
// TurnStream
// =============================================================================

#[test]
fn deltas_then_done_persist_assembled_answer() {
    let mut transcript = Transcript::new();
    transcript.push_user("hi");
    let mut turn = TurnStream::new();
    assert!(turn.open());

    assert_eq!(turn.feed(&delta_payload("Hel"), &mut transcript), TurnOutcome::Appended);
    assert_eq!(turn.feed(&delta_payload("lo"), &mut transcript), TurnOutcome::Appended);
    assert_eq!(turn.feed("[DONE]", &mut transcript), TurnOutcome::Persist("Hello".into()));
    assert_eq!(turn.state(), StreamState::Completing);
    assert!(turn.is_thinking());

    turn.finish();
    assert_eq!(turn.state(), StreamState::Closed);
    assert!(!turn.is_thinking());

    assert_eq!(transcript.messages().len(), 2);
    assert_eq!(transcript.last().unwrap().role, Role::Bot);
    assert_eq!(transcript.last().unwrap().content, "Hello");
}

#[test]
fn error_mid_stream_discards_partial_answer() {
    let mut transcript = Transcript::new();
    let mut turn = TurnStream::new();
    turn.open();

    turn.handle(StreamEvent::Delta("partial ".into()), &mut transcript);
    let outcome = turn.handle(StreamEvent::Error("connection reset".into()), &mut transcript);

    assert_eq!(
        outcome,
        TurnOutcome::Dropped { partial: "partial ".into(), reason: "connection reset".into() }
    );
    assert_eq!(turn.state(), StreamState::Closed);
    assert_eq!(turn.buffered(), "");
}

#[test]
fn events_after_close_are_ignored() {
    let mut transcript = Transcript::new();
    let mut turn = TurnStream::new();
    turn.open();
    turn.handle(StreamEvent::Error("boom".into()), &mut transcript);

    assert_eq!(turn.handle(StreamEvent::Delta("late".into()), &mut transcript), TurnOutcome::Ignored);
    assert_eq!(turn.handle(StreamEvent::Done, &mut transcript), TurnOutcome::Ignored);
    assert!(transcript.messages().is_empty());
}

#[test]
fn events_before_open_are_ignored() {
    let mut transcript = Transcript::new();
    let mut turn = TurnStream::new();
    assert_eq!(turn.feed(&delta_payload("early"), &mut transcript), TurnOutcome::Ignored);
    assert_eq!(turn.state(), StreamState::Idle);
    assert!(transcript.messages().is_empty());
}

#[test]
fn second_done_while_completing_is_ignored() {
    let mut transcript = Transcript::new();
    let mut turn = TurnStream::new();
    turn.open();
    turn.handle(StreamEvent::Delta("a".into()), &mut transcript);
    assert_eq!(turn.handle(StreamEvent::Done, &mut transcript), TurnOutcome::Persist("a".into()));
    assert_eq!(turn.handle(StreamEvent::Done, &mut transcript), TurnOutcome::Ignored);
}

#[test]
fn open_only_from_idle() {
    let mut turn = TurnStream::new();
    assert!(turn.open());
    assert!(!turn.open());
}

#[test]
fn malformed_and_empty_payloads_do_not_change_state() {
    let mut transcript = Transcript::new();
    let mut turn = TurnStream::new();
    turn.open();

    assert!(matches!(turn.feed("garbage", &mut transcript), TurnOutcome::Malformed(_)));
    assert_eq!(turn.feed(r#"{"choices":[{"delta":{}}]}"#, &mut transcript), TurnOutcome::Skipped);
    assert_eq!(turn.state(), StreamState::Streaming);
    assert!(transcript.messages().is_empty());
}

#[test]
fn done_without_deltas_persists_empty_answer() {
    let mut transcript = Transcript::new();
    let mut turn = TurnStream::new();
    turn.open();
    assert_eq!(turn.feed("[DONE]", &mut transcript), TurnOutcome::Persist(String::new()));
}
