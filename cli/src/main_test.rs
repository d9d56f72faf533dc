use super::*;

fn ctx(token: Option<&str>, dev_user: Option<&str>) -> CliContext {
    CliContext {
        base_url: "http://127.0.0.1:3000/".to_owned(),
        token: token.map(ToOwned::to_owned),
        dev_user: dev_user.map(ToOwned::to_owned),
    }
}

#[test]
fn relay_url_carries_session_id() {
    assert_eq!(relay_url("http://localhost:3000/", 42), "http://localhost:3000/relay?sessionId=42");
    assert_eq!(relay_url("https://chat.example", 7), "https://chat.example/relay?sessionId=7");
}

#[test]
fn auth_headers_prefer_bearer_token() {
    let headers = auth_headers(&ctx(Some(" abc.def "), Some("alice"))).unwrap();
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc.def");
    assert!(headers.get(DEV_USER_HEADER).is_none());
}

#[test]
fn auth_headers_fall_back_to_dev_user() {
    let headers = auth_headers(&ctx(Some("  "), Some("alice"))).unwrap();
    assert_eq!(headers.get(DEV_USER_HEADER).unwrap(), "alice");
    assert!(headers.get(AUTHORIZATION).is_none());
}

#[test]
fn auth_headers_require_credentials() {
    assert!(matches!(auth_headers(&ctx(None, None)), Err(CliError::MissingCredentials)));
}

#[test]
fn drop_turn_reports_discarded_text() {
    let mut turn = TurnStream::new();
    let mut transcript = Transcript::new();
    turn.open();
    turn.feed(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#, &mut transcript);

    let error = drop_turn(&mut turn, &mut transcript, "connection reset".to_owned());
    assert!(matches!(
        error,
        CliError::AnswerDropped { ref reason, discarded: 3 } if reason == "connection reset"
    ));
}

#[test]
fn drop_turn_before_open_is_a_stream_error() {
    let mut turn = TurnStream::new();
    let mut transcript = Transcript::new();
    let error = drop_turn(&mut turn, &mut transcript, "refused".to_owned());
    assert!(matches!(error, CliError::Stream(ref reason) if reason == "refused"));
}

#[test]
fn cli_parses_ask_with_session() {
    let cli = Cli::try_parse_from(["chatrelay-cli", "--dev-user", "alice", "ask", "--session", "5", "what", "is", "rust"])
        .unwrap();
    assert_eq!(cli.dev_user.as_deref(), Some("alice"));
    match cli.command {
        Command::Ask { session, question } => {
            assert_eq!(session, Some(5));
            assert_eq!(question.join(" "), "what is rust");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

// =============================================================================
// rendering from the transcript
// =============================================================================

fn delta(text: &str) -> String {
    serde_json::json!({ "choices": [{ "delta": { "content": text } }] }).to_string()
}

#[test]
fn streamed_text_is_read_back_from_the_trailing_bot_message() {
    let mut transcript = Transcript::new();
    transcript.push_user("hi");
    let mut turn = TurnStream::new();
    turn.open();

    assert_eq!(unprinted(&transcript, 0), "");

    let mut printed = 0;
    let mut shown = String::new();
    for chunk in ["Hel", "lo", " there"] {
        assert_eq!(turn.feed(&delta(chunk), &mut transcript), TurnOutcome::Appended);
        let fresh = unprinted(&transcript, printed);
        assert_eq!(fresh, chunk);
        shown.push_str(fresh);
        printed += fresh.len();
    }

    assert_eq!(shown, "Hello there");
    assert_eq!(transcript.messages().len(), 2);
    assert_eq!(format_turn(transcript.last().unwrap()), "bot: Hello there");
}

#[test]
fn unprinted_ignores_trailing_user_turns() {
    let mut transcript = Transcript::new();
    transcript.apply_delta("old answer");
    transcript.push_user("next question");
    assert_eq!(unprinted(&transcript, 0), "");
}

#[test]
fn thinking_indicator_shows_once_and_clears_after_persist() {
    let mut indicator = ThinkingIndicator::default();
    let mut transcript = Transcript::new();
    let mut turn = TurnStream::new();

    assert_eq!(indicator.update(turn.is_thinking()), None);
    turn.open();
    assert_eq!(indicator.update(turn.is_thinking()), Some(ThinkingIndicator::SHOW));
    assert_eq!(indicator.update(turn.is_thinking()), None);

    assert!(matches!(turn.feed("[DONE]", &mut transcript), TurnOutcome::Persist(_)));
    assert_eq!(indicator.update(turn.is_thinking()), None);

    turn.finish();
    assert_eq!(indicator.update(turn.is_thinking()), Some(ThinkingIndicator::CLEAR));
}
