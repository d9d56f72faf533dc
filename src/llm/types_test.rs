use super::*;

#[test]
fn completion_request_serializes_wire_shape() {
    let request = ChatCompletionRequest {
        model: "gpt-3.5-turbo".into(),
        max_tokens: 1024,
        stream: true,
        messages: vec![
            ChatMessage::new(UpstreamRole::System, "persona"),
            ChatMessage::new(UpstreamRole::User, "hi"),
            ChatMessage::new(UpstreamRole::Assistant, "hello"),
        ],
    };

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "model": "gpt-3.5-turbo",
            "max_tokens": 1024,
            "stream": true,
            "messages": [
                { "role": "system", "content": "persona" },
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" }
            ]
        })
    );
}

#[test]
fn api_response_error_display_omits_body() {
    let err = LlmError::ApiResponse { status: 429, body: "secret detail".into() };
    assert_eq!(err.to_string(), "API response error: status 429");
}

#[test]
fn missing_api_key_names_variable() {
    let err = LlmError::MissingApiKey { var: "OPENAI_API_KEY".into() };
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}
