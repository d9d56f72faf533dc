use super::*;

#[test]
fn role_parse_accepts_known_values() {
    assert_eq!(Role::parse("user"), Some(Role::User));
    assert_eq!(Role::parse("bot"), Some(Role::Bot));
    assert_eq!(Role::parse("assistant"), None);
    assert_eq!(Role::parse("USER"), None);
}

#[test]
fn role_serializes_lowercase() {
    assert_eq!(serde_json::to_value(Role::Bot).unwrap(), "bot");
    assert_eq!(Role::User.to_string(), "user");
}

#[test]
fn message_uses_camel_case_fields() {
    let msg = Message {
        id: 7,
        content: "hi".into(),
        session_id: 3,
        created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        role: Role::User,
    };
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["sessionId"], 3);
    assert_eq!(json["role"], "user");
    assert_eq!(json["createdAt"], "2023-11-14T22:13:20Z");
}

#[test]
fn session_ref_accepts_missing_and_null_ids() {
    let missing: SessionRef = serde_json::from_str("{}").unwrap();
    let null: SessionRef = serde_json::from_str(r#"{"sessionId":null}"#).unwrap();
    let present: SessionRef = serde_json::from_str(r#"{"sessionId":12}"#).unwrap();
    assert_eq!(missing.session_id, None);
    assert_eq!(null.session_id, None);
    assert_eq!(present.session_id, Some(12));
}

#[test]
fn add_message_rejects_unknown_role() {
    let result = serde_json::from_str::<AddMessageRequest>(r#"{"sessionId":1,"role":"system","content":"x"}"#);
    assert!(result.is_err());
}
