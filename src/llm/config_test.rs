use super::*;

/// # Safety
/// Tests must run with `--test-threads=1` to avoid env races.
unsafe fn clear_llm_env() {
    unsafe {
        std::env::remove_var("LLM_API_KEY_ENV");
        std::env::remove_var("LLM_MODEL");
        std::env::remove_var("LLM_BASE_URL");
        std::env::remove_var("LLM_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("LLM_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("CHATRELAY_TEST_KEY");
    }
}

// Env mutations are serialized through one test so parallel runs stay stable.
#[test]
fn from_env_defaults_overrides_and_missing_key() {
    unsafe {
        clear_llm_env();
        std::env::set_var("OPENAI_API_KEY", "sk-default");
    }
    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.api_key, "sk-default");
    assert_eq!(cfg.model, DEFAULT_LLM_MODEL);
    assert_eq!(cfg.base_url, DEFAULT_LLM_BASE_URL);
    assert_eq!(
        cfg.timeouts,
        LlmTimeouts { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    );

    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_API_KEY_ENV", "CHATRELAY_TEST_KEY");
        std::env::set_var("CHATRELAY_TEST_KEY", "sk-test");
        std::env::set_var("LLM_MODEL", "gpt-4o-mini");
        std::env::set_var("LLM_BASE_URL", "https://example.test/v1/");
        std::env::set_var("LLM_REQUEST_TIMEOUT_SECS", "42");
        std::env::set_var("LLM_CONNECT_TIMEOUT_SECS", "7");
    }
    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.api_key, "sk-test");
    assert_eq!(cfg.model, "gpt-4o-mini");
    assert_eq!(cfg.base_url, "https://example.test/v1");
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 42, connect_secs: 7 });

    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_API_KEY_ENV", "CHATRELAY_TEST_KEY");
    }
    let err = LlmConfig::from_env().unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { ref var } if var == "CHATRELAY_TEST_KEY"));

    unsafe {
        std::env::set_var("CHATRELAY_TEST_KEY", "   ");
    }
    assert!(matches!(LlmConfig::from_env(), Err(LlmError::MissingApiKey { .. })));

    unsafe { clear_llm_env() };
}
