mod common;

use digest_common::{DigestError, Result};
use digest_config::{LlmConfig, LlmProvider};
use digest_llm::anthropic::AnthropicClient;
use digest_llm::openai::OpenAiClient;
use digest_llm::traits::{GenerateRequest, LlmClient, Message, StopReason};
use digest_llm::{build_client, Summarizer};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> GenerateRequest {
    GenerateRequest {
        system: Some("be brief".into()),
        messages: vec![Message::user("Say Ok")],
        max_tokens: 16,
        temperature: 0.3,
    }
}

#[tokio::test]
async fn anthropic_sends_version_and_key_and_reads_blocks() -> Result<()> {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-haiku-4-5-20251001",
            "system": "be brief",
            "max_tokens": 16,
            "messages": [{ "role": "user", "content": "Say Ok" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "model": "claude-haiku-4-5-20251001",
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "text", "text": "Ok" }
            ],
            "stop_reason": "max_tokens",
            "usage": { "input_tokens": 7, "output_tokens": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::new(
        "sk-ant-test".into(),
        "claude-haiku-4-5-20251001".into(),
        Some(&server.uri()),
    )?;
    let resp = client.generate(&request()).await?;
    assert_eq!(resp.text, "Ok");
    assert_eq!(resp.stop, StopReason::MaxTokens);
    assert_eq!(resp.tokens_used, Some(8));
    Ok(())
}

#[tokio::test]
async fn anthropic_auth_failure_is_an_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "type": "error",
            "error": { "type": "authentication_error", "message": "invalid x-api-key" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::new("bad".into(), "m".into(), Some(&server.uri())).unwrap();
    let err = client.generate(&request()).await.unwrap_err();
    assert!(matches!(err, DigestError::Llm(ref m) if m.contains("invalid x-api-key")));
}

#[tokio::test]
async fn openai_maps_length_to_max_tokens() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "messages": [
                { "role": "system", "content": "be brief" },
                { "role": "user", "content": "Say Ok" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "choices": [{ "message": { "role": "assistant", "content": "O" }, "finish_reason": "length" }],
            "usage": { "total_tokens": 12 }
        })))
        .mount(&server)
        .await;

    let client = OpenAiClient::new(
        "sk-test".into(),
        "gpt-4o-mini".into(),
        Some(&format!("{}/v1", server.uri())),
    )?;
    let resp = client.generate(&request()).await?;
    assert_eq!(resp.text, "O");
    assert_eq!(resp.stop, StopReason::MaxTokens);
    assert_eq!(resp.model.as_deref(), Some("gpt-4o-mini"));
    Ok(())
}

#[tokio::test]
async fn summarizer_over_anthropic_continues_once() -> Result<()> {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({ "messages": [{ "role": "user" }, { "role": "assistant" }, { "role": "user" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": " and the rest." }],
            "stop_reason": "end_turn"
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "## 📰 X 简报" }],
            "stop_reason": "max_tokens"
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let cfg = LlmConfig {
        provider: LlmProvider::Anthropic,
        api_key: "k".into(),
        base_url: Some(server.uri()),
        model: "claude-haiku-4-5-20251001".into(),
        max_tokens: 64,
        temperature: 0.3,
    };
    let summarizer = Summarizer::new(build_client(&cfg)?, cfg.max_tokens);
    let digest = summarizer.summarize(&[]).await?;
    assert_eq!(digest, "## 📰 X 简报and the rest.");
    Ok(())
}

#[tokio::test]
async fn openai_provider_replaces_the_claude_default_model() -> Result<()> {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "ok" }, "finish_reason": "stop" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = LlmConfig {
        provider: LlmProvider::Openai,
        api_key: "sk-test".into(),
        base_url: Some(format!("{}/v1", server.uri())),
        model: digest_config::DEFAULT_ANTHROPIC_MODEL.into(),
        max_tokens: 16,
        temperature: 0.3,
    };
    let client = build_client(&cfg)?;
    assert_eq!(client.model_name(), "gpt-4o-mini");
    assert_eq!(client.generate(&request()).await?.text, "ok");
    Ok(())
}
