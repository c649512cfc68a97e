use crate::anthropic::{llm_err, normalize_base};
use crate::traits::{GenerateRequest, LlmClient, LlmResponse, Role, StopReason};
use async_trait::async_trait;
use digest_common::{DigestError, Result};
use digest_http::HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";

/// Client for OpenAI-compatible `chat/completions` endpoints.
pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u32,
}

impl OpenAiClient {
    /// `base_url` should include the version segment, e.g. `https://api.openai.com/v1`.
    pub fn new(api_key: String, model: String, base_url: Option<&str>) -> Result<Self> {
        let base = normalize_base(base_url.unwrap_or(OPENAI_API_BASE));
        let client = HttpClient::new(&base)
            .map_err(|e| DigestError::Llm(format!("HttpClient init failed: {e}")))?
            .with_timeout(Duration::from_secs(180));

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, req: &GenerateRequest) -> Result<LlmResponse> {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);
        if let Some(system) = &req.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.extend(req.messages.iter().map(|m| ChatMessage {
            role: match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &m.content,
        }));
        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
        };

        let resp: ChatResponse = self
            .client
            .post_json("chat/completions", Some(&self.api_key), &body)
            .await
            .map_err(llm_err)?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DigestError::Llm("response contained no choices".into()))?;
        let stop = match choice.finish_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            Some("stop") | None => StopReason::EndTurn,
            Some(other) => StopReason::Other(other.to_string()),
        };

        Ok(LlmResponse {
            text: choice.message.content.unwrap_or_default(),
            model: resp.model,
            stop,
            tokens_used: resp.usage.map(|u| u.total_tokens),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
