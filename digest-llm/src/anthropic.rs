use crate::traits::{GenerateRequest, LlmClient, LlmResponse, Message, StopReason};
use async_trait::async_trait;
use digest_common::{DigestError, Result};
use digest_http::{Auth, HttpClient, HttpError, RequestOpts};
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API (or a compatible gateway).
pub struct AnthropicClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl AnthropicClient {
    /// `base_url` replaces `https://api.anthropic.com` for proxies and gateways.
    pub fn new(api_key: String, model: String, base_url: Option<&str>) -> Result<Self> {
        let base = normalize_base(base_url.unwrap_or(ANTHROPIC_API_BASE));
        let client = HttpClient::builder(&base)
            .default_header(
                HeaderName::from_static("anthropic-version"),
                HeaderValue::from_static(ANTHROPIC_VERSION),
            )
            .timeout(Duration::from_secs(180))
            .build()
            .map_err(|e| DigestError::Llm(format!("HttpClient init failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn generate(&self, req: &GenerateRequest) -> Result<LlmResponse> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: req.max_tokens,
            system: req.system.as_deref(),
            messages: &req.messages,
            temperature: req.temperature,
        };
        let key = HeaderValue::from_str(self.api_key.trim())
            .map_err(|e| DigestError::Config(format!("invalid Anthropic API key: {e}")))?;
        let opts = RequestOpts {
            auth: Some(Auth::Header {
                name: HeaderName::from_static("x-api-key"),
                value: key,
            }),
            ..Default::default()
        };

        let resp: MessagesResponse = self
            .client
            .post_json_opts("v1/messages", &body, opts)
            .await
            .map_err(llm_err)?;

        let text = resp
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text.as_str())
            .collect::<String>();
        let stop = match resp.stop_reason.as_deref() {
            Some("max_tokens") => StopReason::MaxTokens,
            Some("end_turn") | Some("stop_sequence") | None => StopReason::EndTurn,
            Some(other) => StopReason::Other(other.to_string()),
        };
        tracing::debug!(model = ?resp.model, ?stop, "anthropic.messages.done");

        Ok(LlmResponse {
            text,
            model: resp.model,
            stop,
            tokens_used: resp.usage.map(|u| u.input_tokens + u.output_tokens),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Ensure a trailing slash so relative joins keep any path prefix.
pub(crate) fn normalize_base(base: &str) -> String {
    let trimmed = base.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

pub(crate) fn llm_err(e: HttpError) -> DigestError {
    DigestError::Llm(e.to_string())
}
