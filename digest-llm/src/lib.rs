//! LLM integration for the digest.
//!
//! This crate exposes a provider-neutral [`traits::LlmClient`] with clients
//! for the Anthropic Messages API and OpenAI-compatible chat completions, and
//! the [`summarizer::Summarizer`] that turns tweets into the digest text.
//!
//! # Examples
//! ```no_run
//! use digest_config::{LlmConfig, LlmProvider};
//! use digest_llm::{build_client, summarizer::Summarizer};
//!
//! # #[tokio::main]
//! # async fn main() -> digest_common::Result<()> {
//! let cfg = LlmConfig {
//!     provider: LlmProvider::Anthropic,
//!     api_key: "sk-ant-...".into(),
//!     base_url: None,
//!     model: "claude-haiku-4-5-20251001".into(),
//!     max_tokens: 2000,
//!     temperature: 0.3,
//! };
//! let summarizer = Summarizer::new(build_client(&cfg)?, cfg.max_tokens);
//! let digest = summarizer.summarize(&[]).await?;
//! println!("{digest}");
//! # Ok(())
//! # }
//! ```
pub mod anthropic;
pub mod openai;
pub mod summarizer;
pub mod traits;

use anthropic::AnthropicClient;
use digest_config::{LlmConfig, LlmProvider, DEFAULT_ANTHROPIC_MODEL};
use openai::OpenAiClient;
use std::sync::Arc;
use traits::LlmClient;

pub use summarizer::Summarizer;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Build the client for the configured provider.
pub fn build_client(config: &LlmConfig) -> digest_common::Result<Arc<dyn LlmClient>> {
    let base = config.base_url.as_deref().filter(|b| !b.trim().is_empty());
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Anthropic => Arc::new(AnthropicClient::new(
            config.api_key.clone(),
            config.model.clone(),
            base,
        )?),
        LlmProvider::Openai => {
            // The config default names a Claude model; swap it when unchanged.
            let model = if config.model == DEFAULT_ANTHROPIC_MODEL {
                DEFAULT_OPENAI_MODEL.to_string()
            } else {
                config.model.clone()
            };
            Arc::new(OpenAiClient::new(config.api_key.clone(), model, base)?)
        }
    };
    tracing::info!(provider = ?config.provider, model = client.model_name(), "llm client ready");
    Ok(client)
}
