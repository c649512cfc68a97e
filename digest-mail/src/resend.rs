use async_trait::async_trait;
use digest_common::{DigestError, Result};
use digest_config::EmailConfig;
use digest_http::HttpClient;
use serde::{Deserialize, Serialize};

use crate::{Mailer, OutgoingEmail};

pub const RESEND_API_BASE: &str = "https://api.resend.com/";

/// Sends through the Resend HTTP API.
pub struct ResendMailer {
    client: HttpClient,
    api_key: String,
    from: String,
    to: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

impl ResendMailer {
    pub fn from_config(cfg: &EmailConfig) -> Result<Self> {
        Self::with_base(RESEND_API_BASE, cfg)
    }

    pub fn with_base(base: &str, cfg: &EmailConfig) -> Result<Self> {
        let api_key = cfg
            .resend_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DigestError::Config("email.resend_api_key is required for Resend".into()))?;
        // Mail is not idempotent; a retried POST could deliver twice.
        let client = HttpClient::new(base)
            .map_err(|e| DigestError::Mail(format!("HttpClient init failed: {e}")))?
            .with_retries(0);
        Ok(Self {
            client,
            api_key,
            from: cfg.from_email.clone(),
            to: cfg.to_email.clone(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let body = SendRequest {
            from: &self.from,
            to: [&self.to],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };
        let resp: SendResponse = self
            .client
            .post_json("emails", Some(&self.api_key), &body)
            .await
            .map_err(|e| DigestError::Mail(format!("Resend: {e}")))?;
        tracing::info!(
            to = %self.to,
            id = resp.id.as_deref().unwrap_or("n/a"),
            "email sent via Resend"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "resend"
    }
}
