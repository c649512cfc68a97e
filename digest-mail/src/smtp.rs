use async_trait::async_trait;
use digest_common::{DigestError, Result};
use digest_config::EmailConfig;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::{Mailer, OutgoingEmail};

/// Port that speaks TLS from the first byte instead of upgrading with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(cfg: &EmailConfig) -> Result<Self> {
        let server = cfg
            .smtp_server
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DigestError::Config("email.smtp_server is required for SMTP".into()))?;

        let builder = if cfg.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
        }
        .map_err(|e| DigestError::Mail(format!("SMTP relay {server}: {e}")))?
        .port(cfg.smtp_port);

        let builder = match (&cfg.smtp_username, &cfg.smtp_password) {
            (Some(user), Some(pass)) => {
                builder.credentials(Credentials::new(user.clone(), pass.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            transport: builder.build(),
            from: parse_mailbox("email.from_email", &cfg.from_email)?,
            to: parse_mailbox("email.to_email", &cfg.to_email)?,
        })
    }

    /// The MIME message as it would go on the wire.
    pub fn build_message(&self, email: &OutgoingEmail) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| DigestError::Mail(format!("building message: {e}")))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = self.build_message(email)?;
        let resp = self
            .transport
            .send(message)
            .await
            .map_err(|e| DigestError::Mail(format!("SMTP send failed: {e}")))?;
        tracing::info!(to = %self.to, code = %resp.code(), "email sent via SMTP");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

pub(crate) fn parse_mailbox(field: &str, raw: &str) -> Result<Mailbox> {
    raw.trim()
        .parse::<Mailbox>()
        .map_err(|e| DigestError::Config(format!("{field} `{raw}` is not a valid address: {e}")))
}
