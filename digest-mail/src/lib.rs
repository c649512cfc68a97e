//! Email delivery for the digest.
//!
//! The digest is Markdown; [`compose`] appends the fetch statistics and
//! renders an HTML alternative, and a [`Mailer`] delivers the result once.
//! Delivery failures are terminal for the run.
//!
//! ```
//! use chrono::NaiveDate;
//! use digest_common::FetchStats;
//! use digest_mail::{compose, subject_line};
//!
//! let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
//! let at = date.and_hms_opt(8, 0, 0).unwrap();
//! let email = compose(&subject_line("AI资讯日报", date), "## 今日重点", Some(&FetchStats::default()), at);
//! assert_eq!(email.subject, "AI资讯日报 - 2026年10月19日");
//! assert!(email.text.contains("本次抓取统计"));
//! assert!(email.html.contains("<h2>今日重点</h2>"));
//! ```
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use digest_common::{FetchStats, Result};
use digest_config::{EmailConfig, EmailProvider};

pub mod markdown;
pub mod resend;
pub mod smtp;
pub mod stats;

pub use markdown::markdown_to_html;
pub use resend::ResendMailer;
pub use smtp::SmtpMailer;
pub use stats::format_stats;

/// A rendered email ready to hand to a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    /// Markdown source, sent as the plain-text part.
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// `"{prefix} - YYYY年MM月DD日"`.
pub fn subject_line(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix} - {}", date.format("%Y年%m月%d日"))
}

/// Body = digest + optional stats appendix, in both Markdown and HTML.
pub fn compose(
    subject: &str,
    digest: &str,
    stats: Option<&FetchStats>,
    generated_at: NaiveDateTime,
) -> OutgoingEmail {
    let text = match stats {
        Some(s) => format!("{digest}\n\n{}", format_stats(s, generated_at)),
        None => digest.to_string(),
    };
    OutgoingEmail {
        subject: subject.to_string(),
        html: markdown_to_html(&text),
        text,
    }
}

/// Mailer for the configured provider.
pub fn build_mailer(cfg: &EmailConfig) -> Result<Box<dyn Mailer>> {
    let mailer: Box<dyn Mailer> = match cfg.provider {
        EmailProvider::Smtp => Box::new(SmtpMailer::from_config(cfg)?),
        EmailProvider::Resend => Box::new(ResendMailer::from_config(cfg)?),
    };
    tracing::debug!(provider = mailer.name(), "mailer ready");
    Ok(mailer)
}
