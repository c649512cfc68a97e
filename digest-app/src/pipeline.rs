//! One digest run: collect → summarize → save → deliver → record.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use digest_common::FetchStats;
use digest_config::DigestConfig;
use digest_llm::Summarizer;
use digest_mail::{compose, subject_line, Mailer};
use digest_social::TweetSource;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Print the digest instead of mailing it.
    pub dry_run: bool,
    pub output_dir: PathBuf,
    /// Where to append run stats; `None` skips persistence.
    pub stats_file: Option<PathBuf>,
    pub subject_prefix: String,
}

impl RunOptions {
    /// Stats are never persisted for fixture runs.
    pub fn from_config(cfg: &DigestConfig, dry_run: bool, test_mode: bool) -> Self {
        let persist = cfg.monitoring.enable_stats && !test_mode;
        Self {
            dry_run,
            output_dir: cfg.output_dir.clone(),
            stats_file: persist.then(|| cfg.monitoring.stats_file.clone()),
            subject_prefix: cfg.email.subject_prefix.clone(),
        }
    }
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub digest: String,
    pub stats: FetchStats,
    pub digest_path: Option<PathBuf>,
    pub emailed: bool,
}

pub struct Pipeline {
    summarizer: Summarizer,
    mailer: Option<Box<dyn Mailer>>,
    opts: RunOptions,
}

impl Pipeline {
    pub fn new(summarizer: Summarizer, mailer: Option<Box<dyn Mailer>>, opts: RunOptions) -> Self {
        Self {
            summarizer,
            mailer,
            opts,
        }
    }

    pub async fn run(
        &self,
        source: &mut dyn TweetSource,
        accounts: &[String],
        now: DateTime<Local>,
    ) -> Result<RunReport> {
        banner(source.name(), now);

        info!(source = source.name(), accounts = accounts.len(), "step 1/3: collecting tweets");
        let collected = source
            .collect(accounts, now.with_timezone(&Utc))
            .await
            .context("collecting tweets")?;
        if collected.tweets.is_empty() {
            warn!("no tweets collected; the digest will say so");
        }

        info!(tweets = collected.tweets.len(), "step 2/3: summarizing");
        let digest = self
            .summarizer
            .summarize(&collected.tweets)
            .await
            .context("generating the digest")?;

        let digest_path = save_or_warn(&self.opts.output_dir, &digest, now);

        let mut emailed = false;
        if self.opts.dry_run {
            info!("dry run: printing digest instead of mailing");
            println!("{digest}");
        } else {
            let mailer = self
                .mailer
                .as_deref()
                .context("no mailer configured for a non-dry run")?;
            let subject = subject_line(&self.opts.subject_prefix, now.date_naive());
            info!(subject = %subject, via = mailer.name(), "step 3/3: sending email");
            let email = compose(&subject, &digest, Some(&collected.stats), now.naive_local());
            mailer.send(&email).await.context("sending the digest email")?;
            emailed = true;
        }

        if let Some(path) = &self.opts.stats_file {
            match crate::output::append_stats(path, &collected.stats, now) {
                Ok(()) => info!(path = %path.display(), "stats recorded"),
                Err(e) => warn!(path = %path.display(), error = %e, "could not record stats"),
            }
        }

        info!("{}", "=".repeat(60));
        info!("run complete");
        Ok(RunReport {
            digest,
            stats: collected.stats,
            digest_path,
            emailed,
        })
    }
}

fn save_or_warn(dir: &Path, digest: &str, now: DateTime<Local>) -> Option<PathBuf> {
    match crate::output::save_digest(dir, digest, now) {
        Ok(p) => {
            info!(path = %p.display(), "digest saved");
            Some(p)
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not save digest");
            None
        }
    }
}

fn banner(source: &str, now: DateTime<Local>) {
    info!("{}", "=".repeat(60));
    info!("tweet digest starting");
    if source == "fixtures" {
        info!("test mode: using sample tweets, full pipeline");
    }
    info!(at = %now.format("%Y-%m-%d %H:%M:%S"), "run time");
    info!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FixtureSource;
    use async_trait::async_trait;
    use digest_common::{DigestError, Tweet};
    use digest_config::DigestConfigLoader;
    use digest_llm::traits::{GenerateRequest, LlmClient, LlmResponse, StopReason};
    use digest_mail::OutgoingEmail;
    use digest_social::Collected;
    use std::sync::{Arc, Mutex};

    /// Answers every prompt with a fixed digest and keeps the prompts.
    #[derive(Default)]
    struct CannedLlm {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn generate(&self, req: &GenerateRequest) -> digest_common::Result<LlmResponse> {
            let prompt = req.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);
            Ok(LlmResponse {
                text: "## 📰 X 简报\n- **GPT-5.5** (@OpenAI)".into(),
                model: Some("canned".into()),
                stop: StopReason::EndTurn,
                tokens_used: None,
            })
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    #[derive(Clone, Default)]
    struct Outbox(Arc<Mutex<Vec<OutgoingEmail>>>);

    #[async_trait]
    impl Mailer for Outbox {
        async fn send(&self, email: &OutgoingEmail) -> digest_common::Result<()> {
            self.0.lock().unwrap().push(email.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "outbox"
        }
    }

    struct EmptySource;

    #[async_trait]
    impl TweetSource for EmptySource {
        async fn collect(&mut self, accounts: &[String], _now: DateTime<Utc>) -> digest_common::Result<Collected> {
            let mut stats = FetchStats {
                total_accounts: accounts.len(),
                ..Default::default()
            };
            for a in accounts {
                stats.record_failure(a, "user not found");
            }
            Ok(Collected {
                tweets: Vec::<Tweet>::new(),
                stats,
            })
        }

        fn name(&self) -> &'static str {
            "empty"
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl TweetSource for BrokenSource {
        async fn collect(&mut self, _: &[String], _: DateTime<Utc>) -> digest_common::Result<Collected> {
            Err(DigestError::Config("cookies rejected".into()))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn config(dir: &Path) -> DigestConfig {
        let yaml = format!(
            r#"
llm:
  api_key: sk-test
email:
  provider: resend
  resend_api_key: re_test
  from_email: digest@example.com
  to_email: me@example.com
output_dir: {out}
monitoring:
  stats_file: {stats}
"#,
            out = dir.join("output").display(),
            stats = dir.join("logs/stats.json").display(),
        );
        DigestConfigLoader::new().with_yaml_str(&yaml).load().unwrap()
    }

    fn pipeline(llm: Arc<CannedLlm>, outbox: Option<Outbox>, opts: RunOptions) -> Pipeline {
        let mailer = outbox.map(|o| Box::new(o) as Box<dyn Mailer>);
        Pipeline::new(Summarizer::new(llm, 500), mailer, opts)
    }

    #[tokio::test]
    async fn test_mode_mails_a_digest_without_persisting_stats() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let llm = Arc::new(CannedLlm::default());
        let outbox = Outbox::default();
        let p = pipeline(llm.clone(), Some(outbox.clone()), RunOptions::from_config(&cfg, false, true));

        let now = Local::now();
        let report = p
            .run(&mut FixtureSource, &FixtureSource::accounts(), now)
            .await
            .unwrap();

        assert!(!report.digest.is_empty());
        assert!(report.emailed);
        assert!(report.digest_path.unwrap().exists());
        assert!(!dir.path().join("logs/stats.json").exists());

        let sent = outbox.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].subject,
            format!("AI资讯日报 - {}", now.format("%Y年%m月%d日"))
        );
        assert!(sent[0].text.contains("本次抓取统计"));
        assert!(sent[0].html.contains("<strong>GPT-5.5</strong>"));

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("=== @GoogleDeepMind ==="));
    }

    #[tokio::test]
    async fn zero_tweets_still_produce_a_digest_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let llm = Arc::new(CannedLlm::default());
        let outbox = Outbox::default();
        let p = pipeline(llm.clone(), Some(outbox.clone()), RunOptions::from_config(&cfg, false, false));

        let accounts = vec!["ghost".to_string()];
        let report = p.run(&mut EmptySource, &accounts, Local::now()).await.unwrap();

        assert_eq!(report.stats.failed_accounts, 1);
        assert!(llm.prompts.lock().unwrap()[0].contains("没有抓取到任何推文"));
        assert!(outbox.0.lock().unwrap()[0].text.contains("@ghost: user not found"));

        let raw = std::fs::read_to_string(dir.path().join("logs/stats.json")).unwrap();
        let history: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["failed_accounts"], 1);
    }

    #[tokio::test]
    async fn dry_run_needs_no_mailer() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let p = pipeline(
            Arc::new(CannedLlm::default()),
            None,
            RunOptions::from_config(&cfg, true, true),
        );
        let report = p
            .run(&mut FixtureSource, &FixtureSource::accounts(), Local::now())
            .await
            .unwrap();
        assert!(!report.emailed);
    }

    #[tokio::test]
    async fn source_failure_aborts_before_the_llm() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let llm = Arc::new(CannedLlm::default());
        let p = pipeline(llm.clone(), Some(Outbox::default()), RunOptions::from_config(&cfg, false, false));

        let err = p.run(&mut BrokenSource, &[], Local::now()).await.unwrap_err();
        assert!(format!("{err:#}").contains("cookies rejected"));
        assert!(llm.prompts.lock().unwrap().is_empty());
    }
}
