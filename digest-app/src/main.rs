use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use digest_common::observability::{init_logging, LogConfig};
use digest_config::{DigestConfig, DigestConfigLoader, TwitterConfig};
use digest_llm::{build_client, Summarizer};
use digest_mail::build_mailer;
use digest_social::twitter::{CookieJar, FetchOptions, TweetFetcher, TwitterApi};
use fixtures::FixtureSource;
use pipeline::{Pipeline, RunOptions};

mod accounts;
mod fixtures;
mod output;
mod pipeline;

/// Daily digest of tracked Twitter/X accounts, summarized by an LLM and emailed.
#[derive(Debug, Parser)]
#[command(name = "tweet-digest", version, about)]
struct Cli {
    /// Path to the YAML configuration.
    #[arg(long, default_value = "config.yaml", env = "DIGEST_CONFIG")]
    config: std::path::PathBuf,

    /// Use built-in sample tweets instead of fetching; still summarizes and mails.
    #[arg(long)]
    test: bool,

    /// Print the digest instead of sending it.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Config first; nothing touches the network until it validates.
    let cfg: DigestConfig = DigestConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let log_file = cfg
        .monitoring
        .enable_logging
        .then(|| cfg.monitoring.log_file.clone());
    init_logging(LogConfig {
        app_name: "tweet-digest",
        log_file,
        ..LogConfig::default()
    })?;

    logged(execute(&cli, &cfg).await)
}

/// Fatal errors also go through `tracing`, so the log file records them.
fn logged<T>(res: Result<T>) -> Result<T> {
    if let Err(err) = &res {
        tracing::error!("run failed: {err:#}");
    }
    res
}

async fn execute(cli: &Cli, cfg: &DigestConfig) -> Result<()> {
    // 2) Clients.
    let summarizer = Summarizer::new(build_client(&cfg.llm)?, cfg.llm.max_tokens)
        .with_temperature(cfg.llm.temperature);
    let mailer = if cli.dry_run {
        None
    } else {
        Some(build_mailer(&cfg.email)?)
    };
    let pipeline = Pipeline::new(
        summarizer,
        mailer,
        RunOptions::from_config(cfg, cli.dry_run, cli.test),
    );

    // 3) Run.
    let now = Local::now();
    let report = if cli.test {
        pipeline
            .run(&mut FixtureSource, &FixtureSource::accounts(), now)
            .await?
    } else {
        let cookies = CookieJar::load(&cfg.twitter.cookies_file)?;
        let api = TwitterApi::new(
            &cookies,
            cfg.twitter.proxy.as_deref(),
            cfg.twitter.max_retries,
        )?;
        let mut fetcher = TweetFetcher::new(api, fetch_options(&cfg.twitter));
        let accounts = accounts::resolve_accounts(cfg, &fetcher).await;
        if accounts.is_empty() {
            tracing::warn!("no accounts configured; the digest will be empty");
        }
        pipeline.run(&mut fetcher, &accounts, now).await?
    };

    tracing::info!(
        tweets = report.stats.total_tweets,
        digest_chars = report.digest.chars().count(),
        emailed = report.emailed,
        saved = ?report.digest_path,
        "done"
    );
    Ok(())
}

fn fetch_options(tw: &TwitterConfig) -> FetchOptions {
    FetchOptions {
        tweets_per_account: tw.tweets_per_account as usize,
        max_age: chrono::Duration::hours(tw.max_age_hours() as i64),
        request_delay: Duration::from_secs(tw.request_delay_secs),
        merge_threads: tw.enable_thread_merging,
        max_thread_fetches: tw.max_thread_fetches,
    }
}
