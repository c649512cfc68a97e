//! Per-account fetching: lookup, timeline, filtering and thread merging.
use std::collections::HashMap;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use digest_common::{FetchStats, Result, Tweet};
use tracing::{debug, info, warn};

use super::client::TwitterApi;
use super::threads::{self, ThreadLinks};
use super::types::RawTweet;
use crate::source::{Collected, TweetSource};

/// Page size for the following list.
const FOLLOWING_PAGE: usize = 200;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub tweets_per_account: usize,
    /// Tweets older than this are dropped.
    pub max_age: Duration,
    /// Pause between accounts and between thread lookups.
    pub request_delay: StdDuration,
    pub merge_threads: bool,
    /// Upper bound on `TweetDetail` calls per account.
    pub max_thread_fetches: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            tweets_per_account: 5,
            max_age: Duration::hours(24),
            request_delay: StdDuration::from_secs(2),
            merge_threads: true,
            max_thread_fetches: 3,
        }
    }
}

/// What one account contributed.
#[derive(Debug, Clone, Default)]
pub struct AccountTweets {
    pub tweets: Vec<Tweet>,
    pub filtered_old: usize,
    pub threads: usize,
}

pub struct TweetFetcher {
    api: TwitterApi,
    opts: FetchOptions,
}

impl TweetFetcher {
    pub fn new(api: TwitterApi, opts: FetchOptions) -> Self {
        Self { api, opts }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.opts
    }

    /// Handles followed by `username`.
    pub async fn following_of(&self, username: &str) -> Result<Vec<String>> {
        let profile = self.api.user_by_screen_name(username).await?;
        self.api.following(&profile.id, FOLLOWING_PAGE).await
    }

    /// Recent original tweets of one account, threads merged when enabled.
    pub async fn fetch_account(&self, handle: &str, now: DateTime<Utc>) -> Result<AccountTweets> {
        info!(account = %handle, "fetching tweets");
        let profile = self.api.user_by_screen_name(handle).await?;
        let batch: Vec<RawTweet> = self
            .api
            .user_tweets(&profile.id, self.opts.tweets_per_account)
            .await?
            .into_iter()
            // The timeline may carry other authors' tweets inside conversation modules.
            .filter(|t| t.author_id.as_deref().is_none_or(|a| a == profile.id))
            .collect();

        let originals: Vec<Tweet> = batch
            .iter()
            .filter(|t| !t.is_retweet)
            .take(self.opts.tweets_per_account)
            .map(|t| t.to_tweet(handle))
            .collect();
        let (kept, filtered_old) = within_cutoff(originals, now, self.opts.max_age);
        if filtered_old > 0 {
            info!(account = %handle, filtered_old, "dropped tweets past the age cutoff");
        }

        let mut out = AccountTweets {
            tweets: kept,
            filtered_old,
            threads: 0,
        };
        if self.opts.merge_threads && !out.tweets.is_empty() {
            let resolved = self.resolve_threads(&profile.id, &batch).await;
            if !resolved.threads.is_empty() {
                out.threads = resolved.threads.len();
                out.tweets =
                    threads::merge_threads(handle, out.tweets, &resolved.threads, &resolved.links);
            }
        }
        info!(account = %handle, tweets = out.tweets.len(), "account done");
        Ok(out)
    }

    /// Fetch every handle in order. Failures are logged and counted.
    pub async fn fetch_accounts(&self, handles: &[String], now: DateTime<Utc>) -> Collected {
        let mut stats = FetchStats {
            total_accounts: handles.len(),
            ..Default::default()
        };
        let mut tweets = Vec::new();
        info!(accounts = handles.len(), "fetch started");

        for (i, handle) in handles.iter().enumerate() {
            if i > 0 && !self.opts.request_delay.is_zero() {
                tokio::time::sleep(self.opts.request_delay).await;
            }
            debug!(progress = %format!("{}/{}", i + 1, handles.len()), account = %handle);
            match self.fetch_account(handle, now).await {
                Ok(batch) => {
                    stats.record_success(batch.tweets.len());
                    stats.filtered_old_tweets += batch.filtered_old;
                    stats.threads_detected += batch.threads;
                    tweets.extend(batch.tweets);
                }
                Err(e) => {
                    warn!(account = %handle, error = %e, "fetch failed");
                    stats.record_failure(handle, &e);
                }
            }
        }

        info!(
            total = stats.total_accounts,
            ok = stats.successful_accounts,
            failed = stats.failed_accounts,
            tweets = stats.total_tweets,
            "fetch finished"
        );
        Collected { tweets, stats }
    }

    async fn resolve_threads(&self, author_id: &str, batch: &[RawTweet]) -> ResolvedThreads {
        let links = ThreadLinks::from_batch(batch);
        let mut resolved = HashMap::new();
        if links.is_empty() {
            return ResolvedThreads {
                links,
                threads: resolved,
            };
        }

        let roots = links.roots();
        info!(threads = roots.len(), "self-reply threads detected");
        if roots.len() > self.opts.max_thread_fetches {
            debug!(
                skipped = roots.len() - self.opts.max_thread_fetches,
                "thread lookup cap reached"
            );
        }
        for (i, root) in roots.iter().take(self.opts.max_thread_fetches).enumerate() {
            if i > 0 && !self.opts.request_delay.is_zero() {
                tokio::time::sleep(self.opts.request_delay).await;
            }
            let full = match self.api.tweet_detail(root).await {
                Ok(convo) => threads::thread_from_conversation(root, author_id, &convo),
                Err(e) => {
                    warn!(root = %root, error = %e, "thread lookup failed; stitching from timeline");
                    None
                }
            };
            if let Some(parts) = full.or_else(|| threads::thread_from_batch(root, batch, &links)) {
                debug!(root = %root, parts = parts.len(), "thread merged");
                resolved.insert(root.clone(), parts);
            }
        }
        ResolvedThreads {
            links,
            threads: resolved,
        }
    }
}

struct ResolvedThreads {
    links: ThreadLinks,
    threads: HashMap<String, Vec<String>>,
}

/// Keep tweets no older than `max_age`; tweets without a timestamp are kept.
/// Returns the survivors and how many were dropped.
pub fn within_cutoff(tweets: Vec<Tweet>, now: DateTime<Utc>, max_age: Duration) -> (Vec<Tweet>, usize) {
    let cutoff = now - max_age;
    let before = tweets.len();
    let kept: Vec<Tweet> = tweets
        .into_iter()
        .filter(|t| t.created_at.is_none_or(|at| at >= cutoff))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

#[async_trait]
impl TweetSource for TweetFetcher {
    async fn collect(&mut self, accounts: &[String], now: DateTime<Utc>) -> Result<Collected> {
        Ok(self.fetch_accounts(accounts, now).await)
    }

    fn name(&self) -> &'static str {
        "twitter"
    }
}
