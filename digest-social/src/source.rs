use async_trait::async_trait;
use chrono::{DateTime, Utc};
use digest_common::{FetchStats, Result, Tweet};

/// Tweets gathered for one run plus the counters describing how it went.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub tweets: Vec<Tweet>,
    pub stats: FetchStats,
}

/// Where a run gets its tweets from: the live fetcher or a fixed sample set.
#[async_trait]
pub trait TweetSource: Send {
    /// Gather tweets for `accounts` as of `now`. Per-account failures belong in
    /// the returned stats; an `Err` aborts the run.
    async fn collect(&mut self, accounts: &[String], now: DateTime<Utc>) -> Result<Collected>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}
