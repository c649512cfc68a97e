//! Common types and utilities shared across the digest crates.
//!
//! This crate defines the tweet records that flow through one run, the fetch
//! statistics that accompany them, logging initialisation, and the shared
//! error type. It stays dependency-light so every crate can depend on it.
//!
//! # Overview
//!
//! - [`Tweet`]: one fetched (or fabricated) tweet, immutable once built
//! - [`FetchStats`]: per-run counters reported in the email and stats file
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`DigestError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use digest_common::{FetchStats, Tweet};
//!
//! let tweet = Tweet::new("karpathy", "1", "new tutorial is up");
//! assert_eq!(tweet.url, "https://twitter.com/karpathy/status/1");
//!
//! let mut stats = FetchStats::default();
//! stats.record_success(3);
//! assert_eq!(stats.total_tweets, 3);
//! ```
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub mod observability;

/// A tweet collected for the digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    /// Status id as a decimal string.
    pub id: String,
    /// Handle of the author, without the leading `@`.
    pub author: String,
    pub text: String,
    /// Creation time; `None` when the upstream timestamp could not be parsed.
    pub created_at: Option<DateTime<Utc>>,
    pub likes: u64,
    pub retweets: u64,
    pub url: String,
    /// True when this record stands for a merged self-reply thread.
    #[serde(default)]
    pub is_thread: bool,
    #[serde(default)]
    pub thread_length: usize,
}

impl Tweet {
    pub fn new(author: impl Into<String>, id: impl Into<String>, text: impl Into<String>) -> Self {
        let author = author.into();
        let id = id.into();
        let url = status_url(&author, &id);
        Self {
            id,
            author,
            text: text.into(),
            created_at: None,
            likes: 0,
            retweets: 0,
            url,
            is_thread: false,
            thread_length: 0,
        }
    }

    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn with_metrics(mut self, likes: u64, retweets: u64) -> Self {
        self.likes = likes;
        self.retweets = retweets;
        self
    }

    /// Age relative to `now`, if the creation time is known.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.created_at.map(|at| now - at)
    }
}

/// Canonical status URL for a tweet.
pub fn status_url(author: &str, id: &str) -> String {
    format!("https://twitter.com/{author}/status/{id}")
}

/// Counters for one fetch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchStats {
    pub total_accounts: usize,
    pub successful_accounts: usize,
    pub failed_accounts: usize,
    pub total_tweets: usize,
    #[serde(default)]
    pub filtered_old_tweets: usize,
    #[serde(default)]
    pub threads_detected: usize,
    /// One `@handle: message` line per failed account.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl FetchStats {
    pub fn record_success(&mut self, tweets: usize) {
        self.successful_accounts += 1;
        self.total_tweets += tweets;
    }

    pub fn record_failure(&mut self, handle: &str, error: impl std::fmt::Display) {
        self.failed_accounts += 1;
        self.errors.push(format!("@{handle}: {error}"));
    }

    /// Success rate in percent, `None` when no account was attempted.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total_accounts > 0)
            .then(|| self.successful_accounts as f64 / self.total_accounts as f64 * 100.0)
    }
}

/// Error types used across the digest pipeline.
#[derive(thiserror::Error, Debug)]
pub enum DigestError {
    /// Configuration or credentials were incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Talking to Twitter/X failed.
    #[error("Twitter error: {0}")]
    Twitter(String),

    /// The LLM call failed or returned nothing usable.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Mail delivery failed.
    #[error("Mail error: {0}")]
    Mail(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenient alias for results that use [`DigestError`].
pub type Result<T> = std::result::Result<T, DigestError>;
