//! Twitter/X integration surface.
//!
//! Requests go to the web GraphQL API with the session cookies of a logged-in
//! browser (`auth_token` + `ct0`). Rate limits are whatever the account gets;
//! 429s are retried by `digest-http`.
pub mod client;
pub mod cookies;
pub mod extract;
pub mod fetcher;
pub mod threads;
pub mod types;

pub use client::TwitterApi;
pub use cookies::CookieJar;
pub use fetcher::{within_cutoff, AccountTweets, FetchOptions, TweetFetcher};
