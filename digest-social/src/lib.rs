//! Social network clients used by the digest.
//!
//! Only Twitter/X is implemented: a cookie-authenticated GraphQL client, the
//! timeline extraction helpers, and the [`twitter::TweetFetcher`] that turns a
//! list of handles into [`digest_common::Tweet`] records.
pub mod source;
pub mod twitter;

pub use source::{Collected, TweetSource};
