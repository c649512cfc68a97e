use chrono::{DateTime, Utc};
use digest_common::{status_url, Tweet};
use serde::{Deserialize, Serialize};

use super::extract::parse_twitter_time;

/// The bits of a user lookup we need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Numeric `rest_id`.
    pub id: String,
    pub screen_name: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A tweet as it comes out of a GraphQL timeline, before filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTweet {
    pub id: String,
    pub author_id: Option<String>,
    pub author_handle: Option<String>,
    pub text: String,
    /// Twitter's `"Wed Oct 10 20:19:24 +0000 2018"` string.
    pub created_at: Option<String>,
    pub favorite_count: u64,
    pub retweet_count: u64,
    pub is_retweet: bool,
    pub in_reply_to_status_id: Option<String>,
    pub in_reply_to_user_id: Option<String>,
    pub conversation_id: Option<String>,
}

impl RawTweet {
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_twitter_time)
    }

    /// Normalise into the pipeline's record, attributed to `handle`.
    pub fn to_tweet(&self, handle: &str) -> Tweet {
        Tweet {
            id: self.id.clone(),
            author: handle.to_string(),
            text: self.text.clone(),
            created_at: self.created_time(),
            likes: self.favorite_count,
            retweets: self.retweet_count,
            url: status_url(handle, &self.id),
            is_thread: false,
            thread_length: 0,
        }
    }
}

/// `legacy` block of a GraphQL tweet result.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LegacyTweet {
    #[serde(default)]
    pub id_str: Option<String>,
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub favorite_count: u64,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub user_id_str: Option<String>,
    #[serde(default)]
    pub in_reply_to_status_id_str: Option<String>,
    #[serde(default)]
    pub in_reply_to_user_id_str: Option<String>,
    #[serde(default)]
    pub conversation_id_str: Option<String>,
    #[serde(default)]
    pub retweeted_status_result: Option<serde_json::Value>,
}
