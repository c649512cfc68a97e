//! Pull tweets and users out of GraphQL timeline JSON.
//!
//! Timelines arrive as `instructions[]`, each `TimelineAddEntries` carrying
//! `entries[]`. An entry is either a single item (`content.itemContent`) or a
//! module (`content.items[].item.itemContent`, used for conversations). The
//! user timeline lives under `timeline_v2` or, in newer payloads, `timeline`.
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use super::types::{LegacyTweet, RawTweet, UserProfile};

const INSTRUCTION_POINTERS: &[&str] = &[
    "/data/user/result/timeline_v2/timeline/instructions",
    "/data/user/result/timeline/timeline/instructions",
    "/data/threaded_conversation_with_injections_v2/instructions",
];

/// Parse Twitter's `created_at`, falling back to `YYYY-mm-dd HH:MM:SS` (UTC).
///
/// ```
/// use digest_social::twitter::extract::parse_twitter_time;
///
/// let t = parse_twitter_time("Wed Oct 10 20:19:24 +0000 2018").unwrap();
/// assert_eq!(t.to_rfc3339(), "2018-10-10T20:19:24+00:00");
/// assert!(parse_twitter_time("yesterday").is_none());
/// ```
pub fn parse_twitter_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y") {
        return Some(t.with_timezone(&Utc));
    }
    let head = raw.get(..19)?;
    NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|n| n.and_utc())
}

/// Tweets of a user timeline or conversation, in payload order.
pub fn timeline_tweets(v: &Value) -> Vec<RawTweet> {
    item_contents(v)
        .filter(|ic| ic.get("itemType").and_then(Value::as_str) == Some("TimelineTweet"))
        .filter(|ic| ic.get("promotedMetadata").is_none())
        .filter_map(|ic| ic.pointer("/tweet_results/result"))
        .filter_map(tweet_from_result)
        .collect()
}

/// Handles of a following/followers timeline.
pub fn timeline_users(v: &Value) -> Vec<String> {
    item_contents(v)
        .filter(|ic| ic.get("itemType").and_then(Value::as_str) == Some("TimelineUser"))
        .filter_map(|ic| ic.pointer("/user_results/result"))
        .filter_map(screen_name)
        .collect()
}

/// Result of `UserByScreenName`; `None` when the account does not resolve.
pub fn user_profile(v: &Value) -> Option<UserProfile> {
    let user = v.pointer("/data/user/result")?;
    if user.get("__typename").and_then(Value::as_str) == Some("UserUnavailable") {
        return None;
    }
    let id = user.get("rest_id")?.as_str()?.to_string();
    let screen_name = screen_name(user)?;
    let name = user
        .pointer("/legacy/name")
        .or_else(|| user.pointer("/core/name"))
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(UserProfile {
        id,
        screen_name,
        name,
    })
}

/// Walk every `itemContent` in every entry of every add-entries instruction.
fn item_contents(v: &Value) -> impl Iterator<Item = &Value> {
    INSTRUCTION_POINTERS
        .iter()
        .filter_map(move |p| v.pointer(p))
        .filter_map(Value::as_array)
        .flatten()
        .filter(|ins| ins.get("type").and_then(Value::as_str) == Some("TimelineAddEntries"))
        .filter_map(|ins| ins.get("entries").and_then(Value::as_array))
        .flatten()
        .flat_map(entry_item_contents)
}

fn entry_item_contents(entry: &Value) -> Vec<&Value> {
    let Some(content) = entry.get("content") else {
        return Vec::new();
    };
    if let Some(ic) = content.get("itemContent") {
        return vec![ic];
    }
    content
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|it| it.pointer("/item/itemContent"))
                .collect()
        })
        .unwrap_or_default()
}

fn tweet_from_result(result: &Value) -> Option<RawTweet> {
    let result = match result.get("__typename").and_then(Value::as_str) {
        Some("TweetWithVisibilityResults") => result.get("tweet")?,
        Some("TweetTombstone") | Some("TweetUnavailable") => return None,
        _ => result,
    };

    let legacy: LegacyTweet = serde_json::from_value(result.get("legacy")?.clone()).ok()?;
    let id = result
        .get("rest_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or(legacy.id_str.clone())?;

    // Long posts keep their full body in `note_tweet`.
    let text = result
        .pointer("/note_tweet/note_tweet_results/result/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or(legacy.full_text);

    let author = result.pointer("/core/user_results/result");
    let author_id = legacy
        .user_id_str
        .or_else(|| author.and_then(|a| a.get("rest_id")).and_then(Value::as_str).map(str::to_string));

    Some(RawTweet {
        id,
        author_id,
        author_handle: author.and_then(screen_name),
        is_retweet: legacy.retweeted_status_result.is_some() || text.starts_with("RT @"),
        text,
        created_at: legacy.created_at,
        favorite_count: legacy.favorite_count,
        retweet_count: legacy.retweet_count,
        in_reply_to_status_id: legacy.in_reply_to_status_id_str,
        in_reply_to_user_id: legacy.in_reply_to_user_id_str,
        conversation_id: legacy.conversation_id_str,
    })
}

fn screen_name(user: &Value) -> Option<String> {
    user.pointer("/legacy/screen_name")
        .or_else(|| user.pointer("/core/screen_name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
