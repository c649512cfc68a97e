//! Self-reply thread detection and merging.
//!
//! A thread is a chain of tweets where each one replies to the same author's
//! previous tweet. Within a timeline batch we link every self-reply to its
//! parent, resolve the root of each chain, and later replace the members of
//! a resolved thread with one merged record.
use std::collections::{HashMap, HashSet};

use digest_common::{status_url, Tweet};

use super::types::RawTweet;

const PART_SEPARATOR: &str = "\n---\n";

/// child id → parent id for every self-reply in the batch.
#[derive(Debug, Default, Clone)]
pub struct ThreadLinks {
    parent: HashMap<String, String>,
    /// Children in batch order, to keep root discovery deterministic.
    order: Vec<String>,
}

impl ThreadLinks {
    pub fn from_batch(batch: &[RawTweet]) -> Self {
        let authors: HashMap<&str, Option<&str>> = batch
            .iter()
            .map(|t| (t.id.as_str(), t.author_id.as_deref()))
            .collect();

        let mut links = Self::default();
        for t in batch {
            let Some(parent) = t.in_reply_to_status_id.as_deref() else {
                continue;
            };
            let replies_to_self = match (t.in_reply_to_user_id.as_deref(), t.author_id.as_deref()) {
                (Some(to), Some(me)) => to == me,
                // Without a reply-to user, trust a parent from the same batch.
                (None, Some(me)) => authors.get(parent).copied().flatten() == Some(me),
                _ => false,
            };
            if replies_to_self && links.parent.insert(t.id.clone(), parent.to_string()).is_none() {
                links.order.push(t.id.clone());
            }
        }
        links
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Follow parent links up to the first tweet that is not a self-reply.
    pub fn root_of<'a>(&'a self, id: &'a str) -> &'a str {
        let mut cur = id;
        let mut seen = HashSet::new();
        while let Some(p) = self.parent.get(cur) {
            if !seen.insert(cur) {
                break;
            }
            cur = p;
        }
        cur
    }

    /// Distinct thread roots, in the order their first reply appeared.
    pub fn roots(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.order
            .iter()
            .map(|child| self.root_of(child).to_string())
            .filter(|r| seen.insert(r.clone()))
            .collect()
    }

    /// `id` belongs to the thread rooted at `root`.
    pub fn in_thread(&self, id: &str, root: &str) -> bool {
        id == root || (self.parent.contains_key(id) && self.root_of(id) == root)
    }
}

/// Texts of the thread rooted at `root`, stitched from the batch alone.
///
/// Returns `None` unless at least two parts are available.
pub fn thread_from_batch(root: &str, batch: &[RawTweet], links: &ThreadLinks) -> Option<Vec<String>> {
    let mut parts: Vec<&RawTweet> = batch.iter().filter(|t| links.in_thread(&t.id, root)).collect();
    (parts.len() > 1).then(|| {
        sort_chronologically(&mut parts);
        parts.into_iter().map(|t| t.text.clone()).collect()
    })
}

/// Texts of the thread rooted at `root` from a `TweetDetail` conversation.
///
/// Starting at the root, a tweet joins when it is by `author_id`, replies to
/// the author, and its parent has already joined. The author's answers to
/// other people in the same conversation stay out.
pub fn thread_from_conversation(
    root: &str,
    author_id: &str,
    conversation: &[RawTweet],
) -> Option<Vec<String>> {
    let by_author: Vec<&RawTweet> = conversation
        .iter()
        .filter(|t| t.author_id.as_deref() == Some(author_id))
        .collect();

    let mut joined: HashSet<&str> = HashSet::from([root]);
    let mut parts: Vec<&RawTweet> = by_author.iter().copied().filter(|t| t.id == root).take(1).collect();
    loop {
        let before = joined.len();
        for &t in &by_author {
            if joined.contains(t.id.as_str()) {
                continue;
            }
            let to_author = t.in_reply_to_user_id.as_deref().is_none_or(|u| u == author_id);
            let parent_joined = t
                .in_reply_to_status_id
                .as_deref()
                .is_some_and(|p| joined.contains(p));
            if to_author && parent_joined {
                joined.insert(t.id.as_str());
                parts.push(t);
            }
        }
        if joined.len() == before {
            break;
        }
    }

    (parts.len() > 1).then(|| {
        sort_chronologically(&mut parts);
        parts.into_iter().map(|t| t.text.clone()).collect()
    })
}

fn sort_chronologically(parts: &mut [&RawTweet]) {
    // Snowflake ids grow with time; fall back to the timestamp when ids don't parse.
    parts.sort_by(|a, b| match (a.id.parse::<u64>(), b.id.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.created_time().cmp(&b.created_time()),
    });
}

/// Replace the members of each resolved thread with one merged tweet.
///
/// The merged record takes the place of the first member seen, points at the
/// root's URL and joins the parts with `---` lines.
pub fn merge_threads(
    handle: &str,
    tweets: Vec<Tweet>,
    threads: &HashMap<String, Vec<String>>,
    links: &ThreadLinks,
) -> Vec<Tweet> {
    if threads.is_empty() {
        return tweets;
    }
    let mut emitted = HashSet::new();
    let mut out = Vec::with_capacity(tweets.len());
    for tweet in tweets {
        let root = links.root_of(&tweet.id).to_string();
        let Some(parts) = threads.get(&root) else {
            out.push(tweet);
            continue;
        };
        if !emitted.insert(root.clone()) {
            continue;
        }
        out.push(Tweet {
            text: parts.join(PART_SEPARATOR),
            url: status_url(handle, &root),
            is_thread: true,
            thread_length: parts.len(),
            id: root,
            ..tweet
        });
    }
    out
}
