use std::borrow::Cow;

use digest_common::{DigestError, Result};
use digest_http::{Auth, HttpClient, HttpError, RequestOpts};
use reqwest::header::{HeaderName, HeaderValue, COOKIE};
use serde_json::{json, Value};

use super::cookies::CookieJar;
use super::extract;
use super::types::{RawTweet, UserProfile};

pub const GRAPHQL_BASE: &str = "https://x.com/i/api/graphql/";

/// Bearer token the x.com web client ships with; identifies the app, not the user.
const WEB_BEARER: &str = "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

/// GraphQL operations: (query id, operation name).
mod ops {
    pub const USER_BY_SCREEN_NAME: (&str, &str) = ("NimuplG1OB7Fd2btCLdBOw", "UserByScreenName");
    pub const USER_TWEETS: (&str, &str) = ("QWF3SzpHmykQHsQMixG0cg", "UserTweets");
    pub const TWEET_DETAIL: (&str, &str) = ("U0HTv-bAWTBYylwEMT7x5A", "TweetDetail");
    pub const FOLLOWING: (&str, &str) = ("2vUj-_Ek-UmBVDNtd8OnQA", "Following");
}

/// Thin client over the x.com web GraphQL endpoints used by the fetcher.
#[derive(Clone)]
pub struct TwitterApi {
    http: HttpClient,
}

impl TwitterApi {
    pub fn new(cookies: &CookieJar, proxy: Option<&str>, retries: usize) -> Result<Self> {
        Self::with_base(GRAPHQL_BASE, cookies, proxy, retries)
    }

    /// Same as [`TwitterApi::new`] against another base URL (mock servers).
    pub fn with_base(
        base: &str,
        cookies: &CookieJar,
        proxy: Option<&str>,
        retries: usize,
    ) -> Result<Self> {
        let mut builder = HttpClient::builder(base).proxy(proxy).retries(retries);
        for (name, value) in session_headers(cookies)? {
            builder = builder.default_header(name, value);
        }
        let http = builder.build().map_err(twitter_err)?;
        Ok(Self { http })
    }

    pub async fn user_by_screen_name(&self, handle: &str) -> Result<UserProfile> {
        let variables = json!({ "screen_name": handle, "withSafetyModeUserFields": true });
        let v = self.graphql(ops::USER_BY_SCREEN_NAME, &variables).await?;
        extract::user_profile(&v)
            .ok_or_else(|| DigestError::Twitter(format!("user @{handle} not found")))
    }

    /// Most recent tweets of `user_id`, newest first as the timeline returns them.
    pub async fn user_tweets(&self, user_id: &str, count: usize) -> Result<Vec<RawTweet>> {
        let variables = json!({
            "userId": user_id,
            "count": count,
            "includePromotedContent": false,
            "withQuickPromoteEligibilityTweetFields": false,
            "withVoice": true,
            "withV2Timeline": true,
        });
        let v = self.graphql(ops::USER_TWEETS, &variables).await?;
        Ok(extract::timeline_tweets(&v))
    }

    /// Every tweet of the conversation around `tweet_id`.
    pub async fn tweet_detail(&self, tweet_id: &str) -> Result<Vec<RawTweet>> {
        let variables = json!({
            "focalTweetId": tweet_id,
            "with_rux_injections": false,
            "includePromotedContent": false,
            "withCommunity": true,
            "withQuickPromoteEligibilityTweetFields": false,
            "withBirdwatchNotes": false,
            "withVoice": true,
            "withV2Timeline": true,
        });
        let v = self.graphql(ops::TWEET_DETAIL, &variables).await?;
        Ok(extract::timeline_tweets(&v))
    }

    /// Handles followed by `user_id` (first page only).
    pub async fn following(&self, user_id: &str, count: usize) -> Result<Vec<String>> {
        let variables = json!({
            "userId": user_id,
            "count": count,
            "includePromotedContent": false,
        });
        let v = self.graphql(ops::FOLLOWING, &variables).await?;
        Ok(extract::timeline_users(&v))
    }

    async fn graphql(&self, (query_id, op): (&str, &str), variables: &Value) -> Result<Value> {
        let path = format!("{query_id}/{op}");
        let opts = RequestOpts {
            auth: Some(Auth::Bearer(WEB_BEARER)),
            query: Some(vec![
                ("variables", Cow::Owned(variables.to_string())),
                ("features", Cow::Owned(features().to_string())),
            ]),
            ..Default::default()
        };
        tracing::debug!(op, "twitter.graphql");
        let v: Value = self.http.get_json(&path, opts).await.map_err(twitter_err)?;

        // GraphQL reports some failures with a 200 and no data.
        if v.get("data").is_none_or(Value::is_null) {
            let msg = v
                .pointer("/errors/0/message")
                .and_then(Value::as_str)
                .unwrap_or("response carried no data");
            return Err(DigestError::Twitter(format!("{op}: {msg}")));
        }
        Ok(v)
    }
}

fn session_headers(cookies: &CookieJar) -> Result<Vec<(HeaderName, HeaderValue)>> {
    let value = |s: &str| {
        HeaderValue::from_str(s)
            .map_err(|e| DigestError::Config(format!("cookie value is not a valid header: {e}")))
    };
    Ok(vec![
        (COOKIE, value(&cookies.header_value())?),
        (HeaderName::from_static("x-csrf-token"), value(cookies.csrf_token())?),
        (
            HeaderName::from_static("x-twitter-auth-type"),
            HeaderValue::from_static("OAuth2Session"),
        ),
        (
            HeaderName::from_static("x-twitter-active-user"),
            HeaderValue::from_static("yes"),
        ),
        (
            HeaderName::from_static("x-twitter-client-language"),
            HeaderValue::from_static("en"),
        ),
    ])
}

fn twitter_err(e: HttpError) -> DigestError {
    match e.status() {
        Some(s) if s.as_u16() == 401 || s.as_u16() == 403 => {
            DigestError::Twitter(format!("{e} (cookies expired or account locked?)"))
        }
        _ => DigestError::Twitter(e.to_string()),
    }
}

/// Feature switches the web client sends; the endpoints 400 when required ones are absent.
fn features() -> Value {
    json!({
        "rweb_tipjar_consumption_enabled": true,
        "responsive_web_graphql_exclude_directive_enabled": true,
        "verified_phone_label_enabled": false,
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "responsive_web_graphql_timeline_navigation_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "communities_web_enable_tweet_community_results_fetch": true,
        "c9s_tweet_anatomy_moderator_badge_enabled": true,
        "articles_preview_enabled": true,
        "tweetypie_unmention_optimization_enabled": true,
        "responsive_web_edit_tweet_api_enabled": true,
        "graphql_is_translatable_rweb_tweet_is_translatable_enabled": true,
        "view_counts_everywhere_api_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "responsive_web_twitter_article_tweet_consumption_enabled": true,
        "tweet_awards_web_tipping_enabled": false,
        "creator_subscriptions_quote_tweet_preview_enabled": false,
        "freedom_of_speech_not_reach_fetch_enabled": true,
        "standardized_nudges_misinfo": true,
        "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled": true,
        "rweb_video_timestamps_enabled": true,
        "longform_notetweets_rich_text_read_enabled": true,
        "longform_notetweets_inline_media_enabled": true,
        "responsive_web_enhance_cards_enabled": false,
        "hidden_profile_subscriptions_enabled": true,
        "highlights_tweets_tab_ui_enabled": true,
        "responsive_web_twitter_article_notes_tab_enabled": true,
        "subscriptions_verification_info_is_identity_verified_enabled": true,
        "subscriptions_verification_info_verified_since_enabled": true,
        "subscriptions_feature_can_gift_premium": true,
    })
}
