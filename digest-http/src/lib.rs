//! JSON-over-HTTP client shared by the Twitter, LLM and mail crates.
//!
//! - Per-request options: extra headers, [`Auth`], query params, timeout, retries
//! - Client-wide default headers and an optional proxy
//! - Retries network failures, 429 and 5xx with exponential backoff, honouring
//!   `Retry-After`
//! - Never logs secrets: authorization, cookie, api-key and csrf headers are
//!   redacted, and only the auth *kind* is recorded
//!
//! Example (no_run):
//! ```rust,no_run
//! # async fn demo() -> Result<(), digest_http::HttpError> {
//! let client = digest_http::HttpClient::new("https://api.example.com/")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", digest_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Set `DIGEST_HTTP_RAW=1` to log (redacted) response bodies at `debug` on the
//! `http.raw` target.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, Proxy, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

const RAW_ENV: &str = "DIGEST_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_LEN: usize = 500;
/// Longest server-requested wait we honour, in seconds.
const MAX_RETRY_AFTER_SECS: u64 = 120;

const SECRET_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-csrf-token",
];

fn raw_enabled() -> bool {
    matches!(
        std::env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for [`HttpError::Api`] errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Authentication strategies.
///
/// ```
/// use digest_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// assert_eq!(bearer.kind(), "bearer");
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// `Authorization: Bearer <token>`
    Bearer(&'a str),
    /// Custom header (e.g. Anthropic's `x-api-key`).
    Header { name: HeaderName, value: HeaderValue },
    None,
}

impl Auth<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Header { .. } => "header",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs.
///
/// ```
/// use digest_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(120)),
///     retries: Some(0),
///     ..Default::default()
/// };
/// assert!(!opts.allow_absolute);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

/// Builder for [`HttpClient`] when proxies or default headers are needed.
pub struct HttpClientBuilder {
    base: String,
    proxy: Option<String>,
    default_headers: HeaderMap,
    timeout: Duration,
    retries: usize,
}

impl HttpClientBuilder {
    /// Route every request through `proxy` (`http://`, `https://` or `socks5://`).
    pub fn proxy(mut self, proxy: Option<&str>) -> Self {
        self.proxy = proxy.map(str::to_string).filter(|p| !p.trim().is_empty());
        self
    }

    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn build(self) -> Result<HttpClient, HttpError> {
        let base = Url::parse(&self.base).map_err(|e| HttpError::Url(e.to_string()))?;
        let mut inner = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .default_headers(self.default_headers);
        if let Some(proxy) = &self.proxy {
            let proxy = Proxy::all(proxy).map_err(|e| HttpError::Build(format!("proxy: {e}")))?;
            inner = inner.proxy(proxy);
        }
        let inner = inner.build().map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(HttpClient {
            base,
            inner,
            default_timeout: self.timeout,
            max_retries: self.retries,
        })
    }
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Client anchored to `base` with a 30s timeout and two retries.
    ///
    /// Relative paths are joined onto `base`, so keep its trailing slash.
    pub fn new(base: &str) -> Result<Self, HttpError> {
        Self::builder(base).build()
    }

    pub fn builder(base: &str) -> HttpClientBuilder {
        HttpClientBuilder {
            base: base.to_string(),
            proxy: None,
            default_headers: HeaderMap::new(),
            timeout: Duration::from_secs(30),
            retries: 2,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// GET JSON with per-request options.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json::<(), T>(Method::GET, path, None, opts)
            .await
    }

    /// POST a JSON body with optional bearer auth.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let opts = RequestOpts {
            auth: bearer.map(Auth::Bearer),
            ..Default::default()
        };
        self.request_json(Method::POST, path, Some(body), opts).await
    }

    /// POST a JSON body with per-request options.
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::POST, path, Some(body), opts).await
    }

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    async fn request_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resolve(path, opts.allow_absolute)?;
        let body_bytes = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| HttpError::Build(format!("serialize body: {e}")))?;
        let bearer = match &opts.auth {
            Some(Auth::Bearer(tok)) => Some(sanitize_api_key(tok)?),
            _ => None,
        };
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");
        let req_id = next_request_id();

        let mut attempt = 0usize;
        loop {
            let mut rb = self
                .inner
                .request(method.clone(), url.clone())
                .timeout(timeout);
            if let Some(q) = &opts.query {
                let pairs: Vec<(&str, &str)> = q.iter().map(|(k, v)| (*k, v.as_ref())).collect();
                rb = rb.query(&pairs);
            }
            if let Some(bytes) = &body_bytes {
                rb = rb
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(bytes.clone());
            }
            if let Some(hdrs) = &opts.headers {
                rb = rb.headers(hdrs.clone());
            }
            match (&opts.auth, &bearer) {
                (Some(Auth::Bearer(_)), Some(tok)) => rb = rb.bearer_auth(tok),
                (Some(Auth::Header { name, value }), _) => rb = rb.header(name, value),
                _ => {}
            }

            tracing::debug!(
                req_id = %req_id,
                attempt = attempt + 1,
                max_retries,
                method = %method,
                host_path = %format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
                timeout_ms = timeout.as_millis() as u64,
                auth_kind,
                has_body = body_bytes.is_some(),
                "http.request.start"
            );

            let t0 = std::time::Instant::now();
            let sent = match rb.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let headers = resp.headers().clone();
                    resp.bytes().await.map(|b| (status, headers, b))
                }
                Err(err) => Err(err),
            };

            let (status, headers, bytes) = match sent {
                Ok(parts) => parts,
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = exponential(attempt);
                        tracing::warn!(
                            req_id = %req_id,
                            attempt,
                            max_retries,
                            backoff_ms = delay.as_millis() as u64,
                            message = %message,
                            "http.retrying.network"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(req_id = %req_id, message = %message, "http.network_error");
                    return Err(HttpError::Network(message));
                }
            };

            let request_id = headers
                .get("x-request-id")
                .or_else(|| headers.get("request-id"))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();
            let snippet = snip_body(&bytes);

            tracing::debug!(
                req_id = %req_id,
                %status,
                duration_ms = t0.elapsed().as_millis() as u64,
                body_len = bytes.len(),
                x_request_id = %request_id,
                rate_limit.remaining = ?headers.get("x-rate-limit-remaining").and_then(|v| v.to_str().ok()),
                "http.response"
            );
            if raw_enabled() {
                let text = String::from_utf8_lossy(&bytes[..bytes.len().min(RAW_MAX_BODY)]);
                tracing::debug!(
                    target: "http.raw",
                    %req_id,
                    headers = ?redact_headers(&headers),
                    body = %text,
                    "response"
                );
            }

            if status.is_success() {
                return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                    tracing::warn!(
                        req_id = %req_id,
                        serde_err = %e,
                        body_snippet = %snippet,
                        "http.response.decode_error"
                    );
                    HttpError::Decode(e.to_string(), snippet)
                });
            }

            let message = extract_error_message(&bytes);
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < max_retries {
                attempt += 1;
                let delay = retry_delay(status, &headers, attempt);
                tracing::warn!(
                    req_id = %req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms = delay.as_millis() as u64,
                    message = %message,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(
                req_id = %req_id,
                %status,
                message = %message,
                x_request_id = %request_id,
                "http.error"
            );
            return Err(HttpError::Api {
                status,
                message,
                request_id,
            });
        }
    }
}

fn next_request_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("r{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

fn exponential(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(10) as u32;
    Duration::from_millis(500u64.saturating_mul(1 << shift))
}

fn retry_delay(status: StatusCode, headers: &HeaderMap, attempt: usize) -> Duration {
    if let Some(secs) = retry_after_secs(headers) {
        return Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS));
    }
    let exp = exponential(attempt);
    if status == StatusCode::TOO_MANY_REQUESTS {
        exp.max(Duration::from_millis(1100))
    } else {
        exp
    }
}

fn retry_after_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if SECRET_HEADERS.contains(&key.to_ascii_lowercase().as_str()) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

/// Pull a human-readable message out of the error bodies we talk to.
fn extract_error_message(body: &[u8]) -> String {
    // OpenAI / Anthropic: {"error":{"message":"..."}}
    #[derive(Deserialize)]
    struct Nested {
        error: NestedDetail,
    }
    #[derive(Deserialize)]
    struct NestedDetail {
        message: String,
    }

    // Twitter: {"errors":[{"message":"..."}]}
    #[derive(Deserialize)]
    struct TwErrors {
        errors: Vec<TwErr>,
    }
    #[derive(Deserialize)]
    struct TwErr {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
    }

    // Resend and friends: {"message":"..."} / {"detail":"..."} / {"error":"..."}
    #[derive(Deserialize)]
    struct Flat {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(n) = serde_json::from_slice::<Nested>(body) {
        return n.error.message;
    }
    if let Ok(tw) = serde_json::from_slice::<TwErrors>(body) {
        if let Some(first) = tw.errors.into_iter().next() {
            if !first.message.is_empty() {
                return first.message;
            }
            if !first.detail.is_empty() {
                return first.detail;
            }
        }
    }
    if let Ok(m) = serde_json::from_slice::<Flat>(body) {
        for s in [m.message, m.detail, m.error] {
            if !s.is_empty() {
                return s;
            }
        }
    }
    snip_body(body)
}

fn snip_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() > SNIPPET_LEN {
        let mut snip: String = text.chars().take(SNIPPET_LEN).collect();
        snip.push_str("...");
        snip
    } else {
        text.into_owned()
    }
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }
    HeaderValue::from_str(&format!("Bearer {s}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_from_known_shapes() {
        let anthropic =
            br#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        assert_eq!(extract_error_message(anthropic), "invalid x-api-key");

        let twitter = br#"{"errors":[{"message":"Could not authenticate you","code":32}]}"#;
        assert_eq!(extract_error_message(twitter), "Could not authenticate you");

        let resend = br#"{"statusCode":422,"name":"validation_error","message":"Invalid `to` field"}"#;
        assert_eq!(extract_error_message(resend), "Invalid `to` field");

        assert_eq!(extract_error_message(b"bad gateway"), "bad gateway");
    }

    #[test]
    fn secret_headers_are_redacted() {
        let mut h = HeaderMap::new();
        h.insert("cookie", HeaderValue::from_static("auth_token=abc; ct0=def"));
        h.insert("x-api-key", HeaderValue::from_static("sk-ant"));
        h.insert("content-type", HeaderValue::from_static("application/json"));
        let red = redact_headers(&h);
        assert!(red.iter().all(|(_, v)| !v.contains("abc") && !v.contains("sk-ant")));
        assert!(red.contains(&("content-type".into(), "application/json".into())));
    }

    #[test]
    fn api_keys_are_trimmed_and_checked() {
        assert_eq!(sanitize_api_key(" 'sk-123\n' ").unwrap(), "sk-123");
        assert!(sanitize_api_key("sk-\u{00e9}").is_err());
    }

    #[test]
    fn retry_after_wins_over_backoff() {
        let mut h = HeaderMap::new();
        h.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(
            retry_delay(StatusCode::TOO_MANY_REQUESTS, &h, 1),
            Duration::from_secs(3)
        );
        assert_eq!(
            retry_delay(StatusCode::TOO_MANY_REQUESTS, &HeaderMap::new(), 1),
            Duration::from_millis(1100)
        );
        assert_eq!(
            retry_delay(StatusCode::BAD_GATEWAY, &HeaderMap::new(), 2),
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn huge_retry_after_is_capped() {
        let mut h = HeaderMap::new();
        h.insert(RETRY_AFTER, HeaderValue::from_static("86400"));
        assert_eq!(
            retry_delay(StatusCode::SERVICE_UNAVAILABLE, &h, 1),
            Duration::from_secs(MAX_RETRY_AFTER_SECS)
        );
    }

    #[test]
    fn long_bodies_are_snipped_on_char_boundaries() {
        let body = "推".repeat(600);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert_eq!(snip.chars().count(), SNIPPET_LEN + 3);
    }
}
