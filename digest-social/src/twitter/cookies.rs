//! Session cookies exported from a logged-in browser.
//!
//! Two export shapes are accepted:
//!
//! - a flat object, `{"auth_token": "...", "ct0": "...", ...}`
//! - the array written by cookie-export extensions,
//!   `[{"name": "ct0", "value": "...", "domain": ".x.com"}, ...]`
use digest_common::{DigestError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

const AUTH_TOKEN: &str = "auth_token";
const CSRF_COOKIE: &str = "ct0";

#[derive(Clone)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Export {
    Flat(BTreeMap<String, serde_json::Value>),
    List(Vec<ExportedCookie>),
}

#[derive(Deserialize)]
struct ExportedCookie {
    name: String,
    value: String,
    #[serde(default)]
    domain: Option<String>,
}

impl CookieJar {
    /// Read a cookie export; fails if the file is missing or lacks `auth_token`/`ct0`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DigestError::Config(format!("cannot read cookies file {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
            .map_err(|e| DigestError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let export: Export = serde_json::from_str(raw)
            .map_err(|e| DigestError::Config(format!("unrecognised cookie export: {e}")))?;

        let cookies: BTreeMap<String, String> = match export {
            Export::Flat(map) => map
                .into_iter()
                .filter_map(|(k, v)| match v {
                    serde_json::Value::String(s) => Some((k, s)),
                    serde_json::Value::Number(n) => Some((k, n.to_string())),
                    _ => None,
                })
                .collect(),
            Export::List(list) => list
                .into_iter()
                .filter(|c| c.domain.as_deref().is_none_or(is_twitter_domain))
                .map(|c| (c.name, c.value))
                .collect(),
        };

        for required in [AUTH_TOKEN, CSRF_COOKIE] {
            if cookies.get(required).is_none_or(|v| v.trim().is_empty()) {
                return Err(DigestError::Config(format!(
                    "cookie `{required}` is missing; export the cookies of a logged-in x.com session"
                )));
            }
        }
        Ok(Self { cookies })
    }

    /// Value for the `Cookie` request header.
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// The `ct0` cookie, echoed back as `x-csrf-token`.
    pub fn csrf_token(&self) -> &str {
        self.cookies
            .get(CSRF_COOKIE)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl std::fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJar")
            .field("names", &self.cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn is_twitter_domain(domain: &str) -> bool {
    let d = domain.trim_start_matches('.');
    d == "x.com" || d == "twitter.com" || d.ends_with(".x.com") || d.ends_with(".twitter.com")
}
