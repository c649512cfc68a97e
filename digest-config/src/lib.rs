//! Loader for the digest configuration: YAML + environment overlays.
//!
//! A config file looks like this (only `llm.api_key`, `email.from_email` and
//! `email.to_email` are mandatory, plus the credentials of the chosen mail
//! provider):
//!
//! ```yaml
//! llm:
//!   provider: anthropic
//!   api_key: "${ANTHROPIC_AUTH_TOKEN}"
//!   model: claude-haiku-4-5-20251001
//! email:
//!   provider: smtp
//!   from_email: digest@example.com
//!   to_email: me@example.com
//!   smtp_server: smtp.example.com
//!   smtp_port: 587
//!   smtp_username: digest@example.com
//!   smtp_password: "${SMTP_PASSWORD}"
//! twitter:
//!   tweets_per_account: 5
//!   max_tweet_age_days: 1
//!   proxy: http://127.0.0.1:7890
//! accounts_file: accounts.yaml
//! ```
//!
//! Precedence: `DIGEST__SECTION__KEY` environment variables override file
//! values, then `${VAR}` placeholders are expanded.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub mod accounts;
mod lenient;

pub use accounts::{load_accounts, normalize_handles, AccountsError};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-haiku-4-5-20251001";

#[derive(Debug, Clone, Deserialize)]
pub struct DigestConfig {
    pub llm: LlmConfig,
    pub email: EmailConfig,
    #[serde(default)]
    pub twitter: TwitterConfig,
    /// YAML list or plain-text file of handles to follow.
    #[serde(default)]
    pub accounts_file: Option<PathBuf>,
    /// Inline handles, used when no file or following list is configured.
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Anthropic,
    Openai,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    pub api_key: String,
    /// Endpoint root; the provider default is used when absent.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens", deserialize_with = "lenient::number")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature", deserialize_with = "lenient::number")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    #[default]
    Smtp,
    Resend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub provider: EmailProvider,
    pub from_email: String,
    pub to_email: String,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
    #[serde(default)]
    pub smtp_server: Option<String>,
    #[serde(default = "default_smtp_port", deserialize_with = "lenient::number")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub resend_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    #[serde(default = "default_tweets_per_account", deserialize_with = "lenient::number")]
    pub tweets_per_account: u32,
    #[serde(default = "default_max_age_days", deserialize_with = "lenient::number")]
    pub max_tweet_age_days: u32,
    /// Finer cutoff; wins over `max_tweet_age_days` when set.
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub max_tweet_age_hours: Option<u32>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_cookies_file")]
    pub cookies_file: PathBuf,
    #[serde(default = "default_request_delay", deserialize_with = "lenient::number")]
    pub request_delay_secs: u64,
    #[serde(default = "default_max_retries", deserialize_with = "lenient::number")]
    pub max_retries: usize,
    #[serde(default = "default_true", deserialize_with = "lenient::number")]
    pub enable_thread_merging: bool,
    #[serde(default = "default_max_thread_fetches", deserialize_with = "lenient::number")]
    pub max_thread_fetches: usize,
    /// When set, the accounts are taken from this user's following list.
    #[serde(default)]
    pub username: Option<String>,
}

impl TwitterConfig {
    /// Fetch cutoff in hours.
    pub fn max_age_hours(&self) -> u64 {
        self.max_tweet_age_hours
            .map(u64::from)
            .unwrap_or(u64::from(self.max_tweet_age_days) * 24)
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            tweets_per_account: default_tweets_per_account(),
            max_tweet_age_days: default_max_age_days(),
            max_tweet_age_hours: None,
            proxy: None,
            cookies_file: default_cookies_file(),
            request_delay_secs: default_request_delay(),
            max_retries: default_max_retries(),
            enable_thread_merging: true,
            max_thread_fetches: default_max_thread_fetches(),
            username: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_true", deserialize_with = "lenient::number")]
    pub enable_logging: bool,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_true", deserialize_with = "lenient::number")]
    pub enable_stats: bool,
    #[serde(default = "default_stats_file")]
    pub stats_file: PathBuf,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            log_file: default_log_file(),
            enable_stats: true,
            stats_file: default_stats_file(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_temperature() -> f32 {
    0.3
}
fn default_subject_prefix() -> String {
    "AI资讯日报".into()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_tweets_per_account() -> u32 {
    5
}
fn default_max_age_days() -> u32 {
    1
}
fn default_cookies_file() -> PathBuf {
    PathBuf::from("cookies.json")
}
fn default_request_delay() -> u64 {
    2
}
fn default_max_retries() -> usize {
    3
}
fn default_max_thread_fetches() -> usize {
    3
}
fn default_true() -> bool {
    true
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_log_file() -> PathBuf {
    PathBuf::from("logs/digest.log")
}
fn default_stats_file() -> PathBuf {
    PathBuf::from("logs/stats.json")
}

impl DigestConfig {
    /// Reject configurations that would only fail later, mid-run.
    ///
    /// ```
    /// use digest_config::DigestConfigLoader;
    ///
    /// let err = DigestConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// llm: { api_key: "" }
    /// email: { from_email: a@example.com, to_email: b@example.com, provider: resend, resend_api_key: k }
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap_err();
    /// assert!(err.to_string().contains("llm.api_key"));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("llm.api_key", Some(&self.llm.api_key))?;
        require("llm.model", Some(&self.llm.model))?;
        require("email.from_email", Some(&self.email.from_email))?;
        require("email.to_email", Some(&self.email.to_email))?;

        match self.email.provider {
            EmailProvider::Smtp => {
                require("email.smtp_server", self.email.smtp_server.as_ref())?;
                require("email.smtp_username", self.email.smtp_username.as_ref())?;
                require("email.smtp_password", self.email.smtp_password.as_ref())?;
            }
            EmailProvider::Resend => {
                require("email.resend_api_key", self.email.resend_api_key.as_ref())?;
            }
        }

        if self.twitter.tweets_per_account == 0 {
            return Err(ConfigError::Message(
                "twitter.tweets_per_account must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn require(key: &str, value: Option<&String>) -> Result<(), ConfigError> {
    match value.map(|v| v.trim()) {
        None | Some("") => Err(ConfigError::Message(format!("missing required key `{key}`"))),
        Some(v) if v.contains("${") => Err(ConfigError::Message(format!(
            "`{key}` references an unset environment variable: {v}"
        ))),
        Some(_) => Ok(()),
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct DigestConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for DigestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DigestConfigLoader {
    /// Empty builder; add file or string sources, then [`Self::load`].
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML file; it must exist.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).format(config::FileFormat::Yaml).required(true));
        self
    }

    /// Merge an inline YAML snippet (tests, `--config -` style tooling).
    ///
    /// ```
    /// use digest_config::{DigestConfigLoader, EmailProvider, LlmProvider};
    ///
    /// let cfg = DigestConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// llm:
    ///   api_key: sk-test
    /// email:
    ///   provider: resend
    ///   resend_api_key: re_test
    ///   from_email: digest@example.com
    ///   to_email: me@example.com
    /// accounts: [karpathy, "@sama"]
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.llm.provider, LlmProvider::Anthropic);
    /// assert_eq!(cfg.email.provider, EmailProvider::Resend);
    /// assert_eq!(cfg.twitter.tweets_per_account, 5);
    /// assert_eq!(cfg.twitter.max_age_hours(), 24);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge the sources, expand `${VAR}` placeholders, deserialize and validate.
    ///
    /// The `DIGEST__` environment overlay is added last so it beats every file.
    pub fn load(self) -> Result<DigestConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(Environment::with_prefix("DIGEST").separator("__"))
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: DigestConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        tracing::debug!(
            llm_provider = ?typed.llm.provider,
            email_provider = ?typed.email.provider,
            "config.loaded"
        );
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MINIMAL: &str = r#"
llm:
  api_key: sk-test
email:
  from_email: digest@example.com
  to_email: me@example.com
  smtp_server: smtp.example.com
  smtp_username: digest@example.com
  smtp_password: hunter2
"#;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("DIGEST_TEST_FOO", Some("bar"), || {
            let mut v = json!("prefix-${DIGEST_TEST_FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars(
            [("DIGEST_TEST_USER", Some("karpathy")), ("DIGEST_TEST_HOST", Some("smtp.qq.com"))],
            || {
                let mut v = json!([
                    "@$DIGEST_TEST_USER",
                    { "smtp_server": "${DIGEST_TEST_HOST}" },
                    587,
                    true,
                    null
                ]);
                expand_env_in_value(&mut v);
                assert_eq!(
                    v,
                    json!(["@karpathy", { "smtp_server": "smtp.qq.com" }, 587, true, null])
                );
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars(
            [("DIGEST_TEST_A", Some("${DIGEST_TEST_B}")), ("DIGEST_TEST_B", Some("${DIGEST_TEST_A}"))],
            || {
                let mut v = json!("x=${DIGEST_TEST_A}-y");
                expand_env_in_value(&mut v);
                let s = v.as_str().unwrap();
                assert!(s.starts_with("x=") && s.ends_with("-y"));
                assert!(s.contains("${"));
            },
        );
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let cfg = DigestConfigLoader::new().with_yaml_str(MINIMAL).load().unwrap();
        assert_eq!(cfg.llm.model, DEFAULT_ANTHROPIC_MODEL);
        assert_eq!(cfg.llm.max_tokens, 2000);
        assert_eq!(cfg.email.smtp_port, 587);
        assert_eq!(cfg.email.subject_prefix, "AI资讯日报");
        assert_eq!(cfg.twitter.cookies_file, PathBuf::from("cookies.json"));
        assert!(cfg.twitter.enable_thread_merging);
        assert_eq!(cfg.output_dir, PathBuf::from("output"));
        assert_eq!(cfg.monitoring.stats_file, PathBuf::from("logs/stats.json"));
        assert!(cfg.accounts.is_empty());
    }

    #[test]
    fn hours_cutoff_wins_over_days() {
        let yaml = format!("{MINIMAL}\ntwitter:\n  max_tweet_age_days: 3\n  max_tweet_age_hours: 9\n");
        let cfg = DigestConfigLoader::new().with_yaml_str(&yaml).load().unwrap();
        assert_eq!(cfg.twitter.max_age_hours(), 9);

        let yaml = format!("{MINIMAL}\ntwitter:\n  max_tweet_age_days: 3\n");
        let cfg = DigestConfigLoader::new().with_yaml_str(&yaml).load().unwrap();
        assert_eq!(cfg.twitter.max_age_hours(), 72);
    }

    #[test]
    fn missing_llm_section_is_rejected() {
        let err = DigestConfigLoader::new()
            .with_yaml_str("email: { from_email: a@b.c, to_email: d@e.f }")
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("llm"), "{err}");
    }

    #[test]
    fn smtp_provider_requires_credentials() {
        let err = DigestConfigLoader::new()
            .with_yaml_str(
                "llm: { api_key: k }\nemail: { from_email: a@b.c, to_email: d@e.f, smtp_server: smtp.b.c }",
            )
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("email.smtp_username"), "{err}");
    }

    #[test]
    fn unresolved_placeholder_in_required_key_is_rejected() {
        let yaml = MINIMAL.replace("sk-test", "${DIGEST_TEST_SURELY_UNSET_KEY}");
        let err = DigestConfigLoader::new().with_yaml_str(&yaml).load().unwrap_err();
        assert!(err.to_string().contains("llm.api_key"), "{err}");
    }

    #[test]
    fn zero_tweets_per_account_is_rejected() {
        let yaml = format!("{MINIMAL}\ntwitter:\n  tweets_per_account: 0\n");
        assert!(DigestConfigLoader::new().with_yaml_str(&yaml).load().is_err());
    }
}
