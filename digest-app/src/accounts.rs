use digest_config::{load_accounts, normalize_handles, DigestConfig};
use digest_social::twitter::TweetFetcher;
use tracing::{info, warn};

/// Accounts to fetch: the following list of `twitter.username` when set,
/// otherwise [`configured_accounts`].
pub async fn resolve_accounts(cfg: &DigestConfig, fetcher: &TweetFetcher) -> Vec<String> {
    if let Some(user) = cfg.twitter.username.as_deref().filter(|u| !u.trim().is_empty()) {
        match fetcher.following_of(user.trim_start_matches('@')).await {
            Ok(list) if !list.is_empty() => {
                info!(user, accounts = list.len(), "using following list");
                return normalize_handles(list);
            }
            Ok(_) => warn!(user, "following list is empty; using configured accounts"),
            Err(e) => warn!(user, error = %e, "following list unavailable; using configured accounts"),
        }
    }
    configured_accounts(cfg)
}

/// `accounts_file` when it loads, otherwise the inline `accounts`.
pub fn configured_accounts(cfg: &DigestConfig) -> Vec<String> {
    if let Some(path) = &cfg.accounts_file {
        match load_accounts(path) {
            Ok(list) => {
                info!(file = %path.display(), accounts = list.len(), "loaded account list");
                return list;
            }
            Err(e) => warn!(error = %e, "account list unusable; falling back to inline accounts"),
        }
    }
    normalize_handles(&cfg.accounts)
}
