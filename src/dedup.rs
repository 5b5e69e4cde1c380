//! URL canonicalization, article fingerprints and the age filter.
//!
//! A fingerprint is the hex SHA-256 of the canonicalized article URL. The
//! canonical form must be stable across runs: the same article may never
//! hash to two different fingerprints.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use url::Url;

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::Article;

/// Tolerated clock skew before a publish date counts as "from the future".
const FUTURE_SKEW_MINUTES: i64 = 5;

/// Normalize a URL into its canonical form: lower-cased scheme and host
/// (the `url` crate does this on parse), fragment dropped, trailing slash
/// trimmed from the path. Query strings are preserved since they often
/// identify the article.
pub fn canonicalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            let path = url.path().trim_end_matches('/').to_string();
            url.set_path(&path);
            url.to_string()
        }
        // Unparsable links still need a deterministic key
        Err(_) => trimmed.to_lowercase(),
    }
}

/// Hex SHA-256 of the canonicalized URL.
pub fn fingerprint(raw_url: &str) -> String {
    let canonical = canonicalize_url(raw_url);
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{:x}", digest)
}

/// Syntactic feed-URL check: http(s) scheme and a host. Reachability is the
/// cleanup command's job, not the store's. Returns the normalized URL.
pub fn validate_feed_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|_| AppError::InvalidUrl(trimmed.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(AppError::InvalidUrl(trimmed.to_string())),
    }
    if url.host_str().is_none() {
        return Err(AppError::InvalidUrl(trimmed.to_string()));
    }
    Ok(url.to_string())
}

/// Loose comparison key used by cleanup to spot near-duplicate feeds
/// (`http` vs `https`, `www.` prefix, trailing slash).
pub fn duplicate_key(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(url) => {
            let host = url.host_str().unwrap_or("");
            let host = host.strip_prefix("www.").unwrap_or(host);
            format!("{}{}", host, url.path().trim_end_matches('/'))
        }
        Err(_) => raw.trim().to_lowercase(),
    }
}

/// Age filter. Fails closed: undateable articles are never delivered, and
/// neither are articles dated in the future beyond a small skew allowance.
pub fn is_fresh(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>, max_age: Duration) -> bool {
    let Some(published) = published_at else {
        return false;
    };
    if published > now + Duration::minutes(FUTURE_SKEW_MINUTES) {
        tracing::warn!("Article dated {} is in the future, skipping", published);
        return false;
    }
    now - published <= max_age
}

/// Full eligibility check for one candidate article: fresh and unseen.
pub async fn eligible(
    repo: &Repository,
    article: &Article,
    now: DateTime<Utc>,
    max_age: Duration,
) -> Result<bool> {
    if !is_fresh(article.published_at, now, max_age) {
        return Ok(false);
    }
    let fp = fingerprint(&article.url);
    Ok(!repo.has_fingerprint(&fp).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_is_case_insensitive_on_host() {
        assert_eq!(
            canonicalize_url("HTTPS://Example.COM/Feed"),
            canonicalize_url("https://example.com/Feed")
        );
    }

    #[test]
    fn canonical_form_drops_fragment_and_trailing_slash() {
        assert_eq!(
            canonicalize_url("https://example.com/post/#comments"),
            canonicalize_url("https://example.com/post")
        );
    }

    #[test]
    fn canonical_form_keeps_query() {
        assert_ne!(
            canonicalize_url("https://example.com/?p=1"),
            canonicalize_url("https://example.com/?p=2")
        );
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = fingerprint("https://example.com/article/");
        let b = fingerprint("https://EXAMPLE.com/article#frag");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn validate_rejects_non_http() {
        assert!(validate_feed_url("ftp://example.com/feed").is_err());
        assert!(validate_feed_url("not a url").is_err());
        assert!(validate_feed_url("https://example.com/feed").is_ok());
    }

    #[test]
    fn duplicate_key_ignores_scheme_and_www() {
        assert_eq!(
            duplicate_key("http://www.example.com/feed/"),
            duplicate_key("https://example.com/feed")
        );
    }

    #[test]
    fn missing_date_is_not_fresh() {
        let now = Utc::now();
        assert!(!is_fresh(None, now, Duration::days(30)));
    }

    #[test]
    fn old_article_is_not_fresh() {
        let now = Utc::now();
        assert!(!is_fresh(
            Some(now - Duration::days(31)),
            now,
            Duration::days(30)
        ));
        assert!(is_fresh(
            Some(now - Duration::days(29)),
            now,
            Duration::days(30)
        ));
    }

    #[test]
    fn future_article_is_not_fresh() {
        let now = Utc::now();
        assert!(!is_fresh(Some(now + Duration::hours(2)), now, Duration::days(30)));
        // Small skew is tolerated
        assert!(is_fresh(Some(now + Duration::minutes(2)), now, Duration::days(30)));
    }
}
