use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use regex::Regex;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::Article;

use super::FetchFeeds;

/// Summaries are cut to this many characters before formatting.
const SUMMARY_MAX_CHARS: usize = 300;

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("feedpost/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(url.to_string())
            } else {
                AppError::Unreachable(url.to_string(), e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(AppError::Unreachable(
                url.to_string(),
                format!("HTTP {}", response.status()),
            ));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(url.to_string())
            } else {
                AppError::Unreachable(url.to_string(), e.to_string())
            }
        })?;
        Ok(bytes.to_vec())
    }

    /// Raw download, used for OPML import.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.get_bytes(url).await
    }

    /// Reachability-and-dialect check used by the cleanup command: the URL
    /// must download and parse as some feed dialect.
    pub async fn probe(&self, url: &str) -> Result<()> {
        let bytes = self.get_bytes(url).await?;
        parser::parse(&bytes[..])?;
        Ok(())
    }
}

#[async_trait]
impl FetchFeeds for FeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<Article>> {
        let bytes = self.get_bytes(url).await?;
        let articles = parse_articles(&bytes)?;
        tracing::debug!("Fetched {} articles from {}", articles.len(), url);
        Ok(articles)
    }
}

/// Parse feed bytes (RSS 2.0, Atom, and whatever else feed-rs understands)
/// into normalized articles. Entries without a link have no fingerprintable
/// identity and are skipped rather than failing the feed.
pub fn parse_articles(bytes: &[u8]) -> Result<Vec<Article>> {
    let feed = parser::parse(bytes)?;

    let articles = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let url = entry.links.first().map(|l| l.href.clone())?;

            let content_html = entry
                .content
                .as_ref()
                .and_then(|c| c.body.as_ref())
                .or_else(|| entry.summary.as_ref().map(|s| &s.content));

            let summary = content_html
                .and_then(|html| html2text::from_read(html.as_bytes(), 80).ok())
                .map(|text| clean_summary(&text))
                .unwrap_or_default();

            let author = entry
                .authors
                .first()
                .map(|a| a.name.clone())
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| extract_domain(&url));

            Some(Article {
                title: entry
                    .title
                    .map(|t| t.content)
                    .unwrap_or_else(|| "Untitled".to_string()),
                url,
                author,
                summary,
                published_at: entry.published.or(entry.updated),
            })
        })
        .collect();

    Ok(articles)
}

/// Strip boilerplate and cut the text down to a teaser.
fn clean_summary(text: &str) -> String {
    let text = text.trim();
    let scrubbed = match Regex::new(r"(?i)read more") {
        Ok(re) => re.replace_all(text, "").into_owned(),
        Err(_) => text.to_string(),
    };
    let scrubbed = scrubbed.trim();

    if scrubbed.chars().count() > SUMMARY_MAX_CHARS {
        let cut: String = scrubbed.chars().take(SUMMARY_MAX_CHARS).collect();
        format!("{} ...", cut.trim_end())
    } else {
        scrubbed.to_string()
    }
}

/// Fallback author: the article's domain without the `www.` prefix.
fn extract_domain(link: &str) -> String {
    Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .map(|h| h.strip_prefix("www.").unwrap_or(&h).to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS2_SAMPLE: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>https://example.com</link>
    <item>
      <title>First post</title>
      <link>https://example.com/first</link>
      <description>&lt;p&gt;Hello &lt;b&gt;world&lt;/b&gt;. Read more&lt;/p&gt;</description>
      <pubDate>Mon, 10 Aug 2026 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>No date post</title>
      <link>https://example.com/second</link>
      <description>Body</description>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <id>urn:uuid:feed</id>
  <updated>2026-08-10T10:00:00Z</updated>
  <entry>
    <title>Atom entry</title>
    <id>urn:uuid:entry-1</id>
    <link href="https://example.org/entry-1"/>
    <updated>2026-08-10T10:00:00Z</updated>
    <author><name>Alice</name></author>
    <summary>Atom body text</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss2_items() {
        let articles = parse_articles(RSS2_SAMPLE.as_bytes()).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "First post");
        assert_eq!(articles[0].url, "https://example.com/first");
        assert!(articles[0].published_at.is_some());
        // Missing date stays None for the age filter to reject
        assert!(articles[1].published_at.is_none());
        // No author in the feed: falls back to the domain
        assert_eq!(articles[0].author, "example.com");
    }

    #[test]
    fn parses_atom_entries() {
        let articles = parse_articles(ATOM_SAMPLE.as_bytes()).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].author, "Alice");
        assert_eq!(articles[0].url, "https://example.org/entry-1");
        assert!(articles[0].published_at.is_some());
    }

    #[test]
    fn garbage_input_is_a_parse_error() {
        assert!(parse_articles(b"this is not xml at all").is_err());
    }

    #[test]
    fn summary_is_scrubbed_and_truncated() {
        let long = "x".repeat(500);
        let cleaned = clean_summary(&long);
        assert!(cleaned.ends_with(" ..."));
        assert!(cleaned.chars().count() <= SUMMARY_MAX_CHARS + 4);

        assert_eq!(clean_summary("Hello. Read More"), "Hello.");
    }

    #[test]
    fn domain_extraction_strips_www() {
        assert_eq!(extract_domain("https://www.example.com/post"), "example.com");
        assert_eq!(extract_domain("not a url"), "anonymous");
    }
}
