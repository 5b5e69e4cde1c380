//! One delivery tick: snapshot the feed list, fetch everything, filter down
//! to unseen-and-fresh articles, then send oldest-first until the per-tick
//! quota is reached or a send fails.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};

use crate::db::Repository;
use crate::dedup;
use crate::error::Result;
use crate::feed::FetchFeeds;
use crate::models::{Article, TickSummary};
use crate::services::{escape_link_url, escape_markdown, Translator};
use crate::transport::ChatTransport;

/// Upper bound on concurrent feed downloads per tick.
const MAX_CONCURRENT_FETCHES: usize = 5;

pub struct DeliveryPipeline {
    repo: Repository,
    fetcher: Arc<dyn FetchFeeds>,
    transport: Arc<dyn ChatTransport>,
    translator: Option<Translator>,
    languages: Vec<String>,
    news_count: usize,
    max_age: Duration,
    dry_run: bool,
}

impl DeliveryPipeline {
    pub fn new(
        repo: Repository,
        fetcher: Arc<dyn FetchFeeds>,
        transport: Arc<dyn ChatTransport>,
        translator: Option<Translator>,
        languages: Vec<String>,
        news_count: usize,
        max_age_days: u32,
        dry_run: bool,
    ) -> Self {
        Self {
            repo,
            fetcher,
            transport,
            translator,
            languages,
            news_count,
            max_age: Duration::days(i64::from(max_age_days)),
            dry_run,
        }
    }

    /// Run one tick. Per-feed failures are isolated and counted; a send
    /// failure stops the remainder of the batch so ordering is preserved
    /// and the unsent items stay eligible (their fingerprints were never
    /// recorded).
    pub async fn run_tick(&self) -> Result<TickSummary> {
        let mut summary = TickSummary::default();

        let feeds = self.repo.list_feeds().await?;
        tracing::debug!("Tick over {} feeds", feeds.len());

        let results: Vec<_> = stream::iter(feeds)
            .map(|feed| async move {
                let result = self.fetcher.fetch(&feed.url).await;
                (feed, result)
            })
            .buffer_unordered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await;

        let now = Utc::now();
        // Fingerprints already queued this tick, so the same article
        // syndicated by two feeds is sent once
        let mut queued: HashSet<String> = HashSet::new();
        let mut eligible: Vec<(String, Article)> = Vec::new();

        for (feed, result) in results {
            match result {
                Ok(articles) => {
                    for article in articles {
                        if !dedup::eligible(&self.repo, &article, now, self.max_age).await? {
                            continue;
                        }
                        let fp = dedup::fingerprint(&article.url);
                        if queued.insert(fp.clone()) {
                            eligible.push((fp, article));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Feed {} failed: {}", feed.url, e);
                    summary.feeds_failed += 1;
                }
            }
        }

        // Oldest first, so the destination chat reads in narrative order.
        // Overflow beyond the quota keeps its fingerprint unrecorded and
        // comes back on the next tick.
        eligible.sort_by_key(|(_, article)| article.published_at);
        eligible.truncate(self.news_count);

        for (fp, article) in eligible {
            let text = self.format_article(&article).await;
            tracing::info!("Sending [{}]", article.url);
            if let Err(e) = self.transport.send_message(&text).await {
                tracing::error!("Send failed, halting batch until next tick: {}", e);
                summary.batch_halted = true;
                break;
            }
            // A dry run must not mark articles as delivered, or the next
            // real run would skip everything it previewed
            if self.dry_run {
                tracing::info!("Dry run, not recording [{}]", article.url);
            } else {
                self.repo.record_fingerprint(&fp, Utc::now()).await?;
            }
            summary.delivered += 1;
        }

        tracing::info!(
            "Tick done: {} delivered, {} feeds failed",
            summary.delivered,
            summary.feeds_failed
        );
        Ok(summary)
    }

    /// Build the MarkdownV2 payload. With a translator configured, title and
    /// summary are repeated per target language; translation failures fall
    /// back to the original text.
    async fn format_article(&self, article: &Article) -> String {
        let mut lines: Vec<String> = Vec::new();

        match &self.translator {
            Some(translator) => {
                for lang in &self.languages {
                    let title = translator
                        .translate_or_original(&article.title, lang)
                        .await;
                    lines.push(format!(
                        "\u{1F4F0} *\\[{}\\] {}*",
                        escape_markdown(&lang.to_uppercase()),
                        escape_markdown(&title)
                    ));
                }
            }
            None => {
                lines.push(format!("\u{1F4F0} *{}*", escape_markdown(&article.title)));
            }
        }

        lines.push(format!("\u{270F} {}", escape_markdown(&article.author)));
        if let Some(published) = article.published_at {
            lines.push(format!(
                "\u{1F5D3} {}",
                escape_markdown(&published.format("%Y/%m/%d, %H:%M").to_string())
            ));
        }

        if !article.summary.is_empty() {
            match &self.translator {
                Some(translator) => {
                    for lang in &self.languages {
                        let summary = translator
                            .translate_or_original(&article.summary, lang)
                            .await;
                        lines.push(String::new());
                        lines.push(format!(
                            "\\[{}\\] {}",
                            escape_markdown(&lang.to_uppercase()),
                            escape_markdown(&summary)
                        ));
                    }
                }
                None => {
                    lines.push(String::new());
                    lines.push(escape_markdown(&article.summary));
                }
            }
        }

        lines.push(String::new());
        lines.push(format!(
            "\u{1F517} [{}]({})",
            escape_markdown(&article.title),
            escape_link_url(&article.url)
        ));

        lines.join("\n")
    }
}
