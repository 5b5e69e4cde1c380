//! Execution of admin commands. Every command produces an acknowledgment
//! string; internal failures are folded into the text so the admin never
//! gets silence.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::commands::AdminCommand;
use crate::db::Repository;
use crate::dedup::duplicate_key;
use crate::error::AppError;
use crate::feed::FeedFetcher;
use crate::models::BulkAddReport;
use crate::scheduler::{SchedulerHandle, TickOutcome};
use crate::transport::ChatTransport;

pub struct AdminOps {
    repo: Repository,
    fetcher: Arc<FeedFetcher>,
    scheduler: SchedulerHandle,
    transport: Arc<dyn ChatTransport>,
    max_news_age_days: u32,
}

impl AdminOps {
    pub fn new(
        repo: Repository,
        fetcher: Arc<FeedFetcher>,
        scheduler: SchedulerHandle,
        transport: Arc<dyn ChatTransport>,
        max_news_age_days: u32,
    ) -> Self {
        Self {
            repo,
            fetcher,
            scheduler,
            transport,
            max_news_age_days,
        }
    }

    pub async fn handle(&self, command: AdminCommand) -> String {
        match command {
            AdminCommand::ListFeeds => self.list_feeds().await,
            AdminCommand::AddFeed(url) => self.add_feed(&url).await,
            AdminCommand::RemoveFeed(id) => self.remove_feed(id).await,
            AdminCommand::Force => self.force_tick().await,
            AdminCommand::PruneOldNews(days) => self.prune(days).await,
            AdminCommand::AddCsv(payload) => self.add_csv(&payload).await,
            AdminCommand::Cleanup => self.cleanup().await,
            AdminCommand::Backup => self.backup().await,
            AdminCommand::ImportOpml(url) => self.import_opml(&url).await,
        }
    }

    async fn list_feeds(&self) -> String {
        match self.repo.list_feeds().await {
            Ok(feeds) if feeds.is_empty() => "No URLs in the feed table".to_string(),
            Ok(feeds) => feeds
                .iter()
                .map(|f| format!("{}: {}", f.id, f.url))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => format!("Cannot list feeds: {}", e),
        }
    }

    async fn add_feed(&self, url: &str) -> String {
        match self.repo.add_feed(url).await {
            Ok(id) => format!("Added successfully with id {}", id),
            Err(AppError::DuplicateFeed(url)) => format!("Feed already exists: {}", url),
            Err(AppError::InvalidUrl(url)) => format!("Invalid URL format: {}", url),
            Err(e) => format!("Cannot add feed: {}", e),
        }
    }

    async fn remove_feed(&self, id: i64) -> String {
        match self.repo.remove_feed(id).await {
            Ok(()) => "Element was removed successfully".to_string(),
            Err(AppError::NotFound(id)) => format!("No feed with id {}", id),
            Err(e) => format!("Cannot remove feed: {}", e),
        }
    }

    async fn force_tick(&self) -> String {
        match self.scheduler.force().await {
            Ok(TickOutcome::Ran(summary)) => format!(
                "Delivered {} articles ({} feeds failed{})",
                summary.delivered,
                summary.feeds_failed,
                if summary.batch_halted {
                    ", batch halted on send failure"
                } else {
                    ""
                }
            ),
            Ok(TickOutcome::Skipped) => "A delivery run is already in progress".to_string(),
            Err(e) => format!("Forced run failed: {}", e),
        }
    }

    async fn prune(&self, days: Option<u32>) -> String {
        let days = days.unwrap_or(self.max_news_age_days);
        match self.repo.prune_fingerprints_older_than(days).await {
            Ok(removed) => format!("Deleted {} news records older than {} days", removed, days),
            Err(e) => format!("Cannot delete older news: {}", e),
        }
    }

    async fn add_csv(&self, payload: &str) -> String {
        let urls: Vec<String> = payload
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if urls.len() <= 1 {
            return "Expecting more than 1 value in CSV format".to_string();
        }
        let report = self.add_many(urls).await;
        format_bulk_report(&report)
    }

    async fn import_opml(&self, url: &str) -> String {
        let bytes = match self.fetcher.fetch_bytes(url).await {
            Ok(bytes) => bytes,
            Err(e) => return format!("Cannot download OPML: {}", e),
        };
        let content = String::from_utf8_lossy(&bytes);
        let urls = match crate::feed::parse_opml(&content) {
            Ok(urls) => urls,
            Err(e) => return format!("Cannot parse OPML: {}", e),
        };
        if urls.is_empty() {
            return "No feeds found in OPML document".to_string();
        }
        let report = self.add_many(urls).await;
        format_bulk_report(&report)
    }

    /// Insert each URL independently; one bad entry never aborts the batch.
    async fn add_many(&self, urls: Vec<String>) -> BulkAddReport {
        let mut report = BulkAddReport::default();
        for url in urls {
            match self.repo.add_feed(&url).await {
                Ok(_) => report.record(crate::models::AddOutcome::Added),
                Err(AppError::DuplicateFeed(_)) => {
                    tracing::warn!("Duplicate URL [{}]", url);
                    report.record(crate::models::AddOutcome::Duplicate);
                }
                Err(e) => {
                    tracing::warn!("Rejected URL [{}]: {}", url, e);
                    report.record(crate::models::AddOutcome::Invalid);
                }
            }
        }
        report
    }

    /// Remove near-duplicate entries first, then probe the survivors and
    /// drop the unreachable or unparsable ones.
    async fn cleanup(&self) -> String {
        let feeds = match self.repo.list_feeds().await {
            Ok(feeds) => feeds,
            Err(e) => return format!("Cannot run cleanup: {}", e),
        };

        let mut seen_keys: HashSet<String> = HashSet::new();
        let mut duplicates = 0usize;
        let mut invalid = 0usize;

        for feed in feeds {
            if !seen_keys.insert(duplicate_key(&feed.url)) {
                tracing::info!("Removing duplicate [{}]", feed.url);
                if self.repo.remove_feed(feed.id).await.is_ok() {
                    duplicates += 1;
                }
                continue;
            }
            if let Err(e) = self.fetcher.probe(&feed.url).await {
                tracing::info!("Removing invalid [{}]: {}", feed.url, e);
                if self.repo.remove_feed(feed.id).await.is_ok() {
                    invalid += 1;
                }
            }
        }

        format!(
            "Removed {} invalid and {} duplicated RSS feeds",
            invalid, duplicates
        )
    }

    async fn backup(&self) -> String {
        let snapshot = match self.repo.backup_snapshot().await {
            Ok(bytes) => bytes,
            Err(e) => return format!("Backup failed: {}", e),
        };
        let caption = format!("SQLite backup at {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        match self
            .transport
            .send_document("feedpost.db", snapshot, &caption)
            .await
        {
            Ok(()) => "Backup delivered".to_string(),
            Err(e) => format!("Cannot deliver backup: {}", e),
        }
    }
}

fn format_bulk_report(report: &BulkAddReport) -> String {
    format!(
        "[{}] out of [{}] feeds were added ({} duplicates, {} invalid)",
        report.added,
        report.total(),
        report.duplicates,
        report.invalid
    )
}
