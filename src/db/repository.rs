use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::backup::Backup;
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::dedup::validate_feed_url;
use crate::error::{AppError, Result};
use crate::models::FeedSource;

use super::schema::SCHEMA;

/// Handle over the single SQLite store holding the feed list and the
/// delivered-fingerprint ledger. Clones share one connection whose worker
/// thread serializes every call, so each operation is atomic with respect
/// to concurrent scheduler and admin access.
#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Feed operations

    /// Insert a feed URL after syntactic validation. The existence check and
    /// the insert run in one connection call, so two concurrent adds of the
    /// same URL resolve to exactly one `Ok` and one `DuplicateFeed`.
    pub async fn add_feed(&self, url: &str) -> Result<i64> {
        let normalized = validate_feed_url(url)?;
        let stored = normalized.clone();
        let inserted = self
            .conn
            .call(move |conn| {
                let existing: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM feeds WHERE url = ?1",
                        params![stored],
                        |row| row.get(0),
                    )
                    .optional()?;
                if existing.is_some() {
                    return Ok(None);
                }
                conn.execute("INSERT INTO feeds (url) VALUES (?1)", params![stored])?;
                Ok(Some(conn.last_insert_rowid()))
            })
            .await?;

        inserted.ok_or(AppError::DuplicateFeed(normalized))
    }

    pub async fn remove_feed(&self, id: i64) -> Result<()> {
        let removed = self
            .conn
            .call(move |conn| {
                let n = conn.execute("DELETE FROM feeds WHERE id = ?1", params![id])?;
                Ok(n)
            })
            .await?;
        if removed == 0 {
            return Err(AppError::NotFound(id));
        }
        Ok(())
    }

    pub async fn list_feeds(&self) -> Result<Vec<FeedSource>> {
        let feeds = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, url, created_at FROM feeds ORDER BY id")?;
                let feeds = stmt
                    .query_map([], |row| Ok(feed_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(feeds)
            })
            .await?;
        Ok(feeds)
    }

    pub async fn count_feeds(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM feeds", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    // Fingerprint ledger

    pub async fn has_fingerprint(&self, fingerprint: &str) -> Result<bool> {
        let fingerprint = fingerprint.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM delivered WHERE fingerprint = ?1",
                    params![fingerprint],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    /// Idempotent: recording a fingerprint that is already present is a
    /// no-op, not an error.
    pub async fn record_fingerprint(&self, fingerprint: &str, at: DateTime<Utc>) -> Result<()> {
        let fingerprint = fingerprint.to_string();
        let at = at.format("%Y-%m-%d %H:%M:%S").to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO delivered (fingerprint, delivered_at) VALUES (?1, ?2)",
                    params![fingerprint, at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Bulk-delete ledger rows older than `max_days`. Returns the number of
    /// rows removed.
    pub async fn prune_fingerprints_older_than(&self, max_days: u32) -> Result<usize> {
        let modifier = format!("-{} days", max_days);
        let removed = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "DELETE FROM delivered WHERE delivered_at <= datetime('now', ?1)",
                    params![modifier],
                )?;
                Ok(n)
            })
            .await?;
        Ok(removed)
    }

    pub async fn count_fingerprints(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM delivered", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    // Backup

    /// Point-in-time snapshot of the whole store, produced with the SQLite
    /// online backup API so in-flight writers are not blocked incorrectly.
    /// The returned bytes are a complete database file; restoring is opening
    /// a `Repository` on them.
    pub async fn backup_snapshot(&self) -> Result<Vec<u8>> {
        let bytes = self
            .conn
            .call(|conn| {
                // NamedTempFile removes the scratch file on drop, on the
                // error paths as well as the happy one
                let scratch = tempfile::NamedTempFile::new()
                    .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
                {
                    let mut dst = rusqlite::Connection::open(scratch.path())?;
                    let backup = Backup::new(conn, &mut dst)?;
                    backup.run_to_completion(64, Duration::from_millis(10), None)?;
                }
                let bytes = std::fs::read(scratch.path())
                    .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
                Ok(bytes)
            })
            .await?;
        Ok(bytes)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn feed_from_row(row: &Row) -> FeedSource {
    FeedSource {
        id: row.get(0).unwrap(),
        url: row.get(1).unwrap(),
        created_at: row
            .get::<_, String>(2)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}
