use chrono::{DateTime, Utc};

/// A managed feed subscription, as stored in the feeds table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub id: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// One normalized feed entry. Ephemeral: only its fingerprint is persisted,
/// and only after a successful send.
#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub author: String,
    pub summary: String,
    /// Feed-supplied publish time; `None` means the entry is undateable and
    /// the age filter rejects it.
    pub published_at: Option<DateTime<Utc>>,
}
