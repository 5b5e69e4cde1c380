use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    // Admin-facing, user errors: reported back over chat, never retried
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Feed already exists: {0}")]
    DuplicateFeed(String),

    #[error("No feed with id {0}")]
    NotFound(i64),

    // Per-feed transient errors: isolated, logged, retried on the next tick
    #[error("Timed out fetching {0}")]
    Timeout(String),

    #[error("Cannot reach {0}: {1}")]
    Unreachable(String, String),

    #[error("Feed parse error: {0}")]
    FeedParse(#[from] feed_rs::parser::ParseFeedError),

    #[error("OPML parse error: {0}")]
    Opml(String),

    // Degrades to the untranslated text at the call site
    #[error("Translation failed: {0}")]
    Translation(String),

    // Halts the remainder of the current batch, retried next tick
    #[error("Message delivery failed: {0}")]
    Send(String),

    // Store/infrastructure: the current operation fails cleanly
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
