pub const SCHEMA: &str = r#"
-- feeds table: the managed subscription list
CREATE TABLE IF NOT EXISTS feeds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_feeds_url ON feeds(url);

-- delivered table: the dedup ledger. A row exists iff the article was
-- successfully sent; delivered_at drives age-based pruning.
CREATE TABLE IF NOT EXISTS delivered (
    fingerprint TEXT PRIMARY KEY,
    delivered_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_delivered_at ON delivered(delivered_at);
"#;
