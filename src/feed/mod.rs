mod fetcher;
mod opml;

pub use fetcher::FeedFetcher;
pub use opml::parse_opml;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Article;

/// Seam between the delivery pipeline and the network. The production
/// implementation is [`FeedFetcher`]; tests substitute canned feeds.
#[async_trait]
pub trait FetchFeeds: Send + Sync {
    /// Retrieve and parse one feed URL into normalized articles, in the
    /// order the feed declares them.
    async fn fetch(&self, url: &str) -> Result<Vec<Article>>;
}
