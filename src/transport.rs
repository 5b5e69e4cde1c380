use async_trait::async_trait;

use crate::error::Result;

/// Outbound side of the chat integration. The delivery pipeline and the
/// admin layer only know this surface; the Telegram client implements it,
/// and dry-run mode swaps in [`LogTransport`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver one formatted message to the destination chat.
    async fn send_message(&self, text: &str) -> Result<()>;

    /// Deliver a file (the database backup) to the destination chat.
    async fn send_document(&self, filename: &str, bytes: Vec<u8>, caption: &str) -> Result<()>;
}

/// Dry-run transport: prints what would have been sent.
pub struct LogTransport;

#[async_trait]
impl ChatTransport for LogTransport {
    async fn send_message(&self, text: &str) -> Result<()> {
        tracing::info!("[dry-run] would send:\n{}", text);
        Ok(())
    }

    async fn send_document(&self, filename: &str, bytes: Vec<u8>, caption: &str) -> Result<()> {
        tracing::info!(
            "[dry-run] would send document {} ({} bytes): {}",
            filename,
            bytes.len(),
            caption
        );
        Ok(())
    }
}
