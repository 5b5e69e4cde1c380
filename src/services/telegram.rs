use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::transport::ChatTransport;

/// Long-poll window for getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 50;

/// Characters the Bot API requires escaping in MarkdownV2 text.
const MARKDOWN_SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    '\'',
];

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub from: Option<Sender>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Thin Telegram Bot API client. News delivery goes to `target_chat`
/// (the [`ChatTransport`] impl); admin acknowledgments go wherever the
/// command came from via [`TelegramClient::reply`].
pub struct TelegramClient {
    client: Client,
    base_url: String,
    target_chat: i64,
}

impl TelegramClient {
    pub fn new(token: &str, target_chat: i64) -> Self {
        // Timeout must outlast the getUpdates long poll
        let client = Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 25))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: format!("https://api.telegram.org/bot{}", token),
            target_chat,
        }
    }

    async fn call_send(&self, chat_id: i64, text: &str, markdown: bool) -> Result<()> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if markdown {
            payload["parse_mode"] = json!("MarkdownV2");
        }

        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Send(e.to_string()))?;

        let body: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| AppError::Send(e.to_string()))?;
        if !body.ok {
            return Err(AppError::Send(
                body.description.unwrap_or_else(|| "unknown API error".to_string()),
            ));
        }
        Ok(())
    }

    /// Plain-text acknowledgment to the admin's chat.
    pub async fn reply(&self, chat_id: i64, text: &str) -> Result<()> {
        self.call_send(chat_id, text, false).await
    }

    /// Fetch pending updates, long-polling. `offset` is one past the last
    /// update already handled.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let response = self
            .client
            .get(format!("{}/getUpdates", self.base_url))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
                ("allowed_updates", "[\"message\"]".to_string()),
            ])
            .send()
            .await?;

        let body: ApiResponse<Vec<Update>> = response.json().await?;
        if !body.ok {
            return Err(AppError::Other(anyhow::anyhow!(
                "getUpdates failed: {}",
                body.description.unwrap_or_default()
            )));
        }
        Ok(body.result.unwrap_or_default())
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_message(&self, text: &str) -> Result<()> {
        self.call_send(self.target_chat, text, true).await
    }

    async fn send_document(&self, filename: &str, bytes: Vec<u8>, caption: &str) -> Result<()> {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new()
            .text("chat_id", self.target_chat.to_string())
            .text("caption", caption.to_string())
            .part("document", part);

        let response = self
            .client
            .post(format!("{}/sendDocument", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Send(e.to_string()))?;

        let body: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| AppError::Send(e.to_string()))?;
        if !body.ok {
            return Err(AppError::Send(
                body.description.unwrap_or_else(|| "unknown API error".to_string()),
            ));
        }
        Ok(())
    }
}

/// Escape text for Telegram MarkdownV2. Applied to every feed-supplied
/// field, never to the markup we generate ourselves.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape a URL for use inside MarkdownV2 `[text](url)` markup, where only
/// `)` and `\` are special. Backslashes first, so inserted escapes are not
/// doubled.
pub fn escape_link_url(url: &str) -> String {
    url.replace('\\', "\\\\").replace(')', "\\)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markdown_special_characters() {
        assert_eq!(escape_markdown("a.b-c!"), "a\\.b\\-c\\!");
        assert_eq!(escape_markdown("plain words"), "plain words");
        assert_eq!(escape_markdown("[link](x)"), "\\[link\\]\\(x\\)");
    }

    #[test]
    fn escapes_link_urls() {
        assert_eq!(
            escape_link_url("https://example.com/a(b)"),
            "https://example.com/a(b\\)"
        );
        assert_eq!(
            escape_link_url("https://example.com/a\\b"),
            "https://example.com/a\\\\b"
        );
        assert_eq!(
            escape_link_url("https://example.com/plain?q=1"),
            "https://example.com/plain?q=1"
        );
    }

    #[test]
    fn parses_update_payload() {
        let raw = r#"{
            "update_id": 7,
            "message": {
                "message_id": 1,
                "from": {"id": 42, "is_bot": false, "first_name": "A"},
                "chat": {"id": 42, "type": "private"},
                "text": "/urllist"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.update_id, 7);
        let msg = update.message.unwrap();
        assert_eq!(msg.from.unwrap().id, 42);
        assert_eq!(msg.text.as_deref(), Some("/urllist"));
    }
}
