//! Inbound command handling: long-poll Telegram for updates, drop anything
//! not from the configured admin, and feed parsed commands through a
//! single-consumer queue so admin mutations never race each other.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::admin::AdminOps;
use crate::commands::{self, AdminCommand};
use crate::services::TelegramClient;

/// Telegram caps message text at 4096 characters.
const MAX_MESSAGE_LEN: usize = 4096;

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub async fn run(telegram: Arc<TelegramClient>, admin_chat: Option<i64>, ops: AdminOps) {
    if admin_chat.is_none() {
        tracing::warn!("Admin is empty! No commands will be accepted");
    }

    let (tx, mut rx) = mpsc::channel::<(i64, AdminCommand)>(32);

    let reply_client = Arc::clone(&telegram);
    tokio::spawn(async move {
        while let Some((chat_id, command)) = rx.recv().await {
            let reply = ops.handle(command).await;
            for chunk in chunk_message(&reply) {
                if let Err(e) = reply_client.reply(chat_id, &chunk).await {
                    tracing::error!("Cannot send reply: {}", e);
                }
            }
        }
    });

    tracing::info!("Starting telegram loop");
    let mut offset = 0i64;
    loop {
        let updates = match telegram.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!("getUpdates failed: {}", e);
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else {
                continue;
            };
            let Some(text) = message.text.as_deref() else {
                continue;
            };
            let sender = message.from.as_ref().map(|s| s.id);

            // Authorization: only the configured admin is listened to
            if admin_chat.is_none() || sender != admin_chat {
                tracing::debug!("Ignoring message from {:?}", sender);
                continue;
            }

            match commands::parse(text) {
                Some(Ok(command)) => {
                    if tx.send((message.chat.id, command)).await.is_err() {
                        tracing::error!("Command queue closed, stopping poll loop");
                        return;
                    }
                }
                Some(Err(usage)) => {
                    if let Err(e) = telegram.reply(message.chat.id, &usage).await {
                        tracing::error!("Cannot send reply: {}", e);
                    }
                }
                None => {
                    tracing::debug!("Ignoring [{}] from {:?}", text, sender);
                }
            }
        }
    }
}

/// Split a reply into Telegram-sized chunks, preferring line boundaries.
fn chunk_message(text: &str) -> Vec<String> {
    if text.chars().count() <= MAX_MESSAGE_LEN {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if !current.is_empty() && current.chars().count() + line.chars().count() + 1 > MAX_MESSAGE_LEN
        {
            chunks.push(std::mem::take(&mut current));
        }
        // A single oversized line gets hard-split
        let mut line = line;
        while line.chars().count() > MAX_MESSAGE_LEN {
            let split_at = line
                .char_indices()
                .nth(MAX_MESSAGE_LEN)
                .map(|(i, _)| i)
                .unwrap_or(line.len());
            chunks.push(line[..split_at].to_string());
            line = &line[split_at..];
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
