mod telegram;
mod translator;

pub use telegram::{escape_link_url, escape_markdown, IncomingMessage, TelegramClient, Update};
pub use translator::Translator;
