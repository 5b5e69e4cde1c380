use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Bot API token; falls back to the BOT_TOKEN environment variable.
    pub bot_token: Option<String>,

    /// Destination chat for news posts.
    #[serde(default)]
    pub target_chat: i64,

    /// Chat id allowed to issue commands. Absent means no commands are
    /// accepted.
    pub admin_chat: Option<i64>,

    #[serde(default = "default_max_news_age_days")]
    pub max_news_age_days: u32,

    #[serde(default = "default_news_count")]
    pub news_count: u32,

    #[serde(default = "default_post_interval")]
    pub post_interval_minutes: u32,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// LibreTranslate-compatible endpoint; translation is skipped entirely
    /// when unset.
    pub translate_api_url: Option<String>,
    pub translate_api_key: Option<String>,

    #[serde(default = "default_languages")]
    pub translate_languages: Vec<String>,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feedpost");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("feedpost.db").to_string_lossy().to_string()
}

fn default_max_news_age_days() -> u32 {
    30
}

fn default_news_count() -> u32 {
    1
}

fn default_post_interval() -> u32 {
    41
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_languages() -> Vec<String> {
    vec!["it".to_string(), "en".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bot_token: None,
            target_chat: 0,
            admin_chat: None,
            max_news_age_days: default_max_news_age_days(),
            news_count: default_news_count(),
            post_interval_minutes: default_post_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            translate_api_url: None,
            translate_api_key: None,
            translate_languages: default_languages(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config =
                toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feedpost")
            .join("config.toml")
    }

    fn validate(&self) -> Result<()> {
        if self.max_news_age_days == 0 {
            return Err(AppError::Config("max_news_age_days must be > 0".to_string()));
        }
        if self.news_count == 0 {
            return Err(AppError::Config("news_count must be > 0".to_string()));
        }
        if self.post_interval_minutes == 0 {
            return Err(AppError::Config(
                "post_interval_minutes must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Token from the config file or the BOT_TOKEN environment variable.
    pub fn resolve_bot_token(&self) -> Result<String> {
        let token = self
            .bot_token
            .clone()
            .or_else(|| std::env::var("BOT_TOKEN").ok())
            .ok_or_else(|| AppError::Config("bot_token is not set".to_string()))?;
        // Tokens look like "123456789:AA..."; catch obvious misconfiguration
        if token.len() < 10 || !token.contains(':') {
            return Err(AppError::Config("bot_token format is invalid".to_string()));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_news_age_days, 30);
        assert_eq!(config.news_count, 1);
        assert_eq!(config.post_interval_minutes, 41);
    }

    #[test]
    fn zero_knobs_are_rejected() {
        let mut config = Config::default();
        config.news_count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.post_interval_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn short_token_is_rejected() {
        let config = Config {
            bot_token: Some("short".to_string()),
            ..Config::default()
        };
        assert!(config.resolve_bot_token().is_err());

        let config = Config {
            bot_token: Some("123456789:AAFakeTokenValue".to_string()),
            ..Config::default()
        };
        assert!(config.resolve_bot_token().is_ok());
    }
}
