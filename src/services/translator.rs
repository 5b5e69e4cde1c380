use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Client for a LibreTranslate-compatible endpoint. Callers treat failure
/// as "keep the original text"; see [`Translator::translate_or_original`].
pub struct Translator {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl Translator {
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            api_url,
            api_key,
        }
    }

    pub async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let request = TranslateRequest {
            q: text,
            source: "auto",
            target: target_language,
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Translation(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Translation(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Translation(e.to_string()))?;

        let translated = body.translated_text.trim().to_string();
        if translated.is_empty() {
            return Err(AppError::Translation("empty translation".to_string()));
        }
        Ok(translated)
    }

    /// Degrading wrapper: a failed translation is logged and the original
    /// text is sent instead. Translation problems never block delivery.
    pub async fn translate_or_original(&self, text: &str, target_language: &str) -> String {
        match self.translate(text, target_language).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!("Translation to {} failed: {}", target_language, e);
                text.to_string()
            }
        }
    }
}
