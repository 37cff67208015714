//! Cloud Translation (Basic, v2).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{GoogleClient, ProviderError, Translator};

const TRANSLATE_URL: &str = "https://translation.googleapis.com/language/translate/v2";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslationList,
}

#[derive(Debug, Deserialize)]
struct TranslationList {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

pub struct TranslateClient {
    client: GoogleClient,
}

impl TranslateClient {
    pub fn new(client: GoogleClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Translator for TranslateClient {
    async fn translate(&self, text: &str, target: &str) -> Result<String, ProviderError> {
        let request = TranslateRequest {
            q: text,
            target,
            format: "text",
        };
        let response: TranslateResponse = self.client.post_json(TRANSLATE_URL, &request).await?;
        first_translation(response)
    }
}

fn first_translation(response: TranslateResponse) -> Result<String, ProviderError> {
    let translation = response
        .data
        .translations
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Decode("no translations returned".to_string()))?;

    if let Some(source) = &translation.detected_source_language {
        tracing::debug!("Detected source language: {}", source);
    }

    Ok(translation.translated_text)
}
