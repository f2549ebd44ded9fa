/*!
 * Google Cloud Translation (v2) backend.
 */

use async_trait::async_trait;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::app_config::BackendConfig;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::http::{RetryingClient, ensure_count};
use crate::providers::{BackendId, BackendTranslation, TranslationBackend, map_with_overrides};
use crate::translation::content::MediaType;

const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

/// Request body for `POST /language/translate/v2`
#[derive(Debug, Serialize)]
struct GoogleRequest<'a> {
    q: &'a [String],
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Debug, Deserialize)]
struct GoogleData {
    translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    translated_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detected_source_language: Option<String>,
}

/// Google Translate client
#[derive(Debug, Clone)]
pub struct GoogleBackend {
    http: RetryingClient,
    api_key: String,
    endpoint: String,
    char_limit: usize,
    locale_map: HashMap<String, String>,
}

impl GoogleBackend {
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!("API key is required for the google backend"));
        }
        let endpoint = if config.endpoint.is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            config.endpoint.trim_end_matches('/').to_string()
        };

        Ok(Self {
            http: RetryingClient::from_config("Google Translate", config),
            api_key: config.api_key.clone(),
            endpoint,
            char_limit: config.char_limit,
            locale_map: config.locale_map.clone(),
        })
    }

    /// Google keeps the region only for Chinese
    fn google_code(locale: &str) -> Option<String> {
        let language = language_utils::language_subtag(locale);
        language_utils::primary_language(&language)?;
        match language.as_str() {
            "zh" => {
                let region = locale.split(['-', '_']).nth(1).unwrap_or("CN").to_uppercase();
                Some(match region.as_str() {
                    "TW" | "HK" | "MO" | "HANT" => "zh-TW".to_string(),
                    _ => "zh-CN".to_string(),
                })
            }
            "he" => Some("iw".to_string()),
            _ => Some(language),
        }
    }
}

#[async_trait]
impl TranslationBackend for GoogleBackend {
    fn id(&self) -> BackendId {
        BackendId::Google
    }

    fn char_limit_per_request(&self) -> usize {
        self.char_limit
    }

    fn map_locale(&self, locale: &str) -> Option<String> {
        map_with_overrides(&self.locale_map, locale, Self::google_code)
    }

    async fn translate_batch(
        &self,
        sources: &[String],
        from: Option<&str>,
        to: &str,
        media_type: MediaType,
        _category: Option<&str>,
    ) -> Result<Vec<BackendTranslation>, ProviderError> {
        let request = GoogleRequest {
            q: sources,
            target: to,
            source: from,
            format: if media_type.is_markup() { "html" } else { "text" },
        };

        let response: GoogleResponse = self
            .http
            .send_json(|client| {
                client
                    .post(&self.endpoint)
                    .query(&[("key", self.api_key.as_str())])
                    .json(&request)
            })
            .await?;

        let translations = ensure_count(sources.len(), response.data.translations)?;
        Ok(translations
            .into_iter()
            .map(|t| BackendTranslation {
                raw_content: serde_json::to_string(&t).unwrap_or_else(|_| t.translated_text.clone()),
                content: t.translated_text,
            })
            .collect())
    }
}
