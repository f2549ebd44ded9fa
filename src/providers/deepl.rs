/*!
 * DeepL API (v2) backend.
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

const DEFAULT_ENDPOINT: &str = "https://api.deepl.com";
const FREE_ENDPOINT: &str = "https://api-free.deepl.com";

/// Languages DeepL accepts as targets
const SUPPORTED_LANGUAGES: &[&str] = &[
    "ar", "bg", "cs", "da", "de", "el", "en", "es", "et", "fi", "fr", "hu", "id", "it", "ja",
    "ko", "lt", "lv", "nb", "nl", "pl", "pt", "ro", "ru", "sk", "sl", "sv", "tr", "uk", "zh",
];

#[derive(Debug, Serialize)]
struct DeepLRequest<'a> {
    text: &'a [String],
    target_lang: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag_handling: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DeepLTranslation {
    #[serde(default)]
    detected_source_language: Option<String>,
    text: String,
}

/// DeepL client
#[derive(Debug, Clone)]
pub struct DeepLBackend {
    http: RetryingClient,
    api_key: String,
    endpoint: String,
    char_limit: usize,
    locale_map: HashMap<String, String>,
}

impl DeepLBackend {
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!("API key is required for the deepl backend"));
        }
        // Free-tier keys carry a ":fx" suffix and live on a separate host
        let endpoint = if !config.endpoint.is_empty() {
            config.endpoint.trim_end_matches('/').to_string()
        } else if config.api_key.ends_with(":fx") {
            FREE_ENDPOINT.to_string()
        } else {
            DEFAULT_ENDPOINT.to_string()
        };

        Ok(Self {
            http: RetryingClient::from_config("DeepL", config),
            api_key: config.api_key.clone(),
            endpoint,
            char_limit: config.char_limit,
            locale_map: config.locale_map.clone(),
        })
    }

    /// DeepL target code: uppercase, with the regional variants it requires
    fn target_code(locale: &str) -> Option<String> {
        let language = language_utils::language_subtag(locale);
        if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
            return None;
        }
        let region = locale
            .split(['-', '_'])
            .nth(1)
            .map(|r| r.to_uppercase())
            .unwrap_or_default();

        Some(match (language.as_str(), region.as_str()) {
            ("en", "GB") => "EN-GB".to_string(),
            ("en", _) => "EN-US".to_string(),
            ("pt", "BR") => "PT-BR".to_string(),
            ("pt", _) => "PT-PT".to_string(),
            ("zh", "TW") | ("zh", "HANT") => "ZH-HANT".to_string(),
            ("zh", _) => "ZH-HANS".to_string(),
            _ => language.to_uppercase(),
        })
    }

    /// Source languages are given without a region
    fn source_code(code: &str) -> String {
        code.split('-').next().unwrap_or(code).to_uppercase()
    }
}

#[async_trait]
impl TranslationBackend for DeepLBackend {
    fn id(&self) -> BackendId {
        BackendId::DeepL
    }

    fn char_limit_per_request(&self) -> usize {
        self.char_limit
    }

    fn map_locale(&self, locale: &str) -> Option<String> {
        map_with_overrides(&self.locale_map, locale, Self::target_code)
    }

    async fn translate_batch(
        &self,
        sources: &[String],
        from: Option<&str>,
        to: &str,
        media_type: MediaType,
        _category: Option<&str>,
    ) -> Result<Vec<BackendTranslation>, ProviderError> {
        let request = DeepLRequest {
            text: sources,
            target_lang: to,
            source_lang: from.map(Self::source_code),
            tag_handling: match media_type {
                MediaType::Plain => None,
                MediaType::Html => Some("html"),
                MediaType::Xml => Some("xml"),
            },
        };
        let url = format!("{}/v2/translate", self.endpoint);
        let auth = format!("DeepL-Auth-Key {}", self.api_key);

        let response: DeepLResponse = self
            .http
            .send_json(|client| {
                client
                    .post(&url)
                    .header("Authorization", &auth)
                    .json(&request)
            })
            .await?;

        let translations = ensure_count(sources.len(), response.translations)?;
        Ok(translations
            .into_iter()
            .map(|t| BackendTranslation {
                raw_content: serde_json::to_string(&t).unwrap_or_else(|_| t.text.clone()),
                content: t.text,
            })
            .collect())
    }
}
