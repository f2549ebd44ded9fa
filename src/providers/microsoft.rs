/*!
 * Microsoft Translator (v3) backend.
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

const DEFAULT_ENDPOINT: &str = "https://api.cognitive.microsofttranslator.com";
const API_VERSION: &str = "3.0";

#[derive(Debug, Serialize)]
struct MsText<'a> {
    #[serde(rename = "Text")]
    text: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MsResult {
    translations: Vec<MsTranslation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detected_language: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MsTranslation {
    text: String,
    to: String,
}

/// Microsoft Translator client
#[derive(Debug, Clone)]
pub struct MicrosoftBackend {
    http: RetryingClient,
    api_key: String,
    endpoint: String,
    region: Option<String>,
    char_limit: usize,
    locale_map: HashMap<String, String>,
}

impl MicrosoftBackend {
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!("API key is required for the ms backend"));
        }
        let endpoint = if config.endpoint.is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            config.endpoint.trim_end_matches('/').to_string()
        };

        Ok(Self {
            http: RetryingClient::from_config("Microsoft Translator", config),
            api_key: config.api_key.clone(),
            endpoint,
            region: config.region.clone().filter(|r| !r.is_empty()),
            char_limit: config.char_limit,
            locale_map: config.locale_map.clone(),
        })
    }

    /// Microsoft names Chinese variants by script
    fn ms_code(locale: &str) -> Option<String> {
        language_utils::primary_language(locale)?;
        Some(match locale {
            "zh-CN" | "zh-SG" | "zh" => "zh-Hans".to_string(),
            "zh-TW" | "zh-HK" | "zh-MO" => "zh-Hant".to_string(),
            "pt-PT" => "pt-pt".to_string(),
            "fr-CA" => "fr-ca".to_string(),
            "sr-Latn" | "sr-Latn-RS" => "sr-Latn".to_string(),
            "sr-Cyrl" | "sr-Cyrl-RS" => "sr-Cyrl".to_string(),
            _ => language_utils::language_subtag(locale),
        })
    }
}

#[async_trait]
impl TranslationBackend for MicrosoftBackend {
    fn id(&self) -> BackendId {
        BackendId::Microsoft
    }

    fn char_limit_per_request(&self) -> usize {
        self.char_limit
    }

    fn map_locale(&self, locale: &str) -> Option<String> {
        map_with_overrides(&self.locale_map, locale, Self::ms_code)
    }

    async fn translate_batch(
        &self,
        sources: &[String],
        from: Option<&str>,
        to: &str,
        media_type: MediaType,
        category: Option<&str>,
    ) -> Result<Vec<BackendTranslation>, ProviderError> {
        let body: Vec<MsText<'_>> = sources.iter().map(|s| MsText { text: s }).collect();

        let mut query: Vec<(&str, &str)> = vec![
            ("api-version", API_VERSION),
            ("to", to),
            ("textType", if media_type.is_markup() { "html" } else { "plain" }),
        ];
        if let Some(from) = from {
            query.push(("from", from));
        }
        if let Some(category) = category.filter(|c| !c.is_empty()) {
            query.push(("category", category));
        }
        let url = format!("{}/translate", self.endpoint);

        let results: Vec<MsResult> = self
            .http
            .send_json(|client| {
                let mut request = client
                    .post(&url)
                    .query(&query)
                    .header("Ocp-Apim-Subscription-Key", &self.api_key)
                    .json(&body);
                if let Some(region) = &self.region {
                    request = request.header("Ocp-Apim-Subscription-Region", region);
                }
                request
            })
            .await?;

        let results = ensure_count(sources.len(), results)?;
        results
            .into_iter()
            .map(|result| {
                let raw_content = serde_json::to_string(&result)
                    .map_err(|e| ProviderError::ParseError(e.to_string()))?;
                let content = result
                    .translations
                    .into_iter()
                    .next()
                    .map(|t| t.text)
                    .ok_or_else(|| {
                        ProviderError::ParseError("Translation result without translations".to_string())
                    })?;
                Ok(BackendTranslation { content, raw_content })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> MicrosoftBackend {
        MicrosoftBackend::from_config(&BackendConfig {
            api_key: "key".to_string(),
            region: Some("westeurope".to_string()),
            ..BackendConfig::new(BackendId::Microsoft)
        })
        .unwrap()
    }

    #[test]
    fn test_mapLocale_shouldUseScriptNamesForChinese() {
        let backend = backend();

        assert_eq!(backend.map_locale("zh-CN").as_deref(), Some("zh-Hans"));
        assert_eq!(backend.map_locale("zh-TW").as_deref(), Some("zh-Hant"));
        assert_eq!(backend.map_locale("de-DE").as_deref(), Some("de"));
        assert_eq!(backend.map_locale("xx"), None);
    }

    #[test]
    fn test_fromConfig_shouldKeepRegion() {
        assert_eq!(backend().region.as_deref(), Some("westeurope"));
        assert!(MicrosoftBackend::from_config(&BackendConfig::new(BackendId::Microsoft)).is_err());
    }

    #[test]
    fn test_response_shouldDeserialize() {
        let json = r#"[{"detectedLanguage":{"language":"en","score":1.0},"translations":[{"text":"Hallo","to":"de"}]}]"#;

        let results: Vec<MsResult> = serde_json::from_str(json).unwrap();

        assert_eq!(results[0].translations[0].text, "Hallo");
        assert_eq!(results[0].translations[0].to, "de");
    }

    #[test]
    fn test_body_shouldUseCapitalizedTextKey() {
        let body = vec![MsText { text: "Hello" }];

        assert_eq!(serde_json::to_string(&body).unwrap(), r#"[{"Text":"Hello"}]"#);
    }
}
