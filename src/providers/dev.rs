/*!
 * Development backend.
 *
 * Wraps every source in a fixed marker instead of translating it, so the
 * whole pipeline can be exercised without credentials or network access.
 */

use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;

use crate::app_config::BackendConfig;
use crate::errors::ProviderError;
use crate::providers::{BackendId, BackendTranslation, TranslationBackend, map_with_overrides};
use crate::translation::content::MediaType;

/// Default per-request character limit
pub const DEFAULT_CHAR_LIMIT: usize = 10_000;

/// Pseudo-translating backend
#[derive(Debug, Clone)]
pub struct DevBackend {
    char_limit: usize,
    locale_map: HashMap<String, String>,
}

impl Default for DevBackend {
    fn default() -> Self {
        Self {
            char_limit: DEFAULT_CHAR_LIMIT,
            locale_map: HashMap::new(),
        }
    }
}

impl DevBackend {
    pub fn new(char_limit: usize) -> Self {
        Self {
            char_limit,
            ..Self::default()
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            char_limit: config.char_limit,
            locale_map: config.locale_map.clone(),
        }
    }

    /// The text this backend produces for `source`
    pub fn pseudo_translate(source: &str) -> String {
        format!("translated[网 {} 网]", source)
    }
}

#[async_trait]
impl TranslationBackend for DevBackend {
    fn id(&self) -> BackendId {
        BackendId::Dev
    }

    fn char_limit_per_request(&self) -> usize {
        self.char_limit
    }

    fn map_locale(&self, locale: &str) -> Option<String> {
        map_with_overrides(&self.locale_map, locale, |l| Some(l.to_string()))
    }

    async fn translate_batch(
        &self,
        sources: &[String],
        from: Option<&str>,
        to: &str,
        media_type: MediaType,
        _category: Option<&str>,
    ) -> Result<Vec<BackendTranslation>, ProviderError> {
        debug!(
            "Dev backend translating {} {} strings {} -> {}",
            sources.len(),
            media_type,
            from.unwrap_or("auto"),
            to
        );

        Ok(sources
            .iter()
            .map(|source| BackendTranslation::new(Self::pseudo_translate(source)))
            .collect())
    }
}
