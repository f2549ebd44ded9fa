/*!
 * Translation backends.
 *
 * Every machine translation engine implements [`TranslationBackend`]. The
 * engines available at runtime are collected once at startup in a
 * [`BackendRegistry`] keyed by [`BackendId`]:
 * - `dev`: deterministic pseudo-translation, no network
 * - `google`: Google Cloud Translation v2
 * - `deepl`: DeepL API v2
 * - `ms`: Microsoft Translator v3
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;

use crate::app_config::BackendConfig;
use crate::errors::{ProviderError, TranslationError};
use crate::translation::content::MediaType;

pub mod deepl;
pub mod dev;
pub mod google;
pub mod http;
pub mod microsoft;
pub mod mock;

/// Identifier of a translation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    Dev,
    Google,
    DeepL,
    #[serde(rename = "ms", alias = "microsoft")]
    Microsoft,
}

impl BackendId {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::Dev => "dev",
            BackendId::Google => "google",
            BackendId::DeepL => "deepl",
            BackendId::Microsoft => "ms",
        }
    }

    /// Parse an optional id; a blank id means "use the default"
    pub fn parse_optional(value: Option<&str>) -> Result<Option<Self>, TranslationError> {
        match value.map(str::trim) {
            None | Some("") => Ok(None),
            Some(id) => id.parse().map(Some),
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" => Ok(BackendId::Dev),
            "google" => Ok(BackendId::Google),
            "deepl" => Ok(BackendId::DeepL),
            "ms" | "microsoft" => Ok(BackendId::Microsoft),
            _ => Err(TranslationError::invalid(format!(
                "can not parse [{}] to a BackendID",
                s
            ))),
        }
    }
}

/// One translated string as returned by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTranslation {
    /// Translation used in documents
    pub content: String,
    /// Unmodified backend output
    pub raw_content: String,
}

impl BackendTranslation {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            raw_content: content.clone(),
            content,
        }
    }
}

/// A machine translation engine
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Identifier of this engine
    fn id(&self) -> BackendId;

    /// Largest number of characters accepted in one request
    fn char_limit_per_request(&self) -> usize;

    /// Engine-specific code for a locale, or `None` if unsupported
    fn map_locale(&self, locale: &str) -> Option<String>;

    /// Translate a batch of strings, returning one result per source in order
    ///
    /// # Arguments
    /// * `sources` - Texts to translate
    /// * `from` - Engine source locale, `None` to auto-detect
    /// * `to` - Engine target locale
    /// * `media_type` - How the engine should treat markup in `sources`
    /// * `category` - Optional engine domain hint
    async fn translate_batch(
        &self,
        sources: &[String],
        from: Option<&str>,
        to: &str,
        media_type: MediaType,
        category: Option<&str>,
    ) -> Result<Vec<BackendTranslation>, ProviderError>;
}

/// Configured backends keyed by id
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<BackendId, Arc<dyn TranslationBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every backend listed in the configuration
    pub fn from_configs(configs: &[BackendConfig]) -> anyhow::Result<Self> {
        let mut registry = Self::new();
        for config in configs {
            registry.register(build_backend(config)?);
        }
        Ok(registry)
    }

    /// Add or replace a backend
    pub fn register(&mut self, backend: Arc<dyn TranslationBackend>) {
        self.backends.insert(backend.id(), backend);
    }

    pub fn with(mut self, backend: Arc<dyn TranslationBackend>) -> Self {
        self.register(backend);
        self
    }

    /// Look up a backend
    pub fn get(&self, id: BackendId) -> Result<Arc<dyn TranslationBackend>, TranslationError> {
        self.backends
            .get(&id)
            .cloned()
            .ok_or_else(|| TranslationError::invalid(format!("Unsupported backendId:{}", id)))
    }

    pub fn contains(&self, id: BackendId) -> bool {
        self.backends.contains_key(&id)
    }

    /// Registered ids in display order
    pub fn ids(&self) -> Vec<BackendId> {
        let mut ids: Vec<_> = self.backends.keys().copied().collect();
        ids.sort_by_key(|id| id.as_str());
        ids
    }
}

/// Construct the backend described by a configuration entry
pub fn build_backend(config: &BackendConfig) -> anyhow::Result<Arc<dyn TranslationBackend>> {
    let backend: Arc<dyn TranslationBackend> = match config.backend {
        BackendId::Dev => Arc::new(dev::DevBackend::from_config(config)),
        BackendId::Google => Arc::new(google::GoogleBackend::from_config(config)?),
        BackendId::DeepL => Arc::new(deepl::DeepLBackend::from_config(config)?),
        BackendId::Microsoft => Arc::new(microsoft::MicrosoftBackend::from_config(config)?),
    };
    Ok(backend)
}

/// Apply configured locale overrides before a backend's own mapping
pub(crate) fn map_with_overrides(
    overrides: &HashMap<String, String>,
    locale: &str,
    default: impl FnOnce(&str) -> Option<String>,
) -> Option<String> {
    overrides
        .iter()
        .find(|(from, _)| from.eq_ignore_ascii_case(locale))
        .map(|(_, to)| to.clone())
        .or_else(|| default(locale))
}
