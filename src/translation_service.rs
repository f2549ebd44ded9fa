/*!
 * Entry point for translating a document's content.
 *
 * [`TranslationService::translate_document`] validates an incoming
 * [`DocumentContent`], normalizes its locales, and runs the document content
 * translator for it while holding the document's lock.
 */

use log::{debug, error, info};
use url::Url;

use crate::database::Repository;
use crate::errors::TranslationError;
use crate::language_utils;
use crate::providers::BackendId;
use crate::translation::concurrency::{DocumentProcessKey, DocumentProcessManager};
use crate::translation::content::{DocumentContent, MediaType};
use crate::translation::core::DocumentContentTranslator;

/// Validates requests and coordinates document translation
#[derive(Debug, Clone)]
pub struct TranslationService {
    repository: Repository,
    translator: DocumentContentTranslator,
    locks: DocumentProcessManager,
    default_backend: BackendId,
    default_category: Option<String>,
}

impl TranslationService {
    pub fn new(
        repository: Repository,
        translator: DocumentContentTranslator,
        locks: DocumentProcessManager,
        default_backend: BackendId,
    ) -> Self {
        Self {
            repository,
            translator,
            locks,
            default_backend,
            default_category: None,
        }
    }

    /// Domain hint passed to backends that support one
    pub fn with_default_category(mut self, category: Option<String>) -> Self {
        self.default_category = category.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn lock_manager(&self) -> &DocumentProcessManager {
        &self.locks
    }

    pub fn default_backend(&self) -> BackendId {
        self.default_backend
    }

    /// Translate `content` into `target_locale`
    ///
    /// A blank `backend_id` selects the default backend. The response holds
    /// the translated units, the target locale, the backend used and the
    /// warnings for anything left untranslated.
    pub async fn translate_document(
        &self,
        content: DocumentContent,
        target_locale: &str,
        backend_id: Option<&str>,
    ) -> Result<DocumentContent, TranslationError> {
        let backend_id = BackendId::parse_optional(backend_id)?.unwrap_or(self.default_backend);
        Self::validate(&content, target_locale)?;

        let source_locale = language_utils::normalize_locale(&content.locale)
            .map_err(|e| TranslationError::invalid(e.to_string()))?;
        let target_locale = language_utils::normalize_locale(target_locale)
            .map_err(|e| TranslationError::invalid(e.to_string()))?;

        debug!(
            "Request translations: {} units of {} {} -> {} backendId:{}",
            content.contents.len(),
            content.url,
            source_locale,
            target_locale,
            backend_id
        );

        let key = DocumentProcessKey::new(&content.url, &source_locale, &target_locale);
        let result = self
            .locks
            .with_lock(&key, async {
                let mut document = self
                    .repository
                    .get_or_create_document(&content.url, &source_locale, &target_locale)
                    .await?;

                let (contents, warnings) = self
                    .translator
                    .translate(
                        &mut document,
                        &content.contents,
                        &source_locale,
                        &target_locale,
                        backend_id,
                        self.default_category.as_deref(),
                    )
                    .await?;

                let used_count = self.repository.increment_document_count(document.id).await?;
                debug!("Document {} used {} times", document.id, used_count);

                Ok(DocumentContent {
                    contents,
                    url: content.url.clone(),
                    locale: target_locale.clone(),
                    backend_id: Some(backend_id.to_string()),
                    warnings,
                })
            })
            .await;

        match &result {
            Ok(translated) => info!(
                "Translated {} into {} with {} warnings",
                translated.url,
                translated.locale,
                translated.warnings.len()
            ),
            Err(e) if e.is_invalid_input() => debug!("Rejected request for {}: {}", content.url, e),
            Err(e) => error!("Failed to translate {}: {}", content.url, e),
        }
        result
    }

    /// Reject requests that cannot be processed
    fn validate(content: &DocumentContent, target_locale: &str) -> Result<(), TranslationError> {
        if target_locale.trim().is_empty() {
            return Err(TranslationError::invalid("Invalid query param: targetLang"));
        }
        if content.contents.is_empty() {
            return Err(TranslationError::invalid(format!("Empty content: {}", content.url)));
        }
        if content.locale.trim().is_empty() {
            return Err(TranslationError::invalid("Empty locale"));
        }
        if !is_valid_url(&content.url) {
            return Err(TranslationError::invalid(format!("Invalid url: {}", content.url)));
        }
        for unit in &content.contents {
            if unit.value.trim().is_empty() || unit.media_type.trim().is_empty() {
                return Err(TranslationError::invalid(format!(
                    "Empty content: {:?}",
                    unit
                )));
            }
            unit.media_type.parse::<MediaType>()?;
        }
        Ok(())
    }
}

/// Absolute http(s) URL with a host
fn is_valid_url(value: &str) -> bool {
    match Url::parse(value.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
