use anyhow::{Context, Result};
use log::{info, warn};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::Config;
use crate::database::{DatabaseConnection, Repository};
use crate::errors::AppError;
use crate::providers::BackendRegistry;
use crate::translation::{
    ContentSegmenter, DocumentContent, DocumentContentTranslator, DocumentProcessManager,
    TranslationCache,
};
use crate::translation_service::TranslationService;

// @module: Application controller wiring configuration to the translation service

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Fully wired translation service
    service: TranslationService,
}

impl Controller {
    /// Create a controller over an in-memory store, for tests
    pub fn new_for_test() -> Result<Self> {
        Self::with_repository(Config::default(), Repository::new_in_memory()?)
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let db = match &config.database.path {
            Some(path) => DatabaseConnection::new(path)?,
            None => DatabaseConnection::new_default()?,
        };
        Self::with_repository(config, Repository::new(db))
    }

    /// Create a controller over an existing repository
    pub fn with_repository(config: Config, repository: Repository) -> Result<Self> {
        let backends = BackendRegistry::from_configs(&config.backends)
            .context("Failed to initialize translation backends")?;
        Ok(Self::with_backends(config, repository, backends))
    }

    /// Create a controller with explicitly constructed backends
    pub fn with_backends(config: Config, repository: Repository, backends: BackendRegistry) -> Self {
        let cache = TranslationCache::with_concurrency(repository.clone(), config.concurrent_requests());
        let segmenter = ContentSegmenter::new(
            config.segmentation.non_translatable.clone(),
            config.segmentation.placeholder_prefix.clone(),
        );
        let translator = DocumentContentTranslator::new(cache, segmenter, Arc::new(backends));
        let locks = DocumentProcessManager::from_config(&config.lock, Some(repository.connection()));
        let service = TranslationService::new(repository, translator, locks, config.default_backend)
            .with_default_category(config.default_category.clone());

        info!(
            "Translation service ready (default backend: {}, lock store: {:?})",
            config.default_backend, config.lock.store
        );
        Self { config, service }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> &TranslationService {
        &self.service
    }

    /// Translate a JSON payload file
    ///
    /// The result is written as pretty JSON to `output` when given.
    pub async fn translate_file(
        &self,
        input: &Path,
        target_lang: &str,
        backend: Option<&str>,
        output: Option<&Path>,
    ) -> Result<DocumentContent, AppError> {
        let started = Instant::now();
        let payload = std::fs::read_to_string(input)
            .map_err(|e| AppError::File(format!("Failed to read {}: {}", input.display(), e)))?;
        let content: DocumentContent = serde_json::from_str(&payload)
            .map_err(|e| AppError::File(format!("Invalid payload {}: {}", input.display(), e)))?;

        let translated = self
            .service
            .translate_document(content, target_lang, backend)
            .await?;

        for warning in &translated.warnings {
            warn!("{}", warning);
        }
        if let Some(output) = output {
            let json = serde_json::to_string_pretty(&translated)
                .map_err(|e| AppError::Unknown(e.to_string()))?;
            std::fs::write(output, json)?;
            info!("Success: {}", output.display());
        }

        info!(
            "Translation completed in {}.",
            Self::format_duration(started.elapsed())
        );
        Ok(translated)
    }

    /// Human-readable summary of the store, optionally for one url
    pub async fn stats_report(&self, url: Option<&str>) -> Result<String> {
        let repository = self.service.repository();
        let stats = repository.connection().stats()?;
        let usage = repository.mt_request_stats().await?;

        let mut report = String::new();
        writeln!(report, "{}", stats)?;
        for backend in &usage {
            writeln!(
                report,
                "  {}: {} requests, {} words, {} chars",
                backend.backend_id, backend.request_count, backend.word_count, backend.char_count
            )?;
        }

        if let Some(url) = url {
            let documents = repository.find_documents_by_url(url, None, None).await?;
            if documents.is_empty() {
                writeln!(report, "No documents for {}", url)?;
            }
            for document in documents {
                writeln!(
                    report,
                    "{} ({} -> {}): used {} times, last {}",
                    document.url,
                    document.source_locale,
                    document.target_locale,
                    document.used_count,
                    document.updated_at
                )?;
            }
        }
        Ok(report)
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
