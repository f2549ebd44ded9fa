/*!
 * Common test utilities for the doc-mt test suite
 */

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use doc_mt::database::Repository;
use doc_mt::providers::BackendRegistry;
use doc_mt::providers::mock::MockBackend;
use doc_mt::translation::{
    ContentSegmenter, DocumentProcessManager, DocumentContentTranslator, InMemoryLockStore,
    TranslationCache,
};
use doc_mt::{BackendId, ContentUnit, DocumentContent, TranslationService};

pub const PAGE_URL: &str = "https://example.com/page";

/// Routes library logs to the test output; repeated calls are no-ops
pub fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// Translation service over an in-memory store and the given mock backends
pub fn service_with(backends: Vec<MockBackend>) -> TranslationService {
    service_with_locks(backends, DocumentProcessManager::in_memory())
}

/// Translation service with a custom lock manager
pub fn service_with_locks(backends: Vec<MockBackend>, locks: DocumentProcessManager) -> TranslationService {
    init_test_logging();
    let repository = Repository::new_in_memory().expect("in-memory repository");
    service_on(repository, backends, locks)
}

/// Translation service over an existing repository
pub fn service_on(
    repository: Repository,
    backends: Vec<MockBackend>,
    locks: DocumentProcessManager,
) -> TranslationService {
    let mut registry = BackendRegistry::new();
    for backend in backends {
        registry.register(Arc::new(backend));
    }
    let translator = DocumentContentTranslator::new(
        TranslationCache::new(repository.clone()),
        ContentSegmenter::default(),
        Arc::new(registry),
    );
    TranslationService::new(repository, translator, locks, BackendId::Dev)
}

/// Lock manager over process memory with short timings
pub fn quick_locks(lease: Duration, acquire_timeout: Duration) -> DocumentProcessManager {
    DocumentProcessManager::new(
        Arc::new(InMemoryLockStore::new()),
        lease,
        acquire_timeout,
        Duration::from_millis(10),
    )
}

/// Request payload for `PAGE_URL` in English
pub fn page(units: Vec<ContentUnit>) -> DocumentContent {
    DocumentContent::new(units, PAGE_URL, "en")
}

/// Plain text units
pub fn plain_units(texts: &[&str]) -> Vec<ContentUnit> {
    texts.iter().map(|t| ContentUnit::new(*t, "text/plain")).collect()
}

/// Writes a request payload as JSON into `dir`
pub fn write_payload(dir: &Path, filename: &str, content: &DocumentContent) -> Result<PathBuf> {
    let path = dir.join(filename);
    std::fs::write(&path, serde_json::to_string_pretty(content)?)?;
    Ok(path)
}
