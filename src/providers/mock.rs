/*!
 * Mock backend implementations for testing.
 *
 * The mock records every batch it receives so tests can assert on how the
 * pipeline batches, deduplicates and caches:
 * - `MockBackend::working()` - prefixes every source with `[{to}] `
 * - `MockBackend::failing()` - always fails with an API error
 * - `MockBackend::wrong_count()` - returns one result too few
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{BackendId, BackendTranslation, TranslationBackend};
use crate::translation::content::MediaType;

/// One recorded `translate_batch` call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub sources: Vec<String>,
    pub from: Option<String>,
    pub to: String,
    pub media_type: MediaType,
    pub category: Option<String>,
}

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns one result fewer than the number of sources
    WrongCount,
}

/// Mock backend for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockBackend {
    id: BackendId,
    behavior: MockBehavior,
    char_limit: usize,
    delay: Option<Duration>,
    /// Fixed translations by source text
    fixed: HashMap<String, String>,
    /// Locales this backend refuses to map
    unsupported_locales: HashSet<String>,
    request_count: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockBackend {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            id: BackendId::Dev,
            behavior,
            char_limit: 10_000,
            delay: None,
            fixed: HashMap::new(),
            unsupported_locales: HashSet::new(),
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn wrong_count() -> Self {
        Self::new(MockBehavior::WrongCount)
    }

    /// Report a different backend id
    pub fn with_id(mut self, id: BackendId) -> Self {
        self.id = id;
        self
    }

    pub fn with_char_limit(mut self, char_limit: usize) -> Self {
        self.char_limit = char_limit;
        self
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Return `translation` whenever `source` is requested
    pub fn with_translation(mut self, source: impl Into<String>, translation: impl Into<String>) -> Self {
        self.fixed.insert(source.into(), translation.into());
        self
    }

    /// Make `map_locale` fail for `locale`
    pub fn without_locale(mut self, locale: impl Into<String>) -> Self {
        self.unsupported_locales.insert(locale.into());
        self
    }

    /// Default translation of `source` into `to`
    pub fn translate_text(source: &str, to: &str) -> String {
        format!("[{}] {}", to, source)
    }

    /// Number of `translate_batch` calls so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// All recorded calls in arrival order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Every source string sent so far, flattened
    pub fn sent_sources(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .flat_map(|call| call.sources.iter().cloned())
            .collect()
    }

    fn respond(&self, sources: &[String], to: &str) -> Vec<BackendTranslation> {
        sources
            .iter()
            .map(|source| {
                let text = self
                    .fixed
                    .get(source)
                    .cloned()
                    .unwrap_or_else(|| Self::translate_text(source, to));
                BackendTranslation {
                    raw_content: format!("{{\"text\":{:?}}}", text),
                    content: text,
                }
            })
            .collect()
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    fn char_limit_per_request(&self) -> usize {
        self.char_limit
    }

    fn map_locale(&self, locale: &str) -> Option<String> {
        if self.unsupported_locales.contains(locale) {
            None
        } else {
            Some(locale.to_string())
        }
    }

    async fn translate_batch(
        &self,
        sources: &[String],
        from: Option<&str>,
        to: &str,
        media_type: MediaType,
        category: Option<&str>,
    ) -> Result<Vec<BackendTranslation>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(MockCall {
            sources: sources.to_vec(),
            from: from.map(str::to_string),
            to: to.to_string(),
            media_type,
            category: category.map(str::to_string),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.behavior {
            MockBehavior::Working => Ok(self.respond(sources, to)),
            MockBehavior::Intermittent { fail_every } if count % fail_every == fail_every - 1 => {
                Err(ProviderError::ApiError {
                    status_code: 503,
                    message: format!("Simulated intermittent failure (request #{})", count + 1),
                })
            }
            MockBehavior::Intermittent { .. } => Ok(self.respond(sources, to)),
            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated backend failure".to_string(),
            }),
            MockBehavior::WrongCount => {
                let mut results = self.respond(sources, to);
                results.pop();
                Ok(results)
            }
        }
    }
}
