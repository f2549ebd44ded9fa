/*!
 * Translation reuse backed by the text flow store.
 *
 * Every fragment is looked up by content hash, first among the text flows
 * the document already owns and then among the most recent text flow with
 * the same source locale in any document. Only what is still missing goes to
 * the backend: deduplicated, packed into requests under the backend's
 * character limit and sent with bounded concurrency. Nothing is written
 * until every request has succeeded.
 */

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

use crate::database::models::NewTarget;
use crate::database::{Document, MtRequestRecord, Repository, StagedTextFlow};
use crate::errors::{ProviderError, TranslationError};
use crate::providers::{BackendId, TranslationBackend};
use crate::translation::content::MediaType;

/// Default number of backend requests in flight per resolve
pub const DEFAULT_CONCURRENT_REQUESTS: usize = 4;

/// Locale, backend and format settings for one resolve call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub source_locale: String,
    pub target_locale: String,
    pub backend_id: BackendId,
    pub media_type: MediaType,
    pub category: Option<String>,
}

/// A distinct source text that needs a backend translation
#[derive(Debug)]
struct Miss {
    text: String,
    hash: String,
    /// Index into the staged text flows receiving the translation
    staged: usize,
}

/// Store-backed translation cache
#[derive(Debug, Clone)]
pub struct TranslationCache {
    repository: Repository,
    /// Backend requests allowed in flight at once
    concurrency: usize,
}

impl TranslationCache {
    pub fn new(repository: Repository) -> Self {
        Self::with_concurrency(repository, DEFAULT_CONCURRENT_REQUESTS)
    }

    pub fn with_concurrency(repository: Repository, concurrency: usize) -> Self {
        Self {
            repository,
            concurrency: concurrency.max(1),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Translate `texts` for `document`, reusing stored translations
    ///
    /// Returns one translation per text in input order. Text flows and
    /// targets written by this call are added to `document.text_flows`.
    pub async fn resolve(
        &self,
        document: &mut Document,
        request: &ResolveRequest,
        backend: &dyn TranslationBackend,
        texts: &[String],
    ) -> Result<Vec<String>, TranslationError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let backend_key = request.backend_id.as_str();
        let target_code = backend.map_locale(&request.target_locale).ok_or_else(|| {
            TranslationError::invalid(format!(
                "Locale {} is not supported by backend {}",
                request.target_locale, request.backend_id
            ))
        })?;
        let source_code = backend.map_locale(&request.source_locale);

        let mut resolved: HashMap<String, String> = HashMap::new();
        let mut staged: Vec<StagedTextFlow> = Vec::new();
        let mut misses: Vec<Miss> = Vec::new();
        let mut missed_hashes: HashSet<String> = HashSet::new();
        let mut hashes = Vec::with_capacity(texts.len());

        for text in texts {
            let hash = Repository::hash_text(text);
            hashes.push(hash.clone());

            if resolved.contains_key(&hash) || missed_hashes.contains(&hash) {
                continue;
            }

            if let Some(flow) = document.text_flow(&hash) {
                match flow.target_for(&request.target_locale, backend_key) {
                    Some(target) => {
                        debug!("Reusing translation of text flow {} in document {}", flow.id, document.id);
                        resolved.insert(hash, target.content.clone());
                    }
                    None => {
                        staged.push(StagedTextFlow::existing(flow));
                        missed_hashes.insert(hash.clone());
                        misses.push(Miss { text: text.clone(), hash, staged: staged.len() - 1 });
                    }
                }
                continue;
            }

            let latest = self
                .repository
                .find_latest_text_flow(&request.source_locale, &hash)
                .await?;

            match latest {
                Some(flow) if flow.document_id == document.id => {
                    // Stored for this document after it was loaded
                    match flow.target_for(&request.target_locale, backend_key) {
                        Some(target) => {
                            resolved.insert(hash, target.content.clone());
                        }
                        None => {
                            staged.push(StagedTextFlow::existing(&flow));
                            missed_hashes.insert(hash.clone());
                            misses.push(Miss { text: text.clone(), hash, staged: staged.len() - 1 });
                        }
                    }
                }
                Some(flow) => {
                    let mut copy = StagedTextFlow::new(flow.content.clone(), flow.locale.clone(), hash.clone());
                    match flow.target_for(&request.target_locale, backend_key) {
                        Some(target) => {
                            debug!(
                                "Copying text flow {} from document {} into document {}",
                                flow.id, flow.document_id, document.id
                            );
                            copy.targets.push(NewTarget {
                                locale: target.locale.clone(),
                                backend_id: target.backend_id.clone(),
                                content: target.content.clone(),
                                raw_content: target.raw_content.clone(),
                            });
                            resolved.insert(hash, target.content.clone());
                            staged.push(copy);
                        }
                        None => {
                            staged.push(copy);
                            missed_hashes.insert(hash.clone());
                            misses.push(Miss { text: text.clone(), hash, staged: staged.len() - 1 });
                        }
                    }
                }
                None => {
                    staged.push(StagedTextFlow::new(text.clone(), request.source_locale.clone(), hash.clone()));
                    missed_hashes.insert(hash.clone());
                    misses.push(Miss { text: text.clone(), hash, staged: staged.len() - 1 });
                }
            }
        }

        debug!(
            "Document {}: {} of {} distinct texts reused, {} sent to {}",
            document.id,
            resolved.len(),
            resolved.len() + misses.len(),
            misses.len(),
            backend_key
        );

        let mut mt_requests = Vec::new();
        if !misses.is_empty() {
            let chunks = chunk_by_char_limit(&misses, backend.char_limit_per_request());
            let from = source_code.as_deref();
            let to = target_code.as_str();
            let category = request.category.as_deref();
            let media_type = request.media_type;

            let responses: Vec<(Vec<usize>, Vec<_>)> = stream::iter(chunks.into_iter().map(|chunk| {
                let sources: Vec<String> = chunk.iter().map(|&i| misses[i].text.clone()).collect();
                async move {
                    let results = backend
                        .translate_batch(&sources, from, to, media_type, category)
                        .await?;
                    if results.len() != sources.len() {
                        return Err(ProviderError::ResponseMismatch {
                            expected: sources.len(),
                            received: results.len(),
                        });
                    }
                    Ok::<_, ProviderError>((chunk, results))
                }
            }))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

            for (chunk, results) in responses {
                let sources: Vec<(String, String)> = chunk
                    .iter()
                    .map(|&i| (misses[i].text.clone(), misses[i].hash.clone()))
                    .collect();
                mt_requests.push(MtRequestRecord::new(document.id, backend_key, &sources));

                for (&i, translation) in chunk.iter().zip(results) {
                    let miss = &misses[i];
                    staged[miss.staged].targets.push(NewTarget {
                        locale: request.target_locale.clone(),
                        backend_id: backend_key.to_string(),
                        content: translation.content.clone(),
                        raw_content: translation.raw_content,
                    });
                    resolved.insert(miss.hash.clone(), translation.content);
                }
            }
        }

        if !staged.is_empty() {
            let request_count = mt_requests.len();
            let stored = self
                .repository
                .commit_text_flows(document.id, staged, mt_requests)
                .await?;
            info!(
                "Stored {} text flows for document {} ({} backend requests)",
                stored.len(),
                document.id,
                request_count
            );
            for flow in stored {
                document.text_flows.insert(flow.content_hash.clone(), flow);
            }
        }

        hashes
            .iter()
            .map(|hash| {
                resolved.get(hash).cloned().ok_or_else(|| {
                    TranslationError::Storage(format!("No translation resolved for hash {}", hash))
                })
            })
            .collect()
    }
}

/// Pack misses into requests whose summed length stays within `limit`
///
/// A text longer than the limit gets a request of its own.
fn chunk_by_char_limit(misses: &[Miss], limit: usize) -> Vec<Vec<usize>> {
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    let mut current_chars = 0;

    for (index, miss) in misses.iter().enumerate() {
        let chars = miss.text.chars().count();
        if !current.is_empty() && current_chars + chars > limit {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current.push(index);
        current_chars += chars;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
