/*!
 * Document content translation.
 *
 * [`DocumentContentTranslator`] turns the content units of one document into
 * their translations: every unit is segmented, the sendable fragments of all
 * units are grouped by the media type the backend should see, each group is
 * resolved through the [`TranslationCache`], and the units are reassembled.
 */

use log::info;
use std::sync::Arc;
use std::time::Instant;

use super::cache::{ResolveRequest, TranslationCache};
use super::content::{ContentUnit, MediaType, Warning};
use super::segmenter::{ContentSegmenter, SegmentedContent};
use crate::database::Document;
use crate::errors::TranslationError;
use crate::providers::{BackendId, BackendRegistry};

/// Fragments of one backend media type, in first-appearance order
struct FragmentGroup {
    media_type: MediaType,
    /// `(unit index, position among the unit's sendable fragments)`
    slots: Vec<(usize, usize)>,
    texts: Vec<String>,
}

/// Translates the content units of a document
#[derive(Debug, Clone)]
pub struct DocumentContentTranslator {
    cache: TranslationCache,
    segmenter: ContentSegmenter,
    backends: Arc<BackendRegistry>,
}

impl DocumentContentTranslator {
    pub fn new(cache: TranslationCache, segmenter: ContentSegmenter, backends: Arc<BackendRegistry>) -> Self {
        Self {
            cache,
            segmenter,
            backends,
        }
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    /// Translate `units` of `document` from `source_locale` to `target_locale`
    ///
    /// Returns the translated units in input order, with metadata and media
    /// type unchanged, and the warnings for content left untranslated. Any
    /// error aborts the whole call.
    pub async fn translate(
        &self,
        document: &mut Document,
        units: &[ContentUnit],
        source_locale: &str,
        target_locale: &str,
        backend_id: BackendId,
        category: Option<&str>,
    ) -> Result<(Vec<ContentUnit>, Vec<Warning>), TranslationError> {
        let started = Instant::now();

        let media_types = units
            .iter()
            .map(ContentUnit::parsed_media_type)
            .collect::<Result<Vec<_>, _>>()?;
        let backend = self.backends.get(backend_id)?;
        if backend.map_locale(target_locale).is_none() {
            return Err(TranslationError::invalid(format!(
                "Locale {} is not supported by backend {}",
                target_locale, backend_id
            )));
        }
        let max_length = backend.char_limit_per_request();

        let mut segmented: Vec<SegmentedContent> = Vec::with_capacity(units.len());
        let mut warnings = Vec::new();
        for (index, (unit, media_type)) in units.iter().zip(&media_types).enumerate() {
            let content = self
                .segmenter
                .segment(index, &unit.value, *media_type, max_length)?;
            warnings.extend(content.warnings.iter().cloned());
            segmented.push(content);
        }

        let groups = group_fragments(&segmented);
        let mut translations: Vec<Vec<Option<String>>> = segmented
            .iter()
            .map(|content| vec![None; content.sendable_count()])
            .collect();

        for group in &groups {
            let request = ResolveRequest {
                source_locale: source_locale.to_string(),
                target_locale: target_locale.to_string(),
                backend_id,
                media_type: group.media_type,
                category: category.map(str::to_string),
            };
            let resolved = self
                .cache
                .resolve(document, &request, backend.as_ref(), &group.texts)
                .await?;
            for (&(unit, position), translation) in group.slots.iter().zip(resolved) {
                translations[unit][position] = Some(translation);
            }
        }

        let mut translated = Vec::with_capacity(units.len());
        for ((unit, content), unit_translations) in units.iter().zip(&segmented).zip(translations) {
            let unit_translations = unit_translations
                .into_iter()
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| TranslationError::Storage("Missing fragment translation".to_string()))?;
            translated.push(ContentUnit {
                value: content.reassemble(&unit_translations)?,
                media_type: unit.media_type.clone(),
                metadata: unit.metadata.clone(),
            });
        }

        info!(
            "Translated {} units of {} ({} -> {}, {}) in {} groups with {} warnings in {:.2?}",
            units.len(),
            document.url,
            source_locale,
            target_locale,
            backend_id,
            groups.len(),
            warnings.len(),
            started.elapsed()
        );
        Ok((translated, warnings))
    }
}

fn group_fragments(segmented: &[SegmentedContent]) -> Vec<FragmentGroup> {
    let mut groups: Vec<FragmentGroup> = Vec::new();

    for (unit, content) in segmented.iter().enumerate() {
        for (position, fragment) in content.sendable().enumerate() {
            let media_type = fragment.backend_media_type(content.media_type);
            let index = match groups.iter().position(|g| g.media_type == media_type) {
                Some(index) => index,
                None => {
                    groups.push(FragmentGroup {
                        media_type,
                        slots: Vec::new(),
                        texts: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            groups[index].slots.push((unit, position));
            groups[index].texts.push(fragment.text.clone());
        }
    }
    groups
}
