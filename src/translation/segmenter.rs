/*!
 * Content segmentation.
 *
 * Turns one content unit into the fragments that are sent to a backend plus
 * everything needed to put the translated fragments back together:
 *
 * - plain text is sent whole, or sentence by sentence when over the limit
 * - markup is sent whole when it fits, otherwise element by element, falling
 *   back to sentences for long runs of text
 * - non-translatable elements are masked with placeholders first
 *
 * Anything that still does not fit is kept untranslated and reported as a
 * warning. Lengths are counted in characters.
 */

use log::{debug, warn};
use std::ops::Range;

use crate::errors::{ProviderError, TranslationError};
use crate::translation::content::{MediaType, Warning};
use crate::translation::markup::{
    self, MarkupNode, MarkupSyntax, MarkupTree, NonTranslatableRules, Placeholder,
};
use crate::translation::sentences;

/// What a fragment holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// Decoded text
    Plain,
    /// Serialized markup including its tags
    HtmlNode,
}

/// A piece of a content unit translated on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Text sent to the backend
    pub text: String,
    pub kind: FragmentKind,
    /// Byte range in [`SegmentedContent::source`] this fragment replaces
    pub extent: Range<usize>,
    /// Kept untranslated because it is too long
    pub skip: bool,
    /// Translation must be escaped before going back into markup
    escape: bool,
}

impl Fragment {
    /// Media type the backend should treat this fragment as
    pub fn backend_media_type(&self, unit: MediaType) -> MediaType {
        match self.kind {
            FragmentKind::Plain => MediaType::Plain,
            FragmentKind::HtmlNode => unit,
        }
    }
}

/// Result of segmenting one content unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedContent {
    pub media_type: MediaType,
    /// Text the fragment extents point into
    pub source: String,
    /// Fragments in source order
    pub fragments: Vec<Fragment>,
    pub placeholders: Vec<Placeholder>,
    pub warnings: Vec<Warning>,
}

impl SegmentedContent {
    fn unchanged(media_type: MediaType, value: &str) -> Self {
        Self {
            media_type,
            source: value.to_string(),
            fragments: Vec::new(),
            placeholders: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Fragments that need a translation, in order
    pub fn sendable(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter().filter(|fragment| !fragment.skip)
    }

    pub fn sendable_count(&self) -> usize {
        self.sendable().count()
    }

    /// Rebuild the unit from one translation per sendable fragment
    pub fn reassemble<S: AsRef<str>>(&self, translations: &[S]) -> Result<String, TranslationError> {
        let expected = self.sendable_count();
        if translations.len() != expected {
            return Err(ProviderError::ResponseMismatch {
                expected,
                received: translations.len(),
            }
            .into());
        }

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        let mut translated = translations.iter();
        for fragment in &self.fragments {
            out.push_str(&self.source[cursor..fragment.extent.start]);
            if fragment.skip {
                out.push_str(&self.source[fragment.extent.clone()]);
            } else if let Some(text) = translated.next() {
                if fragment.escape {
                    out.push_str(&markup::escape_text(text.as_ref()));
                } else {
                    out.push_str(text.as_ref());
                }
            }
            cursor = fragment.extent.end;
        }
        out.push_str(&self.source[cursor..]);

        Ok(markup::restore_placeholders(&out, &self.placeholders))
    }
}

/// Splits content units into translatable fragments
#[derive(Debug, Clone)]
pub struct ContentSegmenter {
    rules: NonTranslatableRules,
    placeholder_prefix: String,
}

impl Default for ContentSegmenter {
    fn default() -> Self {
        Self::new(NonTranslatableRules::default(), "ZNTA")
    }
}

impl ContentSegmenter {
    pub fn new(rules: NonTranslatableRules, placeholder_prefix: impl Into<String>) -> Self {
        Self {
            rules,
            placeholder_prefix: placeholder_prefix.into(),
        }
    }

    /// Segment one content unit
    ///
    /// `unit_index` is the position of the unit in its request and scopes
    /// placeholder ids.
    pub fn segment(
        &self,
        unit_index: usize,
        value: &str,
        media_type: MediaType,
        max_length: usize,
    ) -> Result<SegmentedContent, TranslationError> {
        if value.trim().is_empty() {
            return Ok(SegmentedContent::unchanged(media_type, value));
        }

        let segmented = match media_type {
            MediaType::Plain => {
                let mut builder = Builder::new(max_length, None);
                builder.push_text(value, false, None);
                builder.finish(media_type, Vec::new())
            }
            MediaType::Html => {
                self.segment_markup(unit_index, value, MarkupTree::parse_html(value), max_length)
            }
            MediaType::Xml => {
                self.segment_markup(unit_index, value, MarkupTree::parse_xml(value)?, max_length)
            }
        };

        debug!(
            "Segmented unit {} ({}) into {} fragments, {} skipped",
            unit_index,
            media_type,
            segmented.fragments.len(),
            segmented.warnings.len()
        );
        Ok(segmented)
    }

    fn segment_markup(
        &self,
        unit_index: usize,
        value: &str,
        mut tree: MarkupTree,
        max_length: usize,
    ) -> SegmentedContent {
        let media_type = match tree.syntax {
            MarkupSyntax::Html => MediaType::Html,
            MarkupSyntax::Xml => MediaType::Xml,
        };
        let placeholders = tree.mask(&self.rules, &self.placeholder_prefix, unit_index);
        let mut builder = Builder::new(max_length, Some(tree.syntax));

        if !tree.has_translatable_text() {
            let source = if placeholders.is_empty() {
                value.to_string()
            } else {
                tree.serialize()
            };
            builder.push_literal(&source);
            return builder.finish(media_type, placeholders);
        }

        if placeholders.is_empty() && char_len(value) <= max_length {
            builder.push_fragment(value, value.to_string(), FragmentKind::HtmlNode, false, false);
            return builder.finish(media_type, placeholders);
        }

        let serialized = tree.serialize();
        if char_len(&serialized) <= max_length {
            builder.push_fragment(
                &serialized,
                serialized.clone(),
                FragmentKind::HtmlNode,
                false,
                false,
            );
        } else {
            builder.push_nodes(&tree.nodes, None);
        }
        builder.finish(media_type, placeholders)
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Accumulates the source text and fragment extents
struct Builder {
    max_length: usize,
    syntax: Option<MarkupSyntax>,
    source: String,
    fragments: Vec<Fragment>,
    warnings: Vec<Warning>,
}

impl Builder {
    fn new(max_length: usize, syntax: Option<MarkupSyntax>) -> Self {
        Self {
            max_length,
            syntax,
            source: String::new(),
            fragments: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn finish(self, media_type: MediaType, placeholders: Vec<Placeholder>) -> SegmentedContent {
        SegmentedContent {
            media_type,
            source: self.source,
            fragments: self.fragments,
            placeholders,
            warnings: self.warnings,
        }
    }

    fn push_literal(&mut self, text: &str) {
        self.source.push_str(text);
    }

    fn push_fragment(
        &mut self,
        source_text: &str,
        text: String,
        kind: FragmentKind,
        escape: bool,
        skip: bool,
    ) {
        let start = self.source.len();
        self.source.push_str(source_text);
        self.fragments.push(Fragment {
            text,
            kind,
            extent: start..self.source.len(),
            skip,
            escape,
        });
    }

    /// Push decoded text, splitting it into sentences when too long
    ///
    /// `sole_child_of` is the serialized parent element when this text is
    /// its only child; it becomes the warning detail if no split is found.
    fn push_text(&mut self, text: &str, escape: bool, sole_child_of: Option<&str>) {
        let encode = |span: &str| {
            if escape {
                markup::escape_text(span)
            } else {
                span.to_string()
            }
        };

        if text.trim().is_empty() {
            self.push_literal(&encode(text));
            return;
        }
        if char_len(text) <= self.max_length {
            self.push_fragment(&encode(text), text.to_string(), FragmentKind::Plain, escape, false);
            return;
        }

        let spans: Vec<&str> = sentences::split(text).collect();
        let unsplit = spans.len() == 1;
        for span in spans {
            let source_span = encode(span);
            if span.trim().is_empty() {
                self.push_literal(&source_span);
            } else if char_len(span) <= self.max_length {
                self.push_fragment(&source_span, span.to_string(), FragmentKind::Plain, escape, false);
            } else {
                let details = match sole_child_of {
                    Some(outer) if unsplit => outer,
                    _ => span,
                };
                warn!(
                    "Skipping {} chars over the {} char limit",
                    char_len(span),
                    self.max_length
                );
                self.warnings
                    .push(Warning::length_exceeded(self.max_length, details));
                self.push_fragment(&source_span, span.to_string(), FragmentKind::Plain, escape, true);
            }
        }
    }

    /// Walk markup nodes, sending each node whole when it fits
    fn push_nodes(&mut self, nodes: &[MarkupNode], parent_outer: Option<&str>) {
        let Some(syntax) = self.syntax else {
            return;
        };
        let sole_child = nodes.len() == 1;

        for node in nodes {
            match node {
                MarkupNode::Text(text) => {
                    let parent = if sole_child { parent_outer } else { None };
                    self.push_text(text, true, parent);
                }
                MarkupNode::Comment(_) | MarkupNode::Raw(_) => {
                    self.push_literal(&markup::serialize_node(node, syntax));
                }
                MarkupNode::Element(element) => {
                    let outer = markup::serialize_node(node, syntax);
                    if !node.has_translatable_text() {
                        self.push_literal(&outer);
                    } else if char_len(&outer) <= self.max_length {
                        self.push_fragment(&outer, outer.clone(), FragmentKind::HtmlNode, false, false);
                    } else {
                        let mut tag = String::new();
                        markup::write_start_tag(element, syntax, false, &mut tag);
                        self.push_literal(&tag);

                        self.push_nodes(&element.children, Some(&outer));

                        tag.clear();
                        markup::write_end_tag(element, &mut tag);
                        self.push_literal(&tag);
                    }
                }
            }
        }
    }
}
