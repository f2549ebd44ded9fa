/*!
 * Owned markup tree for HTML and XML content.
 *
 * HTML is parsed with `scraper` (html5ever) and XML with `quick-xml`; both
 * are converted into the same [`MarkupNode`] tree so segmentation and
 * serialization do not care which parser produced it.
 *
 * Non-translatable elements are swapped for `<var>` placeholders before
 * segmentation and swapped back after translation. Each element keeps the
 * byte range it was parsed from so the placeholder restores the exact
 * source text rather than a re-serialization.
 */

use log::debug;
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::{Captures, Regex};
use scraper::node::Node;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

use crate::errors::TranslationError;

/// Elements that never have children or an end tag in HTML
const HTML_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text content is written without escaping in HTML
const HTML_RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<var\b[^>]*?\bid="([^"]+)"[^>]*?(?:/>|>\s*</var>)"#)
        .expect("placeholder pattern is valid")
});

/// Which serialization rules apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupSyntax {
    Html,
    Xml,
}

/// An element with its attributes in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
    /// Written as `<x/>` when it has no children (XML only)
    pub self_closing: bool,
    /// Byte range of the element in the parsed source, when known
    pub span: Option<Range<usize>>,
}

impl MarkupElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

/// A node of the markup tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(MarkupElement),
    /// Decoded character data
    Text(String),
    Comment(String),
    /// Markup written out exactly as stored
    Raw(String),
}

impl MarkupNode {
    /// Whether any text below this node is worth sending to a backend
    pub fn has_translatable_text(&self) -> bool {
        match self {
            MarkupNode::Text(text) => !text.trim().is_empty(),
            MarkupNode::Element(element) => {
                !is_raw_text_element(&element.name)
                    && element.children.iter().any(MarkupNode::has_translatable_text)
            }
            MarkupNode::Comment(_) | MarkupNode::Raw(_) => false,
        }
    }
}

/// Rules for elements that must never reach a backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NonTranslatableRules {
    /// `translate="no"` is always honored; this attribute name is checked too
    #[serde(default = "default_marker_attribute")]
    pub attribute: String,

    /// Element names that are never translated
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,

    /// Element ids that are never translated
    #[serde(default = "default_ids")]
    pub ids: Vec<String>,

    /// Class names that are never translated
    #[serde(default = "default_classes")]
    pub classes: Vec<String>,
}

fn default_marker_attribute() -> String {
    "translate".to_string()
}

fn default_tags() -> Vec<String> {
    vec!["code".to_string()]
}

fn default_ids() -> Vec<String> {
    vec!["private-notes".to_string()]
}

fn default_classes() -> Vec<String> {
    vec!["notranslate".to_string()]
}

impl Default for NonTranslatableRules {
    fn default() -> Self {
        Self {
            attribute: default_marker_attribute(),
            tags: default_tags(),
            ids: default_ids(),
            classes: default_classes(),
        }
    }
}

impl NonTranslatableRules {
    pub fn matches(&self, element: &MarkupElement) -> bool {
        let marked_no = |name: &str| {
            element
                .attr(name)
                .map(|v| v.trim().eq_ignore_ascii_case("no"))
                .unwrap_or(false)
        };
        if marked_no("translate") || marked_no(&self.attribute) {
            return true;
        }
        if self
            .tags
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(&element.name))
        {
            return true;
        }
        if let Some(id) = element.attr("id") {
            if self.ids.iter().any(|candidate| candidate == id) {
                return true;
            }
        }
        self.classes.iter().any(|class| element.has_class(class))
    }
}

/// A masked element and the markup it stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub id: String,
    pub original: String,
}

impl Placeholder {
    /// Markup inserted in place of the original element
    pub fn markup(&self) -> String {
        format!(r#"<var id="{}" translate="no"></var>"#, self.id)
    }
}

/// Parsed markup content of one content unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupTree {
    pub syntax: MarkupSyntax,
    pub nodes: Vec<MarkupNode>,
    source: String,
}

impl MarkupTree {
    /// Parse an HTML fragment
    pub fn parse_html(source: &str) -> Self {
        let fragment = Html::parse_fragment(source);
        let mut nodes = convert_html_children(fragment.root_element());
        let spans = html_element_spans(source);
        assign_html_spans(&mut nodes, &spans, &mut 0);
        Self {
            syntax: MarkupSyntax::Html,
            nodes,
            source: source.to_string(),
        }
    }

    /// Parse XML content, which may hold several top-level nodes
    pub fn parse_xml(source: &str) -> Result<Self, TranslationError> {
        let mut reader = Reader::from_str(source);
        let mut stack: Vec<MarkupElement> = Vec::new();
        let mut top: Vec<MarkupNode> = Vec::new();

        fn push(node: MarkupNode, stack: &mut [MarkupElement], top: &mut Vec<MarkupNode>) {
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => top.push(node),
            }
        }

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader
                .read_event()
                .map_err(|e| TranslationError::invalid(format!("Malformed XML: {}", e)))?;
            let end = reader.buffer_position() as usize;

            match event {
                Event::Start(e) => stack.push(xml_element(&e, false, start..end)?),
                Event::Empty(e) => push(
                    MarkupNode::Element(xml_element(&e, true, start..end)?),
                    &mut stack,
                    &mut top,
                ),
                Event::End(_) => {
                    let mut element = stack.pop().ok_or_else(|| {
                        TranslationError::invalid("Malformed XML: unexpected end tag")
                    })?;
                    if let Some(span) = element.span.as_mut() {
                        span.end = end;
                    }
                    push(MarkupNode::Element(element), &mut stack, &mut top);
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(|err| {
                        TranslationError::invalid(format!("Malformed XML: {}", err))
                    })?;
                    push(MarkupNode::Text(text.into_owned()), &mut stack, &mut top);
                }
                Event::Comment(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    push(MarkupNode::Comment(text), &mut stack, &mut top);
                }
                Event::Eof => break,
                // declarations, processing instructions, doctypes and CDATA pass through as written
                _ => push(
                    MarkupNode::Raw(source[start..end].to_string()),
                    &mut stack,
                    &mut top,
                ),
            }
        }

        if let Some(open) = stack.last() {
            return Err(TranslationError::invalid(format!(
                "Malformed XML: unclosed element <{}>",
                open.name
            )));
        }

        Ok(Self {
            syntax: MarkupSyntax::Xml,
            nodes: top,
            source: source.to_string(),
        })
    }

    /// Serialize the whole tree
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(node, self.syntax, &mut out);
        }
        out
    }

    pub fn has_translatable_text(&self) -> bool {
        self.nodes.iter().any(MarkupNode::has_translatable_text)
    }

    /// Replace every non-translatable element with a placeholder
    ///
    /// Ids are `{prefix}-{unit_index}-{n}` with `n` counting from zero in
    /// document order.
    pub fn mask(
        &mut self,
        rules: &NonTranslatableRules,
        prefix: &str,
        unit_index: usize,
    ) -> Vec<Placeholder> {
        let mut placeholders = Vec::new();
        let masking = Masking {
            rules,
            syntax: self.syntax,
            source: &self.source,
            id_prefix: format!("{}-{}", prefix, unit_index),
        };
        masking.mask_nodes(&mut self.nodes, &mut placeholders);
        placeholders
    }
}

struct Masking<'a> {
    rules: &'a NonTranslatableRules,
    syntax: MarkupSyntax,
    source: &'a str,
    id_prefix: String,
}

impl Masking<'_> {
    fn mask_nodes(&self, nodes: &mut [MarkupNode], placeholders: &mut Vec<Placeholder>) {
        for node in nodes.iter_mut() {
            let MarkupNode::Element(element) = node else {
                continue;
            };
            if self.rules.matches(element) {
                let placeholder = Placeholder {
                    id: format!("{}-{}", self.id_prefix, placeholders.len()),
                    original: self.original_markup(element),
                };
                *node = MarkupNode::Raw(placeholder.markup());
                placeholders.push(placeholder);
            } else {
                self.mask_nodes(&mut element.children, placeholders);
            }
        }
    }

    /// Source text of `element`, or its serialization when the span is unknown
    ///
    /// HTML spans come from a tag scan that does not repeat the parser's
    /// error recovery, so a span is only used when reparsing it yields the
    /// same element.
    fn original_markup(&self, element: &MarkupElement) -> String {
        let serialized = || {
            let mut out = String::new();
            write_element(element, self.syntax, &mut out);
            out
        };

        let Some(slice) = element.span.clone().and_then(|span| self.source.get(span)) else {
            return serialized();
        };
        match self.syntax {
            MarkupSyntax::Xml => slice.to_string(),
            MarkupSyntax::Html => {
                let expected = serialized();
                let reparsed = MarkupTree::parse_html(slice);
                if reparsed.nodes.len() == 1 && reparsed.serialize() == expected {
                    slice.to_string()
                } else {
                    debug!("Source span of <{}> does not reparse the same, using serialized markup", element.name);
                    expected
                }
            }
        }
    }
}

/// Put the original markup back in place of every known placeholder
pub fn restore_placeholders(text: &str, placeholders: &[Placeholder]) -> String {
    if placeholders.is_empty() {
        return text.to_string();
    }
    let originals: HashMap<&str, &str> = placeholders
        .iter()
        .map(|p| (p.id.as_str(), p.original.as_str()))
        .collect();
    PLACEHOLDER_PATTERN
        .replace_all(text, |caps: &Captures| {
            originals
                .get(&caps[1])
                .map(|original| original.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn convert_html_children(element: ElementRef<'_>) -> Vec<MarkupNode> {
    let mut nodes = Vec::new();
    for child in element.children() {
        match child.value() {
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    let value = child_element.value();
                    nodes.push(MarkupNode::Element(MarkupElement {
                        name: value.name().to_string(),
                        attrs: value
                            .attrs()
                            .map(|(key, val)| (key.to_string(), val.to_string()))
                            .collect(),
                        children: convert_html_children(child_element),
                        self_closing: false,
                        span: None,
                    }));
                }
            }
            Node::Text(text) => nodes.push(MarkupNode::Text(text.to_string())),
            Node::Comment(comment) => nodes.push(MarkupNode::Comment(comment.to_string())),
            _ => {}
        }
    }
    nodes
}

/// Give each parsed element the range of the next scanned tag with its name
fn assign_html_spans(nodes: &mut [MarkupNode], spans: &[(String, Range<usize>)], cursor: &mut usize) {
    for node in nodes.iter_mut() {
        let MarkupNode::Element(element) = node else {
            continue;
        };
        // elements the parser made up have no tag in the source
        if let Some(found) = spans[*cursor..]
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(&element.name))
        {
            element.span = Some(spans[*cursor + found].1.clone());
            *cursor += found + 1;
        }
        assign_html_spans(&mut element.children, spans, cursor);
    }
}

/// Name and byte range of every element written in `source`, in document order
///
/// Unclosed elements end where an enclosing end tag starts, or at the end of
/// the input.
fn html_element_spans(source: &str) -> Vec<(String, Range<usize>)> {
    let mut spans: Vec<(String, Range<usize>)> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut pos = 0;

    while let Some(offset) = source[pos..].find('<') {
        let start = pos + offset;
        let rest = &source[start..];

        if rest.starts_with("<!--") {
            pos = rest.find("-->").map_or(source.len(), |i| start + i + 3);
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = rest.find('>').map_or(source.len(), |i| start + i + 1);
            continue;
        }

        let closing = rest.starts_with("</");
        let name_start = start + if closing { 2 } else { 1 };
        if !source[name_start..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            pos = start + 1;
            continue;
        }
        let name_len = source[name_start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')))
            .unwrap_or(source.len() - name_start);
        let name = source[name_start..name_start + name_len].to_ascii_lowercase();
        let Some(tag_end) = find_tag_end(source, name_start + name_len) else {
            break;
        };

        if closing {
            if let Some(depth) = open.iter().rposition(|&i| spans[i].0 == name) {
                let mut closed = open.split_off(depth);
                let matched = closed.remove(0);
                spans[matched].1.end = tag_end;
                for i in closed {
                    spans[i].1.end = start;
                }
            }
            pos = tag_end;
            continue;
        }

        spans.push((name.clone(), start..tag_end));
        if source[..tag_end].ends_with("/>") || is_html_void(&name) {
            pos = tag_end;
        } else if is_raw_text_element(&name) {
            let close = format!("</{}", name);
            let end = source[tag_end..]
                .to_ascii_lowercase()
                .find(&close)
                .and_then(|i| find_tag_end(source, tag_end + i + close.len()))
                .unwrap_or(source.len());
            if let Some((_, span)) = spans.last_mut() {
                span.end = end;
            }
            pos = end;
        } else {
            open.push(spans.len() - 1);
            pos = tag_end;
        }
    }

    for i in open {
        spans[i].1.end = source.len();
    }
    spans
}

/// Position just past the `>` closing a tag, skipping quoted attribute values
fn find_tag_end(source: &str, from: usize) -> Option<usize> {
    let mut quote = None;
    for (i, &byte) in source.as_bytes()[from..].iter().enumerate() {
        match quote {
            Some(q) if byte == q => quote = None,
            Some(_) => {}
            None if byte == b'"' || byte == b'\'' => quote = Some(byte),
            None if byte == b'>' => return Some(from + i + 1),
            None => {}
        }
    }
    None
}

fn xml_element(
    start: &BytesStart<'_>,
    self_closing: bool,
    span: Range<usize>,
) -> Result<MarkupElement, TranslationError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr
            .map_err(|e| TranslationError::invalid(format!("Malformed XML attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| TranslationError::invalid(format!("Malformed XML attribute: {}", e)))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(MarkupElement {
        name,
        attrs,
        children: Vec::new(),
        self_closing,
        span: Some(span),
    })
}

/// Serialize a single node
pub fn serialize_node(node: &MarkupNode, syntax: MarkupSyntax) -> String {
    let mut out = String::new();
    write_node(node, syntax, &mut out);
    out
}

pub(crate) fn write_node(node: &MarkupNode, syntax: MarkupSyntax, out: &mut String) {
    match node {
        MarkupNode::Element(element) => write_element(element, syntax, out),
        MarkupNode::Text(text) => out.push_str(&escape_text(text)),
        MarkupNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        MarkupNode::Raw(raw) => out.push_str(raw),
    }
}

fn write_element(element: &MarkupElement, syntax: MarkupSyntax, out: &mut String) {
    let is_void = syntax == MarkupSyntax::Html && is_html_void(&element.name);
    let self_close =
        syntax == MarkupSyntax::Xml && element.self_closing && element.children.is_empty();

    write_start_tag(element, syntax, self_close, out);
    if is_void || self_close {
        return;
    }
    let raw_text = syntax == MarkupSyntax::Html && is_raw_text_element(&element.name);
    for child in &element.children {
        match child {
            MarkupNode::Text(text) if raw_text => out.push_str(text),
            _ => write_node(child, syntax, out),
        }
    }
    write_end_tag(element, out);
}

/// Write `<name attr="value">`
pub(crate) fn write_start_tag(
    element: &MarkupElement,
    syntax: MarkupSyntax,
    self_close: bool,
    out: &mut String,
) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value, syntax));
        out.push('"');
    }
    if self_close {
        out.push_str("/>");
    } else {
        out.push('>');
    }
}

/// Write `</name>`
pub(crate) fn write_end_tag(element: &MarkupElement, out: &mut String) {
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn is_raw_text_element(name: &str) -> bool {
    HTML_RAW_TEXT_ELEMENTS
        .iter()
        .any(|raw| raw.eq_ignore_ascii_case(name))
}

pub(crate) fn is_html_void(name: &str) -> bool {
    HTML_VOID_ELEMENTS
        .iter()
        .any(|void| void.eq_ignore_ascii_case(name))
}

/// Escape character data for insertion into markup
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attribute(value: &str, syntax: MarkupSyntax) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' if syntax == MarkupSyntax::Xml => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parseHtml_serialize_shouldRoundTripSimpleMarkup() {
        let source = r#"<div class="a"><span>content1</span><br><img src="x.png"></div>"#;
        let tree = MarkupTree::parse_html(source);
        assert_eq!(tree.serialize(), source);
    }

    #[test]
    fn test_parseHtml_shouldEscapeDecodedText() {
        let tree = MarkupTree::parse_html("<p>Fish &amp; Chips &lt;3</p>");
        assert_eq!(tree.serialize(), "<p>Fish &amp; Chips &lt;3</p>");
        let MarkupNode::Element(p) = &tree.nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(p.children[0], MarkupNode::Text("Fish & Chips <3".to_string()));
    }

    #[test]
    fn test_parseXml_shouldKeepSelfClosingAndDeclaration() {
        let source = r#"<?xml version="1.0"?><doc><title lang="en">Hello</title><empty/></doc>"#;
        let tree = MarkupTree::parse_xml(source).unwrap();
        assert_eq!(tree.serialize(), source);
    }

    #[test]
    fn test_parseXml_withMismatchedTags_shouldBeInvalidInput() {
        let err = MarkupTree::parse_xml("<a><b></a>").unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_parseXml_withUnclosedElement_shouldBeInvalidInput() {
        let err = MarkupTree::parse_xml("<a><b></b>").unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_mask_shouldReplaceNonTranslatableElementsInOrder() {
        let mut tree = MarkupTree::parse_html(
            r#"<p>Run <code>ls -la</code> and <span translate="no">keep</span>.</p><div id="private-notes">secret</div>"#,
        );
        let placeholders = tree.mask(&NonTranslatableRules::default(), "ZNTA", 6);

        let ids: Vec<_> = placeholders.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["ZNTA-6-0", "ZNTA-6-1", "ZNTA-6-2"]);
        assert_eq!(placeholders[0].original, "<code>ls -la</code>");

        let masked = tree.serialize();
        assert!(masked.contains(r#"<var id="ZNTA-6-0" translate="no"></var>"#));
        assert!(!masked.contains("secret"));
        assert!(!masked.contains("ls -la"));
    }

    #[test]
    fn test_mask_withNotranslateClass_shouldMatch() {
        let mut tree = MarkupTree::parse_html(r#"<p class="lead notranslate">Brand</p>"#);
        let placeholders = tree.mask(&NonTranslatableRules::default(), "ZNTA", 0);
        assert_eq!(placeholders.len(), 1);
        assert!(!tree.has_translatable_text());
    }

    #[test]
    fn test_restorePlaceholders_shouldPutOriginalsBack() {
        let mut tree = MarkupTree::parse_html("<p>Use <code>cargo</code> daily</p>");
        let placeholders = tree.mask(&NonTranslatableRules::default(), "ZNTA", 1);
        let masked = tree.serialize();
        let translated = masked.replace("Use", "Utilisez").replace("daily", "chaque jour");

        assert_eq!(
            restore_placeholders(&translated, &placeholders),
            "<p>Utilisez <code>cargo</code> chaque jour</p>"
        );
    }

    #[test]
    fn test_restorePlaceholders_shouldAcceptSelfClosingAndReorderedAttributes() {
        let placeholders = vec![Placeholder {
            id: "ZNTA-0-0".to_string(),
            original: "<code>x</code>".to_string(),
        }];
        assert_eq!(
            restore_placeholders(r#"a <var translate="no" id="ZNTA-0-0"/> b"#, &placeholders),
            "a <code>x</code> b"
        );
        assert_eq!(
            restore_placeholders(r#"<var id="other"></var>"#, &placeholders),
            r#"<var id="other"></var>"#
        );
    }

    #[test]
    fn test_mask_withQuotedAttributesAndEntities_shouldKeepHtmlSourceText() {
        let source = r#"<p>Run <code class='x'>a&nbsp;b &lt;T&gt;</code> now</p>"#;
        let mut tree = MarkupTree::parse_html(source);

        let placeholders = tree.mask(&NonTranslatableRules::default(), "ZNTA", 0);

        assert_eq!(placeholders[0].original, "<code class='x'>a&nbsp;b &lt;T&gt;</code>");
        assert_eq!(restore_placeholders(&tree.serialize(), &placeholders), source);
    }

    #[test]
    fn test_mask_withQuotedAttributesAndEntities_shouldKeepXmlSourceText() {
        let source = "<doc>Run <code lang='sh'>a &#38; b</code> and <x translate='no'/> now</doc>";
        let mut tree = MarkupTree::parse_xml(source).unwrap();

        let placeholders = tree.mask(&NonTranslatableRules::default(), "ZNTA", 2);

        let originals: Vec<_> = placeholders.iter().map(|p| p.original.as_str()).collect();
        assert_eq!(originals, vec!["<code lang='sh'>a &#38; b</code>", "<x translate='no'/>"]);
        assert_eq!(restore_placeholders(&tree.serialize(), &placeholders), source);
    }

    #[test]
    fn test_mask_withImpliedEndTag_shouldFallBackToSerializedMarkup() {
        let mut tree = MarkupTree::parse_html(r#"<ul><li class="notranslate">a<li>b</ul>"#);

        let placeholders = tree.mask(&NonTranslatableRules::default(), "ZNTA", 0);

        assert_eq!(placeholders.len(), 1);
        assert_eq!(placeholders[0].original, r#"<li class="notranslate">a</li>"#);
    }

    #[test]
    fn test_htmlElementSpans_shouldCoverVoidRawTextAndNestedElements() {
        let source = r#"<p title="a>b">x<br>y<script>if (a<b) {}</script><img src='i.png'/></p><!-- <i> -->"#;

        let spans = html_element_spans(source);

        let names: Vec<_> = spans.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["p", "br", "script", "img"]);
        assert_eq!(&source[spans[0].1.clone()], &source[..source.len() - "<!-- <i> -->".len()]);
        assert_eq!(&source[spans[1].1.clone()], "<br>");
        assert_eq!(&source[spans[2].1.clone()], "<script>if (a<b) {}</script>");
        assert_eq!(&source[spans[3].1.clone()], "<img src='i.png'/>");
    }
}
