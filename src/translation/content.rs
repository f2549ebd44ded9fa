/*!
 * Document content payload types.
 *
 * These are the shapes accepted and returned by the translation entry point:
 * an ordered list of content units plus the document url and locale, and
 * the warnings collected while translating.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::TranslationError;

/// Longest warning detail kept before truncation
pub const MAX_WARNING_DETAIL_CHARS: usize = 66;

/// Media type of a content unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// text/plain
    Plain,
    /// text/html
    Html,
    /// text/xml or application/xml
    Xml,
}

impl MediaType {
    /// MIME string sent to backends
    pub fn as_mime(&self) -> &'static str {
        match self {
            MediaType::Plain => "text/plain",
            MediaType::Html => "text/html",
            MediaType::Xml => "text/xml",
        }
    }

    /// Whether the content is parsed into a markup tree
    pub fn is_markup(&self) -> bool {
        !matches!(self, MediaType::Plain)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_mime())
    }
}

impl FromStr for MediaType {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let essence = s.split(';').next().unwrap_or_default().trim().to_lowercase();
        match essence.as_str() {
            "text/plain" => Ok(MediaType::Plain),
            "text/html" => Ok(MediaType::Html),
            "text/xml" | "application/xml" => Ok(MediaType::Xml),
            _ => Err(TranslationError::invalid(format!(
                "Invalid media type: {}",
                s
            ))),
        }
    }
}

/// One field of a document submitted for translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    /// Text or markup to translate
    #[serde(default)]
    pub value: String,

    /// MIME type of `value`
    #[serde(rename = "type", default)]
    pub media_type: String,

    /// Caller data carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl ContentUnit {
    pub fn new(value: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            media_type: media_type.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Parsed media type of this unit
    pub fn parsed_media_type(&self) -> Result<MediaType, TranslationError> {
        self.media_type.parse()
    }
}

/// A structured, user-visible warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub title: String,
    pub details: String,
}

impl Warning {
    pub fn new(title: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            details: details.into(),
        }
    }

    /// Warning for text that could not be brought under the backend limit
    pub fn length_exceeded(max_length: usize, text: &str) -> Self {
        Self::new(
            format!(
                "Warning: translation skipped: String length is over {}",
                max_length
            ),
            shorten(text, MAX_WARNING_DETAIL_CHARS),
        )
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.title, self.details)
    }
}

/// Document content as sent by callers and returned translated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContent {
    #[serde(default)]
    pub contents: Vec<ContentUnit>,

    #[serde(default)]
    pub url: String,

    /// Source locale on requests, target locale on responses
    #[serde(default)]
    pub locale: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl DocumentContent {
    pub fn new(contents: Vec<ContentUnit>, url: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            contents,
            url: url.into(),
            locale: locale.into(),
            backend_id: None,
            warnings: Vec::new(),
        }
    }
}

/// Truncate text to `max_chars` characters followed by an ellipsis
pub fn shorten(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
