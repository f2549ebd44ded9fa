/*!
 * Database entity models.
 *
 * Documents own their text flows by content hash and text flows own their
 * targets; relations are plain row ids so nothing points back up the tree.
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A document identified by url and locale pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub url: String,
    pub source_locale: String,
    pub target_locale: String,
    /// Number of completed translation requests
    pub used_count: i64,
    pub created_at: String,
    pub updated_at: String,
    /// Text flows owned by this document, keyed by content hash
    #[serde(skip)]
    pub text_flows: HashMap<String, TextFlowRecord>,
}

impl Document {
    pub fn text_flow(&self, content_hash: &str) -> Option<&TextFlowRecord> {
        self.text_flows.get(content_hash)
    }
}

/// A unique source string owned by one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFlowRecord {
    pub id: i64,
    pub document_id: i64,
    pub content: String,
    pub locale: String,
    pub content_hash: String,
    pub created_at: String,
    pub targets: Vec<TextFlowTargetRecord>,
}

impl TextFlowRecord {
    /// Translation for a target locale produced by a backend
    pub fn target_for(&self, locale: &str, backend_id: &str) -> Option<&TextFlowTargetRecord> {
        self.targets
            .iter()
            .find(|t| t.locale == locale && t.backend_id == backend_id)
    }
}

/// Translation of a text flow for one locale and backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFlowTargetRecord {
    pub id: i64,
    pub text_flow_id: i64,
    pub locale: String,
    pub backend_id: String,
    /// Translation as used in documents
    pub content: String,
    /// Translation as returned by the backend
    pub raw_content: String,
    pub updated_at: String,
}

/// Target waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTarget {
    pub locale: String,
    pub backend_id: String,
    pub content: String,
    pub raw_content: String,
}

/// Text flow waiting to be written, with the targets to upsert on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedTextFlow {
    /// Row id when the text flow already exists for the document
    pub existing_id: Option<i64>,
    pub content: String,
    pub locale: String,
    pub content_hash: String,
    pub targets: Vec<NewTarget>,
}

impl StagedTextFlow {
    /// Stage a text flow that is not stored yet
    pub fn new(content: String, locale: String, content_hash: String) -> Self {
        Self {
            existing_id: None,
            content,
            locale,
            content_hash,
            targets: Vec::new(),
        }
    }

    /// Stage new targets on an existing text flow
    pub fn existing(flow: &TextFlowRecord) -> Self {
        Self {
            existing_id: Some(flow.id),
            content: flow.content.clone(),
            locale: flow.locale.clone(),
            content_hash: flow.content_hash.clone(),
            targets: Vec::new(),
        }
    }

    pub fn target_for(&self, locale: &str, backend_id: &str) -> Option<&NewTarget> {
        self.targets
            .iter()
            .find(|t| t.locale == locale && t.backend_id == backend_id)
    }
}

/// One invocation of a translation backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MtRequestRecord {
    pub id: String,
    pub document_id: i64,
    pub backend_id: String,
    pub invoked_at: String,
    pub content_hashes: Vec<String>,
    pub word_count: i64,
    pub char_count: i64,
}

impl MtRequestRecord {
    /// Record a request for the given source strings
    pub fn new(document_id: i64, backend_id: &str, sources: &[(String, String)]) -> Self {
        let word_count = sources
            .iter()
            .map(|(text, _)| text.split_whitespace().count() as i64)
            .sum();
        let char_count = sources
            .iter()
            .map(|(text, _)| text.chars().count() as i64)
            .sum();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document_id,
            backend_id: backend_id.to_string(),
            invoked_at: chrono::Utc::now().to_rfc3339(),
            content_hashes: sources.iter().map(|(_, hash)| hash.clone()).collect(),
            word_count,
            char_count,
        }
    }
}

/// Usage totals for one backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendUsage {
    pub backend_id: String,
    pub request_count: i64,
    pub word_count: i64,
    pub char_count: i64,
}
