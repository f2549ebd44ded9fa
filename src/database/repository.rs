/*!
 * Repository layer for database operations.
 *
 * Provides the document, text flow and MT request stores used by the
 * translation cache. All writes are upserts so concurrent writers for the
 * same document and hash, or the same target triple, end up with one row
 * holding the last written value.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, params};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use super::connection::DatabaseConnection;
use super::models::{
    BackendUsage, Document, MtRequestRecord, StagedTextFlow, TextFlowRecord,
    TextFlowTargetRecord,
};

const DOCUMENT_COLUMNS: &str =
    "id, url, source_locale, target_locale, used_count, created_at, updated_at";

const TEXT_FLOW_COLUMNS: &str = "id, document_id, content, locale, content_hash, created_at";

/// Repository for database operations
#[derive(Clone, Debug)]
pub struct Repository {
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Compute the SHA-256 content hash of a source string
    pub fn hash_text(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    /// Load the document for a url and locale pair, creating it if needed
    ///
    /// The returned document carries all of its text flows and targets.
    pub async fn get_or_create_document(
        &self,
        url: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> Result<Document> {
        let url = url.to_string();
        let source_locale = source_locale.to_string();
        let target_locale = target_locale.to_string();

        self.db
            .transaction_async(move |tx| {
                let now = chrono::Utc::now().to_rfc3339();
                let inserted = tx.execute(
                    r#"
                    INSERT INTO documents (url, source_locale, target_locale, used_count, created_at, updated_at)
                    VALUES (?1, ?2, ?3, 0, ?4, ?4)
                    ON CONFLICT(url, source_locale, target_locale) DO NOTHING
                    "#,
                    params![url, source_locale, target_locale, now],
                )?;
                if inserted > 0 {
                    debug!("Created document {} ({} -> {})", url, source_locale, target_locale);
                }

                let mut document = tx.query_row(
                    &format!(
                        "SELECT {} FROM documents WHERE url = ?1 AND source_locale = ?2 AND target_locale = ?3",
                        DOCUMENT_COLUMNS
                    ),
                    params![url, source_locale, target_locale],
                    parse_document_row,
                )?;
                document.text_flows = load_text_flows(tx, document.id)?;

                Ok(document)
            })
            .await
    }

    /// Increment the request count of a document, returning the new count
    pub async fn increment_document_count(&self, document_id: i64) -> Result<i64> {
        self.db
            .execute_async(move |conn| {
                let now = chrono::Utc::now().to_rfc3339();
                conn.execute(
                    "UPDATE documents SET used_count = used_count + 1, updated_at = ?2 WHERE id = ?1",
                    params![document_id, now],
                )?;
                Ok(conn.query_row(
                    "SELECT used_count FROM documents WHERE id = ?1",
                    [document_id],
                    |row| row.get(0),
                )?)
            })
            .await
    }

    /// Documents stored for a url, most recently used first
    ///
    /// Either locale may be given to narrow the result.
    pub async fn find_documents_by_url(
        &self,
        url: &str,
        source_locale: Option<&str>,
        target_locale: Option<&str>,
    ) -> Result<Vec<Document>> {
        let url = url.to_string();
        let source_locale = source_locale.map(str::to_string);
        let target_locale = target_locale.map(str::to_string);

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM documents
                     WHERE url = ?1
                       AND (?2 IS NULL OR source_locale = ?2)
                       AND (?3 IS NULL OR target_locale = ?3)
                     ORDER BY updated_at DESC, id DESC",
                    DOCUMENT_COLUMNS
                ))?;
                let documents = stmt
                    .query_map(params![url, source_locale, target_locale], parse_document_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(documents)
            })
            .await
    }

    // =========================================================================
    // Text Flow Operations
    // =========================================================================

    /// Most recently created text flow for a source locale and hash, in any document
    pub async fn find_latest_text_flow(
        &self,
        locale: &str,
        content_hash: &str,
    ) -> Result<Option<TextFlowRecord>> {
        let locale = locale.to_string();
        let content_hash = content_hash.to_string();

        self.db
            .execute_async(move |conn| {
                let flow = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM text_flows WHERE locale = ?1 AND content_hash = ?2
                             ORDER BY id DESC LIMIT 1",
                            TEXT_FLOW_COLUMNS
                        ),
                        params![locale, content_hash],
                        parse_text_flow_row,
                    )
                    .optional()?;

                match flow {
                    Some(mut flow) => {
                        flow.targets = load_targets(conn, flow.id)?;
                        Ok(Some(flow))
                    }
                    None => Ok(None),
                }
            })
            .await
    }

    /// Write staged text flows, their targets and MT request records in one transaction
    ///
    /// Missing text flows are created for the document, then each target is
    /// created or updated in place. Returns the stored text flows with all of
    /// their targets.
    pub async fn commit_text_flows(
        &self,
        document_id: i64,
        staged: Vec<StagedTextFlow>,
        requests: Vec<MtRequestRecord>,
    ) -> Result<Vec<TextFlowRecord>> {
        self.db
            .transaction_async(move |tx| {
                let now = chrono::Utc::now().to_rfc3339();
                let mut stored = Vec::with_capacity(staged.len());

                for flow in &staged {
                    let flow_id = match flow.existing_id {
                        Some(id) => id,
                        None => {
                            tx.execute(
                                r#"
                                INSERT INTO text_flows (document_id, content, locale, content_hash, created_at)
                                VALUES (?1, ?2, ?3, ?4, ?5)
                                ON CONFLICT(document_id, content_hash) DO NOTHING
                                "#,
                                params![document_id, flow.content, flow.locale, flow.content_hash, now],
                            )?;
                            tx.query_row(
                                "SELECT id FROM text_flows WHERE document_id = ?1 AND content_hash = ?2",
                                params![document_id, flow.content_hash],
                                |row| row.get(0),
                            )?
                        }
                    };

                    for target in &flow.targets {
                        tx.execute(
                            r#"
                            INSERT INTO text_flow_targets (
                                text_flow_id, locale, backend_id, content, raw_content, created_at, updated_at
                            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                            ON CONFLICT(text_flow_id, locale, backend_id)
                            DO UPDATE SET content = excluded.content,
                                          raw_content = excluded.raw_content,
                                          updated_at = excluded.updated_at
                            "#,
                            params![
                                flow_id,
                                target.locale,
                                target.backend_id,
                                target.content,
                                target.raw_content,
                                now,
                            ],
                        )?;
                    }

                    let mut record = tx.query_row(
                        &format!("SELECT {} FROM text_flows WHERE id = ?1", TEXT_FLOW_COLUMNS),
                        [flow_id],
                        parse_text_flow_row,
                    )?;
                    record.targets = load_targets(tx, flow_id)?;
                    stored.push(record);
                }

                for request in &requests {
                    insert_mt_request(tx, request)?;
                }

                debug!(
                    "Committed {} text flows and {} MT requests for document {}",
                    stored.len(),
                    requests.len(),
                    document_id
                );
                Ok(stored)
            })
            .await
    }

    // =========================================================================
    // MT Request Operations
    // =========================================================================

    /// MT requests made for a document, oldest first
    pub async fn get_mt_requests(&self, document_id: i64) -> Result<Vec<MtRequestRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, document_id, backend_id, invoked_at, content_hashes, word_count, char_count
                    FROM mt_requests WHERE document_id = ?1 ORDER BY invoked_at ASC
                    "#,
                )?;
                let rows = stmt
                    .query_map([document_id], |row| {
                        let hashes: String = row.get(4)?;
                        Ok(MtRequestRecord {
                            id: row.get(0)?,
                            document_id: row.get(1)?,
                            backend_id: row.get(2)?,
                            invoked_at: row.get(3)?,
                            content_hashes: serde_json::from_str(&hashes).map_err(|e| {
                                rusqlite::Error::FromSqlConversionFailure(
                                    4,
                                    rusqlite::types::Type::Text,
                                    Box::new(e),
                                )
                            })?,
                            word_count: row.get(5)?,
                            char_count: row.get(6)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
    }

    /// Request, word and character totals per backend
    pub async fn mt_request_stats(&self) -> Result<Vec<BackendUsage>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT backend_id, COUNT(*), COALESCE(SUM(word_count), 0), COALESCE(SUM(char_count), 0)
                    FROM mt_requests GROUP BY backend_id ORDER BY backend_id
                    "#,
                )?;
                let usage = stmt
                    .query_map([], |row| {
                        Ok(BackendUsage {
                            backend_id: row.get(0)?,
                            request_count: row.get(1)?,
                            word_count: row.get(2)?,
                            char_count: row.get(3)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(usage)
            })
            .await
    }
}

fn parse_document_row(row: &Row) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        url: row.get(1)?,
        source_locale: row.get(2)?,
        target_locale: row.get(3)?,
        used_count: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        text_flows: HashMap::new(),
    })
}

fn parse_text_flow_row(row: &Row) -> rusqlite::Result<TextFlowRecord> {
    Ok(TextFlowRecord {
        id: row.get(0)?,
        document_id: row.get(1)?,
        content: row.get(2)?,
        locale: row.get(3)?,
        content_hash: row.get(4)?,
        created_at: row.get(5)?,
        targets: Vec::new(),
    })
}

fn load_targets(conn: &Connection, text_flow_id: i64) -> Result<Vec<TextFlowTargetRecord>> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT id, text_flow_id, locale, backend_id, content, raw_content, updated_at
        FROM text_flow_targets WHERE text_flow_id = ?1 ORDER BY id
        "#,
    )?;
    let targets = stmt
        .query_map([text_flow_id], |row| {
            Ok(TextFlowTargetRecord {
                id: row.get(0)?,
                text_flow_id: row.get(1)?,
                locale: row.get(2)?,
                backend_id: row.get(3)?,
                content: row.get(4)?,
                raw_content: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(targets)
}

fn load_text_flows(conn: &Connection, document_id: i64) -> Result<HashMap<String, TextFlowRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM text_flows WHERE document_id = ?1",
        TEXT_FLOW_COLUMNS
    ))?;
    let flows = stmt
        .query_map([document_id], parse_text_flow_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut by_hash = HashMap::with_capacity(flows.len());
    for mut flow in flows {
        flow.targets = load_targets(conn, flow.id)?;
        by_hash.insert(flow.content_hash.clone(), flow);
    }
    Ok(by_hash)
}

fn insert_mt_request(conn: &Connection, record: &MtRequestRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO mt_requests (id, document_id, backend_id, invoked_at, content_hashes, word_count, char_count)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            record.id,
            record.document_id,
            record.backend_id,
            record.invoked_at,
            serde_json::to_string(&record.content_hashes)?,
            record.word_count,
            record.char_count,
        ],
    )?;
    Ok(())
}
