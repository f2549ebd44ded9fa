/*!
 * SQLite persistence for documents, text flows, translations, MT request
 * records and document locks.
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

pub use connection::DatabaseConnection;
pub use models::{Document, MtRequestRecord, StagedTextFlow, TextFlowRecord, TextFlowTargetRecord};
pub use repository::Repository;
