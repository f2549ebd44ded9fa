/*!
 * # doc-mt - machine translation of document content
 *
 * A Rust library that translates the content of web documents through
 * machine translation backends, reusing every translation it has stored.
 *
 * ## Features
 *
 * - Plain text, HTML and XML content units
 * - Segmentation into sentences or markup spans within a backend's
 *   per-request character limit
 * - Non-translatable elements masked as placeholders and restored afterwards
 * - Translation reuse across documents, backends and requests
 * - Backends: Google Translate, DeepL, Microsoft Translator and a
 *   development pseudo-translator
 * - One request at a time per document and locale pair
 *
 * ## Architecture
 *
 * - `app_config`: Configuration management
 * - `translation`: Segmentation, translation reuse and request coordination:
 *   - `translation::segmenter`: Content units to translatable fragments
 *   - `translation::sentences`: Sentence boundaries
 *   - `translation::cache`: Stored translation lookup and backend batching
 *   - `translation::concurrency`: Per-document locks
 *   - `translation::core`: The document content translator
 * - `translation_service`: Request validation and orchestration
 * - `database`: SQLite storage of documents, text flows and MT requests
 * - `providers`: Machine translation backend clients
 * - `app_controller`: Main application controller
 * - `language_utils`: Locale code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod translation;
pub mod translation_service;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_locale};
pub use providers::BackendId;
pub use translation::{ContentUnit, DocumentContent};
pub use translation_service::TranslationService;
