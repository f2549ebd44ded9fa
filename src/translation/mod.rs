/*!
 * Document content translation.
 *
 * - `content`: content units, media types and warnings
 * - `markup`: HTML/XML trees and non-translatable masking
 * - `sentences`: sentence boundary splitting
 * - `segmenter`: turns content units into translatable fragments
 * - `cache`: reuse of stored translations and backend batching
 * - `concurrency`: per-document request coordination
 * - `core`: the document content translator tying these together
 */

pub use self::cache::{ResolveRequest, TranslationCache};
pub use self::concurrency::{
    DocumentProcessKey, DocumentProcessManager, InMemoryLockStore, LockStore, SqliteLockStore,
};
pub use self::content::{ContentUnit, DocumentContent, MediaType, Warning};
pub use self::core::DocumentContentTranslator;
pub use self::segmenter::{ContentSegmenter, Fragment, FragmentKind, SegmentedContent};

pub mod cache;
pub mod concurrency;
pub mod content;
pub mod core;
pub mod markup;
pub mod segmenter;
pub mod sentences;
