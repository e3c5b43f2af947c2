//! sitesearch records library
//!
//! Turns rendered HTML pages into search records.
//!
//! # Features
//!
//! - **HTML scanning**: a forgiving tag/text tokenizer that skips scripts, styles and
//!   configured chrome such as navigation and footers
//! - **Record extraction**: one page record plus heading and content records carrying
//!   the heading hierarchy and anchors of the page
//! - **Stable identifiers**: optional `slug-position` object IDs so reruns overwrite
//!   instead of duplicating
//!
//! # Example
//!
//! ```
//! use sitesearch_core::{DocumentDescriptor, config::RecordsConfig};
//! use sitesearch_records::{HtmlRecordExtractor, RecordGenerator};
//!
//! let extractor = HtmlRecordExtractor::new("https://docs.example.com", RecordsConfig::default());
//! let doc = DocumentDescriptor::new("guides/install", "Install");
//! let records = extractor
//!     .generate("<main><h2 id=\"cli\">CLI</h2><p>Run the installer.</p></main>", &doc)
//!     .unwrap();
//! assert_eq!(records[0].object_id.as_deref(), Some("guides/install-1"));
//! ```

pub mod extractor;
pub mod html;
pub mod record;

pub use extractor::HtmlRecordExtractor;
pub use record::{RecordKind, SearchRecord};
use sitesearch_core::DocumentDescriptor;
use thiserror::Error;

/// Record generation errors.
#[derive(Debug, Clone, Error)]
pub enum RecordsError {
    /// The page artifact has no content at all.
    #[error("empty page for document '{0}'")]
    EmptyDocument(String),

    /// The page could not be turned into records.
    #[error("extraction failed for document '{slug}': {message}")]
    Extraction { slug: String, message: String },
}

/// Result type for record operations.
pub type Result<T> = std::result::Result<T, RecordsError>;

/// Produces search records from a page's HTML and its descriptor.
///
/// Implementations must be callable from several threads at once: the
/// synchronizer generates records for all documents in parallel.
pub trait RecordGenerator: Send + Sync {
    /// Generate zero or more records for one document.
    fn generate(&self, html: &str, document: &DocumentDescriptor) -> Result<Vec<SearchRecord>>;
}
