//! sitesearch index library
//!
//! Clients for the hosted search index that receives the records.
//!
//! # Features
//!
//! - **Algolia**: batched saves and deletes plus cursor-based enumeration over the REST API
//! - **In-memory index**: a map-backed index with call counters for tests and embedding
//! - **Dry runs**: a wrapper that forwards reads and only records writes

pub mod algolia;
pub mod dry_run;
pub mod error;
pub mod memory;

use std::collections::BTreeSet;

pub use algolia::AlgoliaIndex;
use async_trait::async_trait;
pub use dry_run::{DryRunIndex, DryRunLog};
pub use error::IndexError;
pub use memory::{CallCounts, MemoryIndex, Operation};
use sitesearch_records::SearchRecord;

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Options for a bulk save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Let the index assign identifiers to records that carry none.
    pub auto_generate_object_ids: bool,
}

impl SaveOptions {
    /// Options allowing records without identifiers.
    pub fn auto_generate() -> Self {
        Self {
            auto_generate_object_ids: true,
        }
    }
}

/// A remote search index holding flat JSON records keyed by object ID.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Name of the target index.
    fn index_name(&self) -> &str;

    /// Whether writes are only simulated.
    fn is_dry_run(&self) -> bool {
        false
    }

    /// Bulk upsert. Returns the object IDs of the saved records, in input order.
    async fn save_records(&self, records: &[SearchRecord], options: SaveOptions)
    -> Result<Vec<String>>;

    /// Every object ID currently stored in the index.
    async fn list_object_ids(&self) -> Result<BTreeSet<String>>;

    /// Bulk delete. Returns the number of IDs submitted for deletion.
    ///
    /// An empty slice is a no-op.
    async fn delete_records(&self, object_ids: &[String]) -> Result<usize>;
}

/// Reject records without an object ID unless the index may assign one.
pub fn validate_records(records: &[SearchRecord], options: SaveOptions) -> Result<()> {
    if options.auto_generate_object_ids {
        return Ok(());
    }

    match records.iter().find(|r| r.object_id.is_none()) {
        Some(record) => Err(IndexError::validation(format!(
            "record {} of '{}' has no objectID and automatic identifiers are disabled",
            record.position, record.slug
        ))),
        None => Ok(()),
    }
}


#[cfg(test)]
mod tests {
    use super::{test_support::record, *};

    #[test]
    fn test_validate_requires_ids() {
        let records = vec![record("a", 1, Some("a-1")), record("a", 2, None)];
        let err = validate_records(&records, SaveOptions::default()).unwrap_err();
        assert!(matches!(err, IndexError::Validation(_)));
        assert!(err.to_string().contains("record 2 of 'a'"));
    }

    #[test]
    fn test_validate_auto_ids() {
        let records = vec![record("a", 1, None)];
        assert!(validate_records(&records, SaveOptions::auto_generate()).is_ok());
    }
}
