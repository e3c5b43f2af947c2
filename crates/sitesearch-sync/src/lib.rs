//! sitesearch sync library
//!
//! Keeps a hosted search index in step with a rendered documentation site.
//!
//! # Features
//!
//! - **Document collection**: front matter of every source file under the content directory
//! - **Artifact lookup**: rendered page for each slug under the pages directory
//! - **Synchronization**: parallel record generation, one bulk upload, stale record cleanup

pub mod artifact;
pub mod collector;
pub mod error;
pub mod sync;

pub use artifact::ArtifactLocator;
pub use collector::{Collection, CollectorError, DocumentCollector, SkippedFile};
pub use error::{DocumentError, Result, SyncError};
pub use sync::{
    FailedDocument, FilterCounts, SyncOptions, SyncReport, Synchronizer, partition, stale_ids,
};
