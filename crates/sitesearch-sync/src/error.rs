//! Synchronization errors.

use std::path::PathBuf;

use sitesearch_index::IndexError;
use sitesearch_records::RecordsError;
use thiserror::Error;

use crate::collector::CollectorError;

/// Failure to turn one document into records.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// No rendered page exists for the document.
    #[error("no page artifact for '{slug}' (tried {})", join_paths(.tried))]
    MissingArtifact { slug: String, tried: Vec<PathBuf> },

    /// The rendered page could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record generator rejected the page.
    #[error(transparent)]
    Records(#[from] RecordsError),
}

/// Errors that terminate a synchronization run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A document failed while errors are not being skipped.
    #[error("document '{slug}' failed: {source}")]
    Document {
        slug: String,
        #[source]
        source: DocumentError,
    },

    /// The remote index rejected a request.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Document metadata could not be collected.
    #[error("collector error: {0}")]
    Collector(#[from] CollectorError),
}

/// Result type for synchronization.
pub type Result<T> = std::result::Result<T, SyncError>;

fn join_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no candidate paths".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_message() {
        let err = DocumentError::MissingArtifact {
            slug: "guides/install".to_string(),
            tried: vec![
                PathBuf::from("out/guides/install.html"),
                PathBuf::from("out/guides/install/index.html"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "no page artifact for 'guides/install' (tried out/guides/install.html, out/guides/install/index.html)"
        );
    }

    #[test]
    fn test_document_error_source_chain() {
        let err = SyncError::Document {
            slug: "a".to_string(),
            source: DocumentError::Records(RecordsError::EmptyDocument("a".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "document 'a' failed: empty page for document 'a'"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
