//! Document metadata collection.
//!
//! Walks the content directory and reads the front matter of every source file.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use sitesearch_core::{
    CoreError, DocumentDescriptor,
    document::{is_content_file, slug_from_path},
    frontmatter::parse_frontmatter,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Content collection errors.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// A source file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The content directory does not exist.
    #[error("content directory not found: {}", .0.display())]
    MissingDir(PathBuf),

    /// Front matter could not be parsed.
    #[error("parse error in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// A source file left out of the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Path relative to the content directory.
    pub path: PathBuf,

    /// Slug derived from the path.
    pub slug: String,

    pub message: String,
}

/// Documents found under the content directory.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Descriptors sorted by slug.
    pub documents: Vec<DocumentDescriptor>,

    /// Files skipped because they could not be read or parsed.
    pub skipped: Vec<SkippedFile>,
}

/// Collects document descriptors from documentation sources.
#[derive(Debug)]
pub struct DocumentCollector {
    content_dir: PathBuf,
    skip_unparseable: bool,
}

impl DocumentCollector {
    /// Create a collector that fails on the first unparseable file.
    #[must_use]
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            skip_unparseable: false,
        }
    }

    /// Log and skip files that cannot be read or parsed instead of failing.
    #[must_use]
    pub fn skip_unparseable(mut self, skip: bool) -> Self {
        self.skip_unparseable = skip;
        self
    }

    /// Collect descriptors for all source files, sorted by slug.
    ///
    /// A file that cannot be read or parsed fails the collection, or lands in
    /// [`Collection::skipped`] when skipping is enabled. When two files claim
    /// the same slug the first by path wins.
    pub fn collect(&self) -> Result<Collection> {
        info!(dir = %self.content_dir.display(), "collecting documents");

        let files = self.find_content_files()?;
        info!(count = files.len(), "found content files");

        let parsed: Vec<_> = files.par_iter().map(|path| self.parse_file(path)).collect();

        let mut collection = Collection::default();
        for (path, outcome) in files.iter().zip(parsed) {
            match outcome {
                Ok(document) => collection.documents.push(document),
                Err(e) if self.skip_unparseable => {
                    warn!(path = %path.display(), error = %e, "skipping unparseable file");
                    let relative = self.relative(path);
                    collection.skipped.push(SkippedFile {
                        slug: slug_from_path(relative),
                        path: relative.to_path_buf(),
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let documents = &mut collection.documents;
        documents.sort_by(|a, b| a.slug.cmp(&b.slug).then_with(|| a.source_path.cmp(&b.source_path)));

        let mut seen = HashSet::new();
        documents.retain(|doc| {
            let fresh = seen.insert(doc.slug.clone());
            if !fresh {
                warn!(
                    slug = %doc.slug,
                    path = ?doc.source_path,
                    "duplicate slug, ignoring file"
                );
            }
            fresh
        });

        info!(
            documents = collection.documents.len(),
            skipped = collection.skipped.len(),
            "document collection complete"
        );
        Ok(collection)
    }

    fn find_content_files(&self) -> Result<Vec<PathBuf>> {
        if !self.content_dir.is_dir() {
            return Err(CollectorError::MissingDir(self.content_dir.clone()));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.content_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() && is_content_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    fn parse_file(&self, path: &Path) -> Result<DocumentDescriptor> {
        debug!(path = %path.display(), "parsing file");

        let content = fs::read_to_string(path).map_err(|source| CollectorError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (frontmatter, _body) =
            parse_frontmatter(&content, path).map_err(|e| CollectorError::Parse {
                path: path.to_path_buf(),
                message: match e {
                    CoreError::Frontmatter { message, .. } => message,
                    other => other.to_string(),
                },
            })?;

        Ok(DocumentDescriptor::from_frontmatter(&frontmatter, self.relative(path)))
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.content_dir).unwrap_or(path)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
