//! Document descriptors and slug derivation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::frontmatter::Frontmatter;

/// Source file extensions that describe documentation pages.
pub const CONTENT_EXTENSIONS: &[&str] = &["md", "mdx", "markdown"];

/// Metadata describing one documentation page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// Path identifier, without leading or trailing slashes (e.g. `guides/install`).
    pub slug: String,

    /// Page title.
    pub title: String,

    /// Search keywords.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Short description of the page.
    #[serde(default)]
    pub description: Option<String>,

    /// Whether this is a draft.
    #[serde(default)]
    pub draft: bool,

    /// Whether the page opts out of the search index.
    #[serde(default)]
    pub noindex: bool,

    /// Last updated (or published) date.
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,

    /// Source file path.
    #[serde(default)]
    pub source_path: Option<PathBuf>,
}

/// Why a document is excluded from the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Marked `draft: true`.
    Draft,
    /// Marked `noindex: true`.
    NoIndex,
    /// Title missing or blank.
    Untitled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::NoIndex => "noindex",
            Self::Untitled => "untitled",
        })
    }
}

impl DocumentDescriptor {
    /// Create a titled descriptor with no flags set.
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: normalize_slug(&slug.into()),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Build a descriptor from parsed frontmatter and a content path.
    ///
    /// `relative_path` is the source file path relative to the content directory.
    pub fn from_frontmatter(fm: &Frontmatter, relative_path: &Path) -> Self {
        let slug = fm
            .slug
            .as_deref()
            .map(normalize_slug)
            .unwrap_or_else(|| slug_from_path(relative_path));

        Self {
            slug,
            title: fm.title.trim().to_string(),
            keywords: fm.all_keywords(),
            description: fm
                .description
                .as_ref()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            draft: fm.draft,
            noindex: fm.noindex,
            updated: fm.updated.or(fm.date),
            source_path: Some(relative_path.to_path_buf()),
        }
    }

    /// The reason this document must not be indexed, if any.
    ///
    /// Draft takes precedence over noindex, which takes precedence over a missing title.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        if self.draft {
            Some(SkipReason::Draft)
        } else if self.noindex {
            Some(SkipReason::NoIndex)
        } else if self.title.trim().is_empty() {
            Some(SkipReason::Untitled)
        } else {
            None
        }
    }

    /// URL path of the page (`/` + slug).
    pub fn url_path(&self) -> String {
        format!("/{}", self.slug)
    }
}

/// Strip leading/trailing slashes, collapse repeated separators and drop a
/// final `index` segment, so `guides/index` and `guides` name the same page.
pub fn normalize_slug(slug: &str) -> String {
    let mut segments: Vec<_> = slug
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.last() == Some(&"index") {
        segments.pop();
    }
    segments.join("/")
}

/// Derive a slug from a content file path relative to the content directory.
///
/// - `guides/install.md` → `guides/install`
/// - `guides/index.mdx` → `guides`
/// - `index.md` → `` (site root)
pub fn slug_from_path(relative_path: &Path) -> String {
    let stem = relative_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let parent = relative_path
        .parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();

    let joined = if stem == "index" {
        parent
    } else if parent.is_empty() {
        stem
    } else {
        format!("{parent}/{stem}")
    };

    normalize_slug(&joined)
}

/// Whether a path has a documentation source extension.
pub fn is_content_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            CONTENT_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}
