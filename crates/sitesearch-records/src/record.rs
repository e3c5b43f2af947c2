//! The search record uploaded to the remote index.

use serde::{Deserialize, Serialize};

/// What part of a page a record stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// The page itself (title and summary).
    Page,
    /// A section heading.
    Heading,
    /// A block of text under the current heading.
    Content,
}

/// A search-index entry derived from one documentation page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    /// Record identifier. `None` asks the remote index to assign one.
    #[serde(
        rename = "objectID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub object_id: Option<String>,

    /// Record kind.
    #[serde(rename = "type")]
    pub kind: RecordKind,

    /// Slug of the page the record belongs to.
    pub slug: String,

    /// Page title.
    pub title: String,

    /// Absolute (or site-relative) URL, including the anchor if any.
    pub url: String,

    /// Path segments: page title followed by the enclosing headings.
    pub hierarchy: Vec<String>,

    /// Extracted text.
    pub content: String,

    /// Fragment identifier of the nearest heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,

    /// Keywords of the page.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// 1-based order of the record within its page.
    pub position: usize,

    /// Unix timestamp of the page's last update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}
