//! Frontmatter parsing for content files.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, Result};

/// Frontmatter metadata for content files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frontmatter {
    /// Page title. Untitled pages are never indexed.
    #[serde(default)]
    pub title: String,

    /// Explicit slug, overriding the one derived from the file path.
    #[serde(default)]
    pub slug: Option<String>,

    /// Page description, used as the content of the page record.
    #[serde(default)]
    pub description: Option<String>,

    /// Search keywords. Accepts a list or a comma-separated string.
    #[serde(default, deserialize_with = "string_or_list")]
    pub keywords: Vec<String>,

    /// Tags, merged into the keywords of the document.
    #[serde(default, deserialize_with = "string_or_list")]
    pub tags: Vec<String>,

    /// Whether this is a draft.
    #[serde(default)]
    pub draft: bool,

    /// Whether the page opts out of the search index.
    #[serde(default, alias = "noIndex", alias = "no_index")]
    pub noindex: bool,

    /// Publication date. Unrecognised values are ignored.
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<DateTime<Utc>>,

    /// Last updated date. Unrecognised values are ignored.
    #[serde(default, deserialize_with = "lenient_date")]
    pub updated: Option<DateTime<Utc>>,

    /// Custom extra fields.
    #[serde(default, flatten)]
    pub extra: std::collections::HashMap<String, serde_yaml::Value>,
}

/// Delimiter types for frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterFormat {
    /// YAML frontmatter delimited by `---`.
    Yaml,
    /// TOML frontmatter delimited by `+++`.
    Toml,
}

impl FrontmatterFormat {
    /// Get the delimiter string for this format.
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = match Option::<StringOrList>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(StringOrList::One(s)) => s.split(',').map(str::to_string).collect(),
        Some(StringOrList::Many(v)) => v,
    };

    Ok(values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}

fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(date_text).and_then(parse_date))
}

fn date_text(value: &serde_yaml::Value) -> Option<&str> {
    match value {
        serde_yaml::Value::String(s) => Some(s.as_str()),
        // TOML datetimes arrive as a single-entry map when buffered by `flatten`.
        serde_yaml::Value::Mapping(map) if map.len() == 1 => {
            map.values().next().and_then(serde_yaml::Value::as_str)
        }
        _ => None,
    }
}

/// Parse an RFC 3339 timestamp, a local `YYYY-MM-DDTHH:MM:SS` or a plain
/// `YYYY-MM-DD` date. Times without an offset are taken as UTC.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Split content into frontmatter and body.
pub fn split_frontmatter(content: &str) -> Option<(FrontmatterFormat, &str, &str)> {
    let content = content.trim_start_matches('\u{feff}').trim_start();

    let format = if content.starts_with("---") {
        FrontmatterFormat::Yaml
    } else if content.starts_with("+++") {
        FrontmatterFormat::Toml
    } else {
        return None;
    };

    let delimiter = format.delimiter();

    let after_first = &content[delimiter.len()..];
    let closing_pos = after_first.find(delimiter)?;

    let frontmatter = after_first[..closing_pos].trim();
    let body = after_first[closing_pos + delimiter.len()..].trim_start();

    Some((format, frontmatter, body))
}

/// Parse frontmatter from a string.
///
/// Content without a frontmatter block yields a default (untitled) frontmatter.
pub fn parse_frontmatter(content: &str, path: &Path) -> Result<(Frontmatter, String)> {
    let Some((format, fm_str, body)) = split_frontmatter(content) else {
        return Ok((Frontmatter::default(), content.to_string()));
    };

    if fm_str.is_empty() {
        return Ok((Frontmatter::default(), body.to_string()));
    }

    let frontmatter: Frontmatter = match format {
        FrontmatterFormat::Yaml => {
            serde_yaml::from_str(fm_str).map_err(|e| CoreError::frontmatter(path, e.to_string()))?
        }
        FrontmatterFormat::Toml => {
            toml::from_str(fm_str).map_err(|e| CoreError::frontmatter(path, e.to_string()))?
        }
    };

    Ok((frontmatter, body.to_string()))
}

impl Frontmatter {
    /// Keywords followed by tags, deduplicated in order of first appearance.
    pub fn all_keywords(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.keywords.len() + self.tags.len());
        for kw in self.keywords.iter().chain(&self.tags) {
            if !out.iter().any(|existing| existing.eq_ignore_ascii_case(kw)) {
                out.push(kw.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_yaml_frontmatter() {
        let content = r#"---
title: "Getting Started"
---

This is the body content."#;

        let (format, fm, body) = split_frontmatter(content).expect("split");
        assert_eq!(format, FrontmatterFormat::Yaml);
        assert!(fm.contains("title:"));
        assert!(body.starts_with("This is the body"));
    }

    #[test]
    fn test_split_toml_frontmatter() {
        let content = r#"+++
title = "Getting Started"
+++

This is the body content."#;

        let (format, fm, body) = split_frontmatter(content).expect("split");
        assert_eq!(format, FrontmatterFormat::Toml);
        assert!(fm.contains("title ="));
        assert!(body.starts_with("This is the body"));
    }

    #[test]
    fn test_no_frontmatter() {
        assert!(split_frontmatter("Just some content.").is_none());
        let (fm, body) = parse_frontmatter("Just some content.", Path::new("a.md")).unwrap();
        assert!(fm.title.trim().is_empty());
        assert_eq!(body, "Just some content.");
    }

    #[test]
    fn test_parse_yaml_frontmatter() {
        let content = r#"---
title: "Install"
slug: guides/install
noindex: false
draft: true
keywords:
  - setup
  - cli
date: 2024-01-14T10:00:00Z
---

Content here."#;

        let (fm, body) = parse_frontmatter(content, Path::new("install.md")).expect("parse");

        assert_eq!(fm.title, "Install");
        assert_eq!(fm.slug.as_deref(), Some("guides/install"));
        assert!(fm.draft);
        assert!(!fm.noindex);
        assert_eq!(fm.keywords, vec!["setup", "cli"]);
        assert!(fm.date.is_some());
        assert_eq!(body, "Content here.");
    }

    #[test]
    fn test_parse_toml_frontmatter() {
        let content = r#"+++
title = "Reference"
noindex = true
tags = ["api", "reference"]
+++

Content here."#;

        let (fm, body) = parse_frontmatter(content, Path::new("ref.md")).expect("parse");

        assert_eq!(fm.title, "Reference");
        assert!(fm.noindex);
        assert_eq!(fm.tags, vec!["api", "reference"]);
        assert_eq!(body, "Content here.");
    }

    #[test]
    fn test_keywords_as_comma_string() {
        let content = "---\ntitle: Auth\nkeywords: \"login, sso ,, tokens\"\n---\nbody";
        let (fm, _) = parse_frontmatter(content, Path::new("auth.mdx")).expect("parse");
        assert_eq!(fm.keywords, vec!["login", "sso", "tokens"]);
    }

    #[test]
    fn test_noindex_aliases() {
        let content = "---\ntitle: Hidden\nnoIndex: true\n---\n";
        let (fm, _) = parse_frontmatter(content, Path::new("hidden.md")).expect("parse");
        assert!(fm.noindex);
    }

    #[test]
    fn test_all_keywords_merges_tags() {
        let fm = Frontmatter {
            keywords: vec!["Rust".into(), "cli".into()],
            tags: vec!["rust".into(), "docs".into()],
            ..Default::default()
        };
        assert_eq!(fm.all_keywords(), vec!["Rust", "cli", "docs"]);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let content = "---\ntitle: [unclosed\n---\nbody";
        let err = parse_frontmatter(content, Path::new("bad.md")).unwrap_err();
        assert!(err.to_string().contains("bad.md"));
    }

    #[test]
    fn test_yaml_date_only() {
        let content = "---\ntitle: Dated\ndate: 2024-01-14\n---\n";
        let (fm, _) = parse_frontmatter(content, Path::new("dated.md")).expect("parse");
        assert_eq!(
            fm.date.map(|d| d.timestamp()),
            Some(1_705_190_400)
        );
    }

    #[test]
    fn test_toml_unquoted_datetime() {
        let content = "+++\ntitle = \"Dated\"\ndate = 2024-01-14T10:00:00Z\nupdated = 2024-02-01\n+++\n";
        let (fm, _) = parse_frontmatter(content, Path::new("dated.md")).expect("parse");
        assert_eq!(
            fm.date.map(|d| d.to_rfc3339()).as_deref(),
            Some("2024-01-14T10:00:00+00:00")
        );
        assert_eq!(
            fm.updated.map(|d| d.timestamp()),
            Some(1_706_745_600)
        );
    }

    #[test]
    fn test_unrecognised_date_ignored() {
        let content = "---\ntitle: Dated\ndate: last tuesday\nupdated: 42\n---\n";
        let (fm, _) = parse_frontmatter(content, Path::new("dated.md")).expect("parse");
        assert_eq!(fm.title, "Dated");
        assert!(fm.date.is_none());
        assert!(fm.updated.is_none());
    }

    #[test]
    fn test_parse_date_forms() {
        assert!(parse_date("2024-01-14T10:00:00+02:00").is_some());
        assert!(parse_date("2024-01-14T10:00:00").is_some());
        assert!(parse_date("2024-01-14 10:00:00.5").is_some());
        assert!(parse_date("14/01/2024").is_none());
    }

    #[test]
    fn test_blank_title() {
        let content = "---\ntitle: \"   \"\n---\nbody";
        let (fm, _) = parse_frontmatter(content, Path::new("blank.md")).expect("parse");
        assert!(fm.title.trim().is_empty());
    }
}
