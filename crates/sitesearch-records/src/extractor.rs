//! Record extraction from rendered HTML pages.
//!
//! Each page yields one `page` record, one `heading` record per section heading and
//! one `content` record per text block. Records carry the heading hierarchy they sit
//! under and the anchor of the nearest heading, so search hits can deep-link into
//! the page.

use sitesearch_core::{DocumentDescriptor, config::RecordsConfig, config::build_url};
use tracing::debug;

use crate::{
    RecordGenerator, RecordsError, Result,
    html::{Token, is_void, tokenize},
    record::{RecordKind, SearchRecord},
};

/// Elements skipped with their content regardless of configuration.
const ALWAYS_SKIPPED: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Elements whose text becomes a content record.
const BLOCK_TAGS: &[&str] = &[
    "p",
    "li",
    "pre",
    "blockquote",
    "td",
    "th",
    "dt",
    "dd",
    "figcaption",
];

/// Elements that do not separate words.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "code", "em", "i", "kbd", "mark", "s", "samp", "small", "span", "strong",
    "sub", "sup", "u", "var",
];

/// Default record generator working on rendered HTML.
#[derive(Debug, Clone)]
pub struct HtmlRecordExtractor {
    base_url: String,
    config: RecordsConfig,
}

impl HtmlRecordExtractor {
    /// Create an extractor producing URLs under `base_url`.
    pub fn new(base_url: impl Into<String>, config: RecordsConfig) -> Self {
        let mut config = config;
        for tag in config
            .content_tags
            .iter_mut()
            .chain(config.ignore_tags.iter_mut())
        {
            *tag = tag.trim().to_ascii_lowercase();
        }
        Self {
            base_url: base_url.into(),
            config,
        }
    }

    /// Create an extractor from the site configuration.
    pub fn from_config(config: &sitesearch_core::Config) -> Self {
        Self::new(config.site.base_url.clone(), config.records.clone())
    }

    fn is_skipped(&self, tag: &str) -> bool {
        ALWAYS_SKIPPED.contains(&tag) || self.config.ignore_tags.iter().any(|t| t == tag)
    }

    /// Narrow the token stream to the first configured content root.
    fn content_root<'t>(&self, tokens: &'t [Token]) -> &'t [Token] {
        let candidates = self
            .config
            .content_tags
            .iter()
            .map(String::as_str)
            .chain(std::iter::once("body"));

        for tag in candidates {
            let Some(start) = tokens.iter().position(|t| t.is_open(tag)) else {
                continue;
            };

            let mut depth = 0usize;
            for (offset, token) in tokens[start..].iter().enumerate() {
                match token {
                    Token::Open {
                        name,
                        self_closing: false,
                        ..
                    } if name == tag => depth += 1,
                    Token::Close { name } if name == tag => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            return &tokens[start + 1..start + offset];
                        }
                    }
                    _ => {}
                }
            }
            return &tokens[start + 1..];
        }

        tokens
    }

    fn record_id(&self, slug: &str, position: usize) -> Option<String> {
        if !self.config.stable_ids {
            return None;
        }
        let prefix = if slug.is_empty() { "index" } else { slug };
        Some(format!("{prefix}-{position}"))
    }
}

impl RecordGenerator for HtmlRecordExtractor {
    fn generate(&self, html: &str, document: &DocumentDescriptor) -> Result<Vec<SearchRecord>> {
        if html.trim().is_empty() {
            return Err(RecordsError::EmptyDocument(document.slug.clone()));
        }

        let tokens = tokenize(html);
        let root = self.content_root(&tokens);

        let mut walker = Walker::new(self, document.title.trim());
        walker.walk(root);
        let blocks = walker.finish();

        let summary = document.description.clone().or_else(|| {
            blocks
                .iter()
                .find(|b| b.kind == RecordKind::Content)
                .map(|b| b.content.clone())
        });

        let page = Block {
            kind: RecordKind::Page,
            hierarchy: vec![document.title.trim().to_string()],
            anchor: None,
            content: summary.unwrap_or_default(),
        };

        let last_modified = document.updated.map(|d| d.timestamp());
        let records: Vec<SearchRecord> = std::iter::once(page)
            .chain(blocks)
            .enumerate()
            .map(|(i, block)| {
                let position = i + 1;
                SearchRecord {
                    object_id: self.record_id(&document.slug, position),
                    kind: block.kind,
                    slug: document.slug.clone(),
                    title: document.title.trim().to_string(),
                    url: build_url(&self.base_url, &document.slug, block.anchor.as_deref()),
                    hierarchy: block.hierarchy,
                    content: block.content,
                    anchor: block.anchor,
                    keywords: document.keywords.clone(),
                    position,
                    last_modified,
                }
            })
            .collect();

        debug!(slug = %document.slug, records = records.len(), "extracted records");
        Ok(records)
    }
}

/// A record before identifiers and URLs are assigned.
#[derive(Debug)]
struct Block {
    kind: RecordKind,
    hierarchy: Vec<String>,
    anchor: Option<String>,
    content: String,
}

#[derive(Debug)]
struct HeadingCapture {
    level: usize,
    text: String,
    anchor: Option<String>,
}

/// Single pass over the content root, tracking the heading hierarchy.
struct Walker<'a> {
    extractor: &'a HtmlRecordExtractor,
    title: &'a str,
    hierarchy: Vec<String>,
    anchor: Option<String>,
    heading: Option<HeadingCapture>,
    block_depth: usize,
    block_text: String,
    loose_text: String,
    blocks: Vec<Block>,
}

impl<'a> Walker<'a> {
    fn new(extractor: &'a HtmlRecordExtractor, title: &'a str) -> Self {
        Self {
            extractor,
            title,
            hierarchy: vec![title.to_string()],
            anchor: None,
            heading: None,
            block_depth: 0,
            block_text: String::new(),
            loose_text: String::new(),
            blocks: Vec::new(),
        }
    }

    fn walk(&mut self, tokens: &[Token]) {
        let mut skipping: Option<(&str, usize)> = None;

        for token in tokens {
            if let Some((tag, depth)) = skipping.as_mut() {
                match token {
                    Token::Open {
                        name,
                        self_closing: false,
                        ..
                    } if name.as_str() == *tag => *depth += 1,
                    Token::Close { name } if name.as_str() == *tag => {
                        *depth -= 1;
                        if *depth == 0 {
                            skipping = None;
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match token {
                Token::Open {
                    name, self_closing, ..
                } => {
                    let name = name.as_str();
                    if !*self_closing && !is_void(name) && self.extractor.is_skipped(name) {
                        skipping = Some((name, 1));
                        continue;
                    }
                    self.open(token, name, *self_closing);
                }
                Token::Close { name } => self.close(name),
                Token::Text(text) => self.push_text(text),
            }
        }
    }

    fn open(&mut self, token: &Token, name: &str, self_closing: bool) {
        if let Some(level) = heading_level(name) {
            self.flush_block();
            self.flush_loose();
            self.heading = Some(HeadingCapture {
                level,
                text: String::new(),
                anchor: token.attr("id").map(str::to_string),
            });
            return;
        }

        if let Some(heading) = self.heading.as_mut() {
            if heading.anchor.is_none() {
                heading.anchor = token
                    .attr("id")
                    .or_else(|| token.attr("name"))
                    .map(str::to_string);
            }
            return;
        }

        if BLOCK_TAGS.contains(&name) && !self_closing {
            if self.block_depth == 0 {
                self.flush_loose();
            }
            self.block_depth += 1;
        } else if !INLINE_TAGS.contains(&name) {
            self.push_text(" ");
        }
    }

    fn close(&mut self, name: &str) {
        if heading_level(name).is_some() && self.heading.is_some() {
            self.finish_heading();
            return;
        }

        if BLOCK_TAGS.contains(&name) && self.block_depth > 0 {
            self.block_depth -= 1;
            if self.block_depth == 0 {
                self.flush_block();
            }
        } else if !INLINE_TAGS.contains(&name) {
            self.push_text(" ");
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(heading) = self.heading.as_mut() {
            heading.text.push_str(text);
        } else if self.block_depth > 0 {
            self.block_text.push_str(text);
        } else {
            self.loose_text.push_str(text);
        }
    }

    fn finish_heading(&mut self) {
        let Some(heading) = self.heading.take() else {
            return;
        };
        let text = collapse_whitespace(&heading.text);
        if text.is_empty() {
            return;
        }

        // The page title repeated as <h1> is already the root of the hierarchy.
        if heading.level == 1 && text.eq_ignore_ascii_case(self.title) {
            self.anchor = heading.anchor;
            return;
        }

        let depth = heading.level.saturating_sub(1).max(1);
        self.hierarchy.truncate(depth);
        self.hierarchy.push(text.clone());
        self.anchor = heading.anchor;

        self.blocks.push(Block {
            kind: RecordKind::Heading,
            hierarchy: self.hierarchy.clone(),
            anchor: self.anchor.clone(),
            content: text,
        });
    }

    fn flush_block(&mut self) {
        let text = std::mem::take(&mut self.block_text);
        self.block_depth = 0;
        self.push_content(&text);
    }

    fn flush_loose(&mut self) {
        let text = std::mem::take(&mut self.loose_text);
        self.push_content(&text);
    }

    fn push_content(&mut self, raw: &str) {
        let text = collapse_whitespace(raw);
        let config = &self.extractor.config;
        if text.chars().count() < config.min_content_len.max(1) {
            return;
        }

        let content = truncate_at_word_boundary(&text, config.max_content_len);
        if self
            .blocks
            .last()
            .is_some_and(|b| b.kind == RecordKind::Content && b.content == content)
        {
            return;
        }

        self.blocks.push(Block {
            kind: RecordKind::Content,
            hierarchy: self.hierarchy.clone(),
            anchor: self.anchor.clone(),
            content,
        });
    }

    fn finish(mut self) -> Vec<Block> {
        if self.heading.is_some() {
            self.finish_heading();
        }
        self.flush_block();
        self.flush_loose();
        self.blocks
    }
}

fn heading_level(tag: &str) -> Option<usize> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate text at word boundary, respecting UTF-8 character boundaries.
fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        return text.to_string();
    }

    let truncate_byte_idx = text
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());

    let truncated = &text[..truncate_byte_idx];

    if let Some(last_space_byte) = truncated.rfind(' ') {
        format!("{}...", &truncated[..last_space_byte])
    } else {
        format!("{truncated}...")
    }
}
