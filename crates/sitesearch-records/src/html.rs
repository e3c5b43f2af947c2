//! Minimal HTML tokenizer.
//!
//! Produces a flat stream of open tags, close tags and decoded text. It does not
//! build a tree and never fails: malformed markup degrades to text.

/// Elements whose content is raw text and never searchable.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title"];

/// Elements that never have a closing tag.
pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// A single HTML token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// An opening (or self-closing) tag. Names are lowercase.
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    /// A closing tag. Names are lowercase.
    Close { name: String },
    /// Decoded text between tags.
    Text(String),
}

impl Token {
    /// Value of an attribute on an opening tag.
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Token::Open { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Whether this is an opening tag with the given name.
    pub fn is_open(&self, tag: &str) -> bool {
        matches!(self, Token::Open { name, .. } if name == tag)
    }

    /// Whether this is a closing tag with the given name.
    pub fn is_close(&self, tag: &str) -> bool {
        matches!(self, Token::Close { name } if name == tag)
    }
}

/// Whether an element never has a closing tag.
pub fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Tokenize an HTML document.
pub fn tokenize(html: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;
    let bytes = html.as_bytes();

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }

        let rest = &html[pos..];

        let (token, consumed) = if rest.starts_with("<!--") {
            let end = rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
            (None, end)
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            let end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            (None, end)
        } else if let Some(after) = rest.strip_prefix("</") {
            if after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                let end = after.find('>').map(|i| i + 3).unwrap_or(rest.len());
                let name = tag_name(after);
                (Some(Token::Close { name }), end)
            } else {
                pos += 1;
                continue;
            }
        } else if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            parse_open_tag(rest)
        } else {
            // A lone '<' is text.
            pos += 1;
            continue;
        };

        push_text(&mut tokens, &html[text_start..pos]);
        pos += consumed;
        text_start = pos;

        if let Some(token) = token {
            let raw_name = match &token {
                Token::Open {
                    name,
                    self_closing: false,
                    ..
                } if RAW_TEXT_TAGS.contains(&name.as_str()) => Some(name.clone()),
                _ => None,
            };
            tokens.push(token);

            if let Some(name) = raw_name {
                let closing = format!("</{name}");
                let remainder = &html[pos..];
                let end = find_ascii_case_insensitive(remainder, &closing)
                    .unwrap_or(remainder.len());
                pos += end;
                text_start = pos;
            }
        }
    }

    push_text(&mut tokens, &html[text_start..]);
    tokens
}

fn push_text(tokens: &mut Vec<Token>, raw: &str) {
    if raw.is_empty() {
        return;
    }
    tokens.push(Token::Text(decode_entities(raw)));
}

fn tag_name(s: &str) -> String {
    s.chars()
        .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Parse `<name attr="v" ...>` starting at `s`. Returns the token and bytes consumed.
fn parse_open_tag(s: &str) -> (Option<Token>, usize) {
    let bytes = s.as_bytes();
    let name = tag_name(&s[1..]);
    let mut i = 1 + name.len();
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    self_closing = true;
                    i += 2;
                    break;
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        let key_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let key = s[key_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && matches!(bytes[i], b'"' | b'\'') {
                let quote = bytes[i] as char;
                let value_start = i + 1;
                let end = s[value_start..]
                    .find(quote)
                    .map(|e| value_start + e)
                    .unwrap_or(s.len());
                value = decode_entities(&s[value_start..end]);
                i = (end + 1).min(s.len());
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                value = decode_entities(&s[value_start..i]);
            }
        }

        if !key.is_empty() {
            attrs.push((key, value));
        }
    }

    (
        Some(Token::Open {
            name,
            attrs,
            self_closing,
        }),
        i,
    )
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Decode the character references that show up in rendered documentation.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&candidate[1..semi]).map(|c| (c, semi + 1)));

        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &candidate[len..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }

    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "copy" => '©',
        "rsquo" => '’',
        "lsquo" => '‘',
        "rdquo" => '”',
        "ldquo" => '“',
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        let tokens = tokenize(r#"<p class="lead">Hello <b>world</b></p>"#);
        assert!(tokens[0].is_open("p"));
        assert_eq!(tokens[0].attr("class"), Some("lead"));
        assert_eq!(texts(&tokens), vec!["Hello ", "world"]);
        assert!(tokens.last().unwrap().is_close("p"));
    }

    #[test]
    fn test_attributes_variants() {
        let tokens = tokenize(r#"<h2 ID=intro data-x='a b' hidden>Intro</h2>"#);
        assert_eq!(tokens[0].attr("id"), Some("intro"));
        assert_eq!(tokens[0].attr("data-x"), Some("a b"));
        assert_eq!(tokens[0].attr("hidden"), Some(""));
    }

    #[test]
    fn test_self_closing() {
        let tokens = tokenize("a<br/>b<img src=\"x.png\" />");
        assert!(matches!(
            &tokens[1],
            Token::Open { name, self_closing: true, .. } if name == "br"
        ));
        assert_eq!(texts(&tokens), vec!["a", "b"]);
    }

    #[test]
    fn test_comments_and_doctype_skipped() {
        let tokens = tokenize("<!DOCTYPE html><!-- <p>hidden</p> --><p>shown</p>");
        assert_eq!(texts(&tokens), vec!["shown"]);
    }

    #[test]
    fn test_raw_text_skipped() {
        let tokens = tokenize("<script>if (a < b) { x = '</p>'; }</SCRIPT><p>after</p>");
        assert_eq!(texts(&tokens), vec!["after"]);
        assert!(tokens[0].is_open("script"));
        assert!(tokens[1].is_close("script"));
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let tokens = tokenize("<p>1 < 2</p>");
        assert_eq!(texts(&tokens), vec!["1 < 2"]);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&#39;x&#x27;"), "'x'");
        assert_eq!(decode_entities("AT&T &unknown; &"), "AT&T &unknown; &");
        assert_eq!(decode_entities("caf&eacute;"), "caf&eacute;");
    }

    #[test]
    fn test_multibyte_text() {
        let tokens = tokenize("<p>你好 — 世界</p>");
        assert_eq!(texts(&tokens), vec!["你好 — 世界"]);
    }

    #[test]
    fn test_is_void() {
        assert!(is_void("br"));
        assert!(!is_void("p"));
    }
}
