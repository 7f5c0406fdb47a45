/*!
 * Inline HTML helpers shared by the extractor and the integrity check.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Any HTML start, end or self-closing tag
pub static TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</?([a-zA-Z][a-zA-Z0-9]*)\b[^<>]*>").expect("Invalid tag regex")
});

/// Named and numeric character references
pub static ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:[a-zA-Z][a-zA-Z0-9]*|#[0-9]+|#[xX][0-9a-fA-F]+);").expect("Invalid entity regex")
});

/// A bracketed token such as `[here]` or `[phone label="x"]`
pub static BRACKET_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("Invalid bracket regex"));

/// A shortcode-shaped token with at least one `key=value` attribute
pub static ATTRIBUTE_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[[a-zA-Z][\w-]*(?:\s+[\w-]+\s*=\s*(?:"[^"\]]*"|'[^'\]]*'|[^\s"'\]]+))+\s*/?\]"#)
        .expect("Invalid attribute token regex")
});

/// Tags that break text into separate segments
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "iframe",
    "img", "input", "li", "nav", "ol", "p", "pre", "section", "source", "table", "tbody", "td",
    "tfoot", "th", "thead", "tr", "ul", "video", "audio", "picture", "button", "select", "option",
    "textarea", "label",
];

/// Entities that only stand for spacing
const SPACE_ENTITIES: &[&str] = &["&nbsp;", "&#160;", "&#xA0;", "&#xa0;", "&ensp;", "&emsp;", "&thinsp;"];

/// Whether an HTML tag token (`<p class="x">`, `</li>`) is block-level
pub fn is_block_tag(token: &str) -> bool {
    TAG_REGEX
        .captures(token)
        .and_then(|caps| caps.get(1))
        .is_some_and(|name| BLOCK_TAGS.iter().any(|b| b.eq_ignore_ascii_case(name.as_str())))
}

/// Inline markup tokens (tags and entities) in order of appearance
pub fn markup_tokens(text: &str) -> Vec<&str> {
    let mut tokens: Vec<(usize, &str)> = TAG_REGEX
        .find_iter(text)
        .chain(ENTITY_REGEX.find_iter(text))
        .map(|m| (m.start(), m.as_str()))
        .collect();
    tokens.sort_by_key(|(start, _)| *start);
    tokens.into_iter().map(|(_, token)| token).collect()
}

/// Bracketed tokens in order of appearance
pub fn bracket_tokens(text: &str) -> Vec<&str> {
    BRACKET_REGEX.find_iter(text).map(|m| m.as_str()).collect()
}

/// Text a reader would see: tags and entities replaced by spaces, trimmed
pub fn visible_text(text: &str) -> String {
    let without_tags = TAG_REGEX.replace_all(text, " ");
    let without_entities = ENTITY_REGEX.replace_all(&without_tags, " ");
    without_entities.trim().to_string()
}

/// Length of the leading run of whitespace and spacing entities
pub fn leading_space_len(text: &str) -> usize {
    let mut offset = 0;
    loop {
        let rest = &text[offset..];
        let trimmed = rest.trim_start();
        if trimmed.len() != rest.len() {
            offset += rest.len() - trimmed.len();
            continue;
        }
        match SPACE_ENTITIES.iter().find(|e| rest.starts_with(**e)) {
            Some(entity) => offset += entity.len(),
            None => return offset,
        }
    }
}

/// Length of the trailing run of whitespace and spacing entities
pub fn trailing_space_len(text: &str) -> usize {
    let mut end = text.len();
    loop {
        let rest = &text[..end];
        let trimmed = rest.trim_end();
        if trimmed.len() != rest.len() {
            end = trimmed.len();
            continue;
        }
        match SPACE_ENTITIES.iter().find(|e| rest.ends_with(**e)) {
            Some(entity) => end -= entity.len(),
            None => return text.len() - end,
        }
    }
}
