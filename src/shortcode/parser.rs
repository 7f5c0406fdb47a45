/*!
 * Shortcode parser.
 *
 * A single left-to-right scan over the raw page text that keeps a stack of
 * open shortcodes. Only tags accepted by the [`ParserOptions`] policy are
 * treated as shortcodes; any other bracketed text (`Click [here]`) stays text.
 * Structural problems (mismatched or unterminated nesting) abort with a
 * [`ParseError`] instead of being silently repaired.
 */

use log::trace;
use serde::{Deserialize, Serialize};

use crate::errors::{ParseError, ParseErrorKind};

use super::node::{Attribute, AttributeValue, Node, Quote, ShortcodeNode, Tree};

/// Which bracket tags are shortcodes, and how their content is treated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Tags starting with one of these prefixes are shortcodes
    pub prefixes: Vec<String>,

    /// Additional shortcode tags without a known prefix
    pub tags: Vec<String>,

    /// Tags that may stand alone without `/]` or a closer
    pub void_tags: Vec<String>,

    /// Tags whose direct text content is never author prose
    pub opaque_tags: Vec<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            prefixes: owned(&["fusion_"]),
            tags: owned(&["caption", "gallery", "embed", "contact-form-7", "layerslider", "rev_slider"]),
            void_tags: owned(&[
                "fusion_separator",
                "fusion_global",
                "fusion_social_links",
                "fusion_sharing",
                "fusion_map",
                "fusion_youtube",
                "fusion_vimeo",
                "fusion_soundcloud",
                "fusion_menu",
                "fusion_breadcrumbs",
                "fusion_fontawesome",
                "fusion_image",
                "gallery",
                "contact-form-7",
                "layerslider",
                "rev_slider",
            ]),
            opaque_tags: owned(&[
                "fusion_builder_container",
                "fusion_builder_row",
                "fusion_builder_row_inner",
                "fusion_builder_column",
                "fusion_builder_column_inner",
                "fusion_code",
                "fusion_syntax_highlighter",
                "fusion_imageframe",
                "fusion_images",
                "fusion_gallery",
                "fusion_audio",
                "fusion_video",
                "fusion_youtube",
                "fusion_vimeo",
                "fusion_map",
                "embed",
            ]),
        }
    }
}

impl ParserOptions {
    /// Whether `tag` names a shortcode
    pub fn is_shortcode(&self, tag: &str) -> bool {
        !tag.is_empty()
            && (self.prefixes.iter().any(|p| tag.starts_with(p.as_str()))
                || self.tags.iter().any(|t| t == tag))
    }

    pub fn is_void(&self, tag: &str) -> bool {
        self.void_tags.iter().any(|t| t == tag)
    }

    pub fn is_opaque(&self, tag: &str) -> bool {
        self.opaque_tags.iter().any(|t| t == tag)
    }
}

/// Parse with the default Fusion Builder policy
pub fn parse(text: &str) -> Result<Tree, ParseError> {
    parse_with(text, &ParserOptions::default())
}

/// Parse with an explicit tag policy
pub fn parse_with(text: &str, options: &ParserOptions) -> Result<Tree, ParseError> {
    Parser::new(text, options).run()
}

/// Open shortcode waiting for its closer
struct Frame {
    node: ShortcodeNode,
    offset: usize,
}

/// Spans copied through verbatim without looking for shortcodes inside
const RAW_SPANS: &[(&str, &str, &str)] = &[
    ("<script", "</script>", "<script>"),
    ("<style", "</style>", "<style>"),
    ("<svg", "</svg>", "<svg>"),
    ("<!--", "-->", "HTML comment"),
];

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    text_start: usize,
    stack: Vec<Frame>,
    root: Vec<Node>,
    options: &'a ParserOptions,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, options: &'a ParserOptions) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            text_start: 0,
            stack: Vec::new(),
            root: Vec::new(),
            options,
        }
    }

    fn run(mut self) -> Result<Tree, ParseError> {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'[' => {
                    if !self.try_closer()? && !self.try_opener()? {
                        self.pos += 1;
                    }
                }
                b'<' => {
                    if !self.try_raw_span()? {
                        self.pos += 1;
                    }
                }
                _ => self.pos += 1,
            }
        }

        self.flush_text(self.bytes.len());

        if let Some(frame) = self.stack.last() {
            return Err(ParseError::new(
                frame.offset,
                ParseErrorKind::UnterminatedShortcode(frame.node.tag.clone()),
            ));
        }

        Ok(Tree::new(self.root))
    }

    /// Move pending text `[text_start, end)` into the current parent
    fn flush_text(&mut self, end: usize) {
        if end > self.text_start {
            let text = self.src[self.text_start..end].to_string();
            let opaque = self
                .stack
                .last()
                .is_some_and(|frame| self.options.is_opaque(&frame.node.tag));
            let node = if opaque { Node::Raw(text) } else { Node::Text(text) };
            self.attach(node);
        }
        self.text_start = end;
    }

    fn attach(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(frame) => frame.node.children.push(node),
            None => self.root.push(node),
        }
    }

    /// Tag name starting at `from`: ASCII letters, digits, `_` and `-`
    fn read_name(&self, from: usize) -> usize {
        let mut end = from;
        while end < self.bytes.len()
            && (self.bytes[end].is_ascii_alphanumeric() || self.bytes[end] == b'_' || self.bytes[end] == b'-')
        {
            end += 1;
        }
        end
    }

    fn skip_whitespace(&self, from: usize) -> usize {
        let mut end = from;
        while end < self.bytes.len() && self.bytes[end].is_ascii_whitespace() {
            end += 1;
        }
        end
    }

    /// Handle `[/tag]` at the current position
    fn try_closer(&mut self) -> Result<bool, ParseError> {
        let start = self.pos;
        if self.bytes.get(start + 1) != Some(&b'/') {
            return Ok(false);
        }

        let name_end = self.read_name(start + 2);
        if !self.options.is_shortcode(&self.src[start + 2..name_end]) {
            return Ok(false);
        }
        let tag = self.src[start + 2..name_end].to_string();

        let close = self.skip_whitespace(name_end);
        if self.bytes.get(close) != Some(&b']') {
            return Err(ParseError::new(start, ParseErrorKind::UnterminatedToken(tag)));
        }
        let end = close + 1;

        self.flush_text(start);

        let Some(mut frame) = self.stack.pop() else {
            return Err(ParseError::new(start, ParseErrorKind::UnexpectedCloser(tag)));
        };
        if frame.node.tag != tag {
            return Err(ParseError::new(
                start,
                ParseErrorKind::MismatchedCloser {
                    expected: frame.node.tag.clone(),
                    found: tag,
                },
            ));
        }

        trace!("closed [{}] opened at {}", tag, frame.offset);
        frame.node.closer = Some(self.src[start..end].to_string());
        self.attach(Node::Shortcode(frame.node));
        self.pos = end;
        self.text_start = end;
        Ok(true)
    }

    /// Handle `[tag attrs]` or `[tag attrs /]` at the current position
    fn try_opener(&mut self) -> Result<bool, ParseError> {
        let start = self.pos;
        let name_end = self.read_name(start + 1);
        if !self.options.is_shortcode(&self.src[start + 1..name_end]) {
            return Ok(false);
        }
        let tag = self.src[start + 1..name_end].to_string();
        match self.bytes.get(name_end) {
            Some(b) if b.is_ascii_whitespace() || *b == b']' || *b == b'/' => {}
            Some(_) => return Ok(false),
            None => {
                return Err(ParseError::new(start, ParseErrorKind::UnterminatedToken(tag)));
            }
        }

        let mut node = ShortcodeNode::new(tag);
        let end = self.read_attributes(start, name_end, &mut node)?;

        self.flush_text(start);
        self.pos = end;
        self.text_start = end;

        let stands_alone = node.self_closing
            || (self.options.is_void(&node.tag) && !self.src[end..].contains(&format!("[/{}]", node.tag)));

        if stands_alone {
            self.attach(Node::Shortcode(node));
        } else {
            self.stack.push(Frame { node, offset: start });
        }
        Ok(true)
    }

    /// Parse attributes after the tag name; returns the offset past `]`
    fn read_attributes(&self, start: usize, from: usize, node: &mut ShortcodeNode) -> Result<usize, ParseError> {
        let tag = node.tag.clone();
        let unterminated = || ParseError::new(start, ParseErrorKind::UnterminatedToken(tag.clone()));
        let mut pos = from;

        loop {
            let ws_end = self.skip_whitespace(pos);
            let leading = &self.src[pos..ws_end];
            pos = ws_end;

            match self.bytes.get(pos) {
                None => return Err(unterminated()),
                Some(b']') => {
                    node.trailing = leading.to_string();
                    return Ok(pos + 1);
                }
                Some(b'/') if self.bytes.get(pos + 1) == Some(&b']') => {
                    node.trailing = leading.to_string();
                    node.self_closing = true;
                    return Ok(pos + 2);
                }
                Some(b'"') | Some(b'\'') => {
                    let (value, next) = self.read_quoted(pos).ok_or_else(unterminated)?;
                    node.attributes.push(Attribute {
                        leading: leading.to_string(),
                        name: String::new(),
                        value: Some(value),
                    });
                    pos = next;
                }
                Some(_) => {
                    let name_end = self.read_attribute_name(pos);
                    let name = self.src[pos..name_end].to_string();
                    pos = name_end;

                    let before_eq = self.skip_whitespace(pos);
                    let value = if self.bytes.get(before_eq) == Some(&b'=') {
                        let value_start = self.skip_whitespace(before_eq + 1);
                        let assign = self.src[pos..value_start].to_string();
                        let (value, next) = match self.bytes.get(value_start) {
                            None => return Err(unterminated()),
                            Some(b'"') | Some(b'\'') => self.read_quoted(value_start).ok_or_else(unterminated)?,
                            Some(_) => self.read_bare(value_start),
                        };
                        pos = next;
                        Some(AttributeValue { assign, ..value })
                    } else {
                        None
                    };

                    node.attributes.push(Attribute {
                        leading: leading.to_string(),
                        name,
                        value,
                    });
                }
            }
        }
    }

    fn read_attribute_name(&self, from: usize) -> usize {
        let mut end = from;
        while let Some(&b) = self.bytes.get(end) {
            let stop = b.is_ascii_whitespace()
                || b == b'='
                || b == b']'
                || b == b'"'
                || b == b'\''
                || (b == b'/' && self.bytes.get(end + 1) == Some(&b']'));
            if stop {
                break;
            }
            end += 1;
        }
        // Always make progress, even on a stray `=`
        if end == from { from + 1 } else { end }
    }

    /// Quoted value starting at the quote; backslash escapes the next byte
    fn read_quoted(&self, from: usize) -> Option<(AttributeValue, usize)> {
        let quote_byte = self.bytes[from];
        let quote = if quote_byte == b'"' { Quote::Double } else { Quote::Single };
        let mut pos = from + 1;
        while pos < self.bytes.len() {
            match self.bytes[pos] {
                b'\\' => pos += 2,
                b if b == quote_byte => {
                    let value = AttributeValue {
                        assign: String::new(),
                        quote,
                        raw: self.src[from + 1..pos].to_string(),
                    };
                    return Some((value, pos + 1));
                }
                _ => pos += 1,
            }
        }
        None
    }

    /// Unquoted value: runs until whitespace, `]` or `/]`
    fn read_bare(&self, from: usize) -> (AttributeValue, usize) {
        let mut end = from;
        while let Some(&b) = self.bytes.get(end) {
            if b.is_ascii_whitespace() || b == b']' || (b == b'/' && self.bytes.get(end + 1) == Some(&b']')) {
                break;
            }
            end += 1;
        }
        let value = AttributeValue {
            assign: String::new(),
            quote: Quote::Bare,
            raw: self.src[from..end].to_string(),
        };
        (value, end)
    }

    /// Copy `<script>`, `<style>`, `<svg>` and comment spans through as raw nodes
    fn try_raw_span(&mut self) -> Result<bool, ParseError> {
        let start = self.pos;
        let rest = &self.bytes[start..];

        for (open, close, label) in RAW_SPANS {
            if !starts_with_ignore_case(rest, open.as_bytes()) {
                continue;
            }
            // `<scripts>` or `<styled>` are not the elements we are after
            if !open.starts_with("<!") {
                match rest.get(open.len()) {
                    Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => {}
                    _ => continue,
                }
            }

            let end = find_ignore_case(&self.bytes[start + open.len()..], close.as_bytes())
                .map(|at| start + open.len() + at + close.len())
                .ok_or_else(|| ParseError::new(start, ParseErrorKind::UnterminatedRawSpan(label.to_string())))?;

            self.flush_text(start);
            self.attach(Node::Raw(self.src[start..end].to_string()));
            self.pos = end;
            self.text_start = end;
            return Ok(true);
        }
        Ok(false)
    }
}

fn starts_with_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

fn find_ignore_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}
