/*!
 * Node tree for Fusion Builder shortcode markup.
 *
 * Every token keeps its raw form (attribute quoting, spacing, closer text)
 * so that serializing an untouched tree reproduces the source exactly.
 */

use serde::{Deserialize, Serialize};

/// Quoting style of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quote {
    Double,
    Single,
    Bare,
}

impl Quote {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Double => "\"",
            Self::Single => "'",
            Self::Bare => "",
        }
    }
}

/// Raw attribute value, stored exactly as written (escapes included)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    /// The `=` with any surrounding spaces
    pub assign: String,
    pub quote: Quote,
    /// Value between the quotes, not unescaped
    pub raw: String,
}

/// Single shortcode attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Whitespace preceding the attribute
    pub leading: String,
    /// Attribute name; empty for a positional quoted value
    pub name: String,
    /// `None` for a bare flag such as `[fusion_tabs fixed]`
    pub value: Option<AttributeValue>,
}

impl Attribute {
    /// Raw value of the attribute, if it has one
    pub fn raw_value(&self) -> Option<&str> {
        self.value.as_ref().map(|v| v.raw.as_str())
    }
}

/// A `[tag ...]` element with its children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcodeNode {
    pub tag: String,
    /// Attributes in source order
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    /// Written as `[tag .../]`
    pub self_closing: bool,
    /// Raw text between the last attribute and `]` or `/]`
    pub trailing: String,
    /// Exact closing token for enclosing shortcodes; `None` for void ones
    pub closer: Option<String>,
}

impl ShortcodeNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
            trailing: String::new(),
            closer: None,
        }
    }

    /// Look up an attribute's raw value by name (first occurrence wins)
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.raw_value())
    }

    /// Whether the shortcode encloses content with a matching closer
    pub fn is_enclosing(&self) -> bool {
        self.closer.is_some()
    }
}

/// Resolution state of a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceholderState {
    /// Extracted, waiting for a translation
    Pending,
    /// Filled with a validated translation
    Resolved,
    /// No usable translation; serializes the source text
    Unresolved,
}

/// In-tree marker left where a segment was extracted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub segment_id: String,
    /// Original text, kept until the placeholder is resolved or given up on
    pub source: String,
    pub translation: Option<String>,
    pub state: PlaceholderState,
}

impl Placeholder {
    pub fn new(segment_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            segment_id: segment_id.into(),
            source: source.into(),
            translation: None,
            state: PlaceholderState::Pending,
        }
    }

    /// Text emitted when the tree is serialized
    pub fn output(&self) -> &str {
        match (&self.state, &self.translation) {
            (PlaceholderState::Resolved, Some(text)) => text,
            _ => &self.source,
        }
    }
}

/// Tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Shortcode(ShortcodeNode),
    /// Author text, candidate for segmentation
    Text(String),
    /// Verbatim pass-through
    Raw(String),
    Placeholder(Placeholder),
}

impl Node {
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Shortcode(sc) => &sc.children,
            _ => &[],
        }
    }
}

/// Root of a parsed document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub children: Vec<Node>,
}

impl Tree {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Follow a path of child indices from the root
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for index in rest {
            node = node.children().get(*index)?;
        }
        Some(node)
    }

    /// Visit every placeholder depth-first, left to right
    pub fn placeholders(&self) -> Vec<&Placeholder> {
        fn walk<'a>(nodes: &'a [Node], out: &mut Vec<&'a Placeholder>) {
            for node in nodes {
                match node {
                    Node::Placeholder(p) => out.push(p),
                    Node::Shortcode(sc) => walk(&sc.children, out),
                    Node::Text(_) | Node::Raw(_) => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.children, &mut out);
        out
    }

    /// Mutable variant of [`Tree::placeholders`]
    pub fn placeholders_mut(&mut self) -> Vec<&mut Placeholder> {
        fn walk<'a>(nodes: &'a mut [Node], out: &mut Vec<&'a mut Placeholder>) {
            for node in nodes {
                match node {
                    Node::Placeholder(p) => out.push(p),
                    Node::Shortcode(sc) => walk(&mut sc.children, out),
                    Node::Text(_) | Node::Raw(_) => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&mut self.children, &mut out);
        out
    }

    /// Tag names, attribute names and attribute values used anywhere in the tree
    pub fn markup_tokens(&self) -> Vec<String> {
        fn walk(nodes: &[Node], out: &mut Vec<String>) {
            for node in nodes {
                if let Node::Shortcode(sc) = node {
                    out.push(sc.tag.clone());
                    for attr in &sc.attributes {
                        if !attr.name.is_empty() {
                            out.push(attr.name.clone());
                        }
                        if let Some(value) = attr.raw_value() {
                            if !value.trim().is_empty() {
                                out.push(value.to_string());
                            }
                        }
                    }
                    walk(&sc.children, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.children, &mut out);
        out.sort();
        out.dedup();
        out
    }
}
