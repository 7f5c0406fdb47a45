/*!
 * Segment extraction.
 *
 * Walks a parsed tree, splits every text node on block-level HTML tags and
 * on bracketed tokens that carry attributes, peels surrounding whitespace off
 * each run and turns the runs that pass the filter into placeholders. Everything else becomes raw pass-through.
 *
 * Ids depend only on the document id and the segment's position, so
 * extracting the same document twice yields the same ids.
 */

use log::trace;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::filter::{FilterContext, FilterPolicy};
use super::markup;
use crate::shortcode::{Node, Placeholder, Tree};

/// A translatable unit of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    #[serde(rename = "text")]
    pub source_text: String,
    /// Child indices from the root to the segment's placeholder
    #[serde(rename = "path")]
    pub node_path: Vec<usize>,
}

/// Stable id of the `index`-th segment of a document
pub fn segment_id(doc_id: &str, index: usize) -> String {
    let digest = Sha256::digest(format!("{}|{}", doc_id, index).as_bytes());
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

/// A piece of a text node after splitting
#[derive(Debug, PartialEq, Eq)]
enum Piece<'a> {
    Raw(&'a str),
    Candidate(&'a str),
}

/// Split text into raw separators and candidate runs; pieces concatenate to `text`
fn split_text(text: &str) -> Vec<Piece<'_>> {
    fn push_run<'a>(run: &'a str, pieces: &mut Vec<Piece<'a>>) {
        if run.is_empty() {
            return;
        }
        let lead = markup::leading_space_len(run);
        if lead == run.len() {
            pieces.push(Piece::Raw(run));
            return;
        }
        let trail = markup::trailing_space_len(run);
        let end = run.len() - trail;
        if lead > 0 {
            pieces.push(Piece::Raw(&run[..lead]));
        }
        pieces.push(Piece::Candidate(&run[lead..end]));
        if trail > 0 {
            pieces.push(Piece::Raw(&run[end..]));
        }
    }

    let mut separators: Vec<(usize, usize)> = markup::TAG_REGEX
        .find_iter(text)
        .filter(|tag| markup::is_block_tag(tag.as_str()))
        .chain(markup::ATTRIBUTE_TOKEN_REGEX.find_iter(text))
        .map(|m| (m.start(), m.end()))
        .collect();
    separators.sort_unstable();

    let mut pieces = Vec::new();
    let mut run_start = 0;
    for (start, end) in separators {
        // overlapping match, e.g. a tag inside an attribute value
        if start < run_start {
            continue;
        }
        push_run(&text[run_start..start], &mut pieces);
        pieces.push(Piece::Raw(&text[start..end]));
        run_start = end;
    }
    push_run(&text[run_start..], &mut pieces);
    pieces
}

/// Extracts segments and leaves placeholders behind
#[derive(Debug)]
pub struct Extractor {
    policy: FilterPolicy,
}

struct Walk<'a> {
    doc_id: &'a str,
    context: FilterContext,
    segments: Vec<Segment>,
    path: Vec<usize>,
}

impl Extractor {
    pub fn new(policy: FilterPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    /// Replace translatable text in `tree` with placeholders and return the segments in document order
    pub fn extract(&self, doc_id: &str, tree: &mut Tree) -> Vec<Segment> {
        let mut walk = Walk {
            doc_id,
            context: FilterContext {
                markup_tokens: tree.markup_tokens(),
            },
            segments: Vec::new(),
            path: Vec::new(),
        };
        let children = std::mem::take(&mut tree.children);
        tree.children = self.rewrite(children, &mut walk);
        trace!("Extracted {} segments from {}", walk.segments.len(), doc_id);
        walk.segments
    }

    fn rewrite(&self, nodes: Vec<Node>, walk: &mut Walk<'_>) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Text(text) => {
                    for piece in split_text(&text) {
                        match piece {
                            Piece::Raw(raw) => push_raw(&mut out, raw),
                            Piece::Candidate(candidate) => self.place(candidate, &mut out, walk),
                        }
                    }
                }
                Node::Shortcode(mut sc) => {
                    walk.path.push(out.len());
                    let children = std::mem::take(&mut sc.children);
                    sc.children = self.rewrite(children, walk);
                    walk.path.pop();
                    out.push(Node::Shortcode(sc));
                }
                other => out.push(other),
            }
        }
        out
    }

    fn place(&self, candidate: &str, out: &mut Vec<Node>, walk: &mut Walk<'_>) {
        let visible = markup::visible_text(candidate);
        if let Some(rule) = self.policy.rejection(&visible, candidate, &walk.context) {
            trace!("Skipping {:?}: {}", candidate, rule);
            push_raw(out, candidate);
            return;
        }

        let id = segment_id(walk.doc_id, walk.segments.len());
        let mut node_path = walk.path.clone();
        node_path.push(out.len());
        walk.segments.push(Segment {
            id: id.clone(),
            source_text: candidate.to_string(),
            node_path,
        });
        out.push(Node::Placeholder(Placeholder::new(id, candidate)));
    }
}

/// Append raw text, merging with a preceding raw node
fn push_raw(out: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(Node::Raw(previous)) => previous.push_str(text),
        _ => out.push(Node::Raw(text.to_string())),
    }
}
