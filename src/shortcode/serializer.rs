/*!
 * Reassembler: turns a node tree back into shortcode text.
 *
 * Emits exactly the token forms captured by the parser, so a tree that was
 * parsed and not translated serializes to the original bytes.
 */

use super::node::{Node, ShortcodeNode, Tree};

/// Serialize a whole tree
pub fn serialize(tree: &Tree) -> String {
    let mut out = String::new();
    write_nodes(&tree.children, &mut out);
    out
}

/// Serialize a single node and its descendants
pub fn serialize_node(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        write_node(node, out);
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Shortcode(sc) => write_shortcode(sc, out),
        Node::Text(text) | Node::Raw(text) => out.push_str(text),
        Node::Placeholder(p) => out.push_str(p.output()),
    }
}

fn write_shortcode(sc: &ShortcodeNode, out: &mut String) {
    out.push('[');
    out.push_str(&sc.tag);
    for attr in &sc.attributes {
        out.push_str(&attr.leading);
        out.push_str(&attr.name);
        if let Some(value) = &attr.value {
            out.push_str(&value.assign);
            out.push_str(value.quote.as_str());
            out.push_str(&value.raw);
            out.push_str(value.quote.as_str());
        }
    }
    out.push_str(&sc.trailing);
    out.push_str(if sc.self_closing { "/]" } else { "]" });

    write_nodes(&sc.children, out);

    if let Some(closer) = &sc.closer {
        out.push_str(closer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcode::node::{Placeholder, PlaceholderState};
    use crate::shortcode::parser::parse;

    fn round_trip(src: &str) {
        let tree = parse(src).unwrap();
        assert_eq!(serialize(&tree), src);
    }

    #[test]
    fn test_round_trip_should_reproduce_input() {
        round_trip("");
        round_trip("plain text, no shortcodes");
        round_trip("[fusion_text]Hello[/fusion_text]");
        round_trip("[fusion_builder_container type=\"flex\"  hundred_percent='no' flag][fusion_builder_row]\n\t[fusion_builder_column type=1_1 ][fusion_title size=\"2\" title=\"a \\\"b\\\" ]\"]<h2>Hi</h2>[/fusion_title][fusion_separator style_type=\"none\"   /][/fusion_builder_column][/fusion_builder_row][/fusion_builder_container]");
        round_trip("[fusion_text]<style>.a{color:red}</style><!-- note -->Text &amp; more[/fusion_text ]");
        round_trip("[fusion_tabs \"positional\" x = \"y\"]Tab[/fusion_tabs]");
    }

    #[test]
    fn test_serialize_placeholder_should_emit_resolved_text() {
        let mut resolved = Placeholder::new("a", "Hello");
        resolved.translation = Some("Hallo".into());
        resolved.state = PlaceholderState::Resolved;

        let mut unresolved = Placeholder::new("b", "World");
        unresolved.translation = Some("broken [".into());
        unresolved.state = PlaceholderState::Unresolved;

        let tree = Tree::new(vec![
            Node::Placeholder(resolved),
            Node::Raw(" ".into()),
            Node::Placeholder(unresolved),
        ]);
        assert_eq!(serialize(&tree), "Hallo World");
    }
}
