/*!
 * Tests for the shortcode parser and serializer
 */

use fusion_translator::errors::ParseErrorKind;
use fusion_translator::shortcode::{Node, ParserOptions, parse, parse_with, serialize};

use crate::common;

/// Inputs that must serialize back byte for byte
const ROUND_TRIP_CORPUS: &[&str] = &[
    "",
    "plain text without any markup",
    "[fusion_text]Hello[/fusion_text]",
    "[fusion_builder_container  type=\"flex\"   ][fusion_builder_row]\n\t[/fusion_builder_row][/fusion_builder_container ]",
    "[fusion_button link='https://example.com/?a=1&b=2' target=_blank fixed]Go[/fusion_button]",
    r#"[fusion_title title="Say \"hi\" [now]"]Hey[/fusion_title]"#,
    "[fusion_text]A[fusion_separator style_type=\"none\" /]B[fusion_global id=\"12\"]C[/fusion_text]",
    "[fusion_text]Click [here] or [/there] &amp; <b>bold</b>[/fusion_text]",
    "<script type=\"text/javascript\">var s = \"[fusion_text]\";</script><!-- [/fusion_text] -->",
    "[fusion_text]<svg viewBox=\"0 0 10 10\"><text>[x]</text></svg>Größe – 日本語 ✓[/fusion_text]",
    "[caption id=\"attachment_1\" align=\"alignnone\"]<img src=\"a.jpg\" /> A caption[/caption]",
    "\r\n[fusion_text]\r\nWindows line endings\r\n[/fusion_text]\r\n",
];

#[test]
fn test_round_trip_corpus_should_be_lossless() {
    for input in ROUND_TRIP_CORPUS {
        let tree = parse(input).unwrap_or_else(|e| panic!("failed to parse {:?}: {}", input, e));
        assert_eq!(&serialize(&tree), input);
    }
}

#[test]
fn test_sample_page_should_round_trip() {
    let tree = parse(common::SAMPLE_PAGE).unwrap();
    assert_eq!(serialize(&tree), common::SAMPLE_PAGE);

    let containers: Vec<&str> = tree
        .children
        .iter()
        .filter_map(|node| match node {
            Node::Shortcode(sc) => Some(sc.tag.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(containers, vec!["fusion_builder_container", "fusion_builder_container"]);
}

#[test]
fn test_mismatched_closer_should_fail_at_closer_offset() {
    let err = parse(common::BROKEN_CONTAINER).unwrap_err();
    assert_eq!(err.offset, 44);
    assert_eq!(
        err.reason,
        ParseErrorKind::MismatchedCloser {
            expected: "fusion_text".to_string(),
            found: "fusion_builder_container".to_string(),
        }
    );
}

#[test]
fn test_unterminated_raw_span_should_fail() {
    let err = parse("[fusion_text]<script>never ends[/fusion_text]").unwrap_err();
    assert_eq!(err.offset, 13);
    assert!(matches!(err.reason, ParseErrorKind::UnterminatedRawSpan(_)));
}

#[test]
fn test_custom_options_should_change_recognised_tags() {
    let options = ParserOptions {
        prefixes: vec!["et_pb_".to_string()],
        tags: Vec::new(),
        void_tags: Vec::new(),
        opaque_tags: Vec::new(),
    };
    let src = "[et_pb_text]Hi[/et_pb_text][fusion_text]stays text";
    let tree = parse_with(src, &options).unwrap();

    assert!(matches!(&tree.children[0], Node::Shortcode(sc) if sc.tag == "et_pb_text"));
    assert!(matches!(&tree.children[1], Node::Text(t) if t == "[fusion_text]stays text"));
    assert_eq!(serialize(&tree), src);
}

#[test]
fn test_void_tag_without_closer_should_stand_alone() {
    let tree = parse("[fusion_image image=\"a.jpg\"]after").unwrap();
    assert_eq!(tree.children.len(), 2);
    assert!(matches!(&tree.children[0], Node::Shortcode(sc) if sc.children.is_empty() && sc.closer.is_none()));
}
