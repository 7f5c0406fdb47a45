/*!
 * Tests for segment extraction, filtering and application
 */

use std::collections::HashMap;

use fusion_translator::segments::{
    Extractor, FilterConfig, FilterContext, FilterPolicy, FilterRule, IntegrityPolicy, Segment, apply,
};
use fusion_translator::shortcode::{Tree, parse, serialize};

use crate::common;

fn default_extractor() -> Extractor {
    Extractor::new(FilterPolicy::from_config(&FilterConfig::default()).unwrap())
}

fn extract(src: &str) -> (Tree, Vec<Segment>) {
    let mut tree = parse(src).unwrap();
    let segments = default_extractor().extract("page/container_1.txt", &mut tree);
    (tree, segments)
}

fn texts(segments: &[Segment]) -> Vec<&str> {
    segments.iter().map(|s| s.source_text.as_str()).collect()
}

#[test]
fn test_sample_page_should_expose_only_prose() {
    let (_, segments) = extract(common::SAMPLE_PAGE);
    assert_eq!(
        texts(&segments),
        vec![
            "Welcome to our shop",
            "We build <strong>durable</strong> furniture.",
            "Call us: +49 30 1234567",
            "Orders ship within 3 days.",
            "Contact us",
        ]
    );
}

#[test]
fn test_every_placeholder_should_match_one_segment() {
    let (tree, segments) = extract(common::SAMPLE_PAGE);
    let placeholders = tree.placeholders();
    assert_eq!(placeholders.len(), segments.len());
    for (placeholder, segment) in placeholders.iter().zip(&segments) {
        assert_eq!(placeholder.segment_id, segment.id);
        assert_eq!(placeholder.source, segment.source_text);
    }
}

#[test]
fn test_attribute_values_should_never_change() {
    let (mut tree, segments) = extract(common::SAMPLE_PAGE);
    let translations: HashMap<String, String> = segments
        .iter()
        .map(|s| (s.id.clone(), format!("XX {}", s.source_text)))
        .collect();

    let report = apply(&mut tree, &translations, &IntegrityPolicy::default());
    assert_eq!(report.resolved, 5);
    assert!(report.is_complete());

    let output = serialize(&tree);
    assert!(output.contains("[fusion_toggle title=\"Shipping\" open=\"no\"]XX Orders ship within 3 days.[/fusion_toggle]"));
    assert!(output.contains("background_image=\"https://example.com/bg.jpg\""));
    assert!(output.contains("<p>XX We build <strong>durable</strong> furniture.</p>"));
    assert!(!output.contains("XX Shipping"));
}

#[test]
fn test_apply_without_translations_should_reproduce_source() {
    let (mut tree, segments) = extract(common::SAMPLE_PAGE);
    let report = apply(&mut tree, &HashMap::new(), &IntegrityPolicy::default());

    assert_eq!(report.resolved, 0);
    assert_eq!(report.unresolved.len(), segments.len());
    assert_eq!(serialize(&tree), common::SAMPLE_PAGE);
}

#[test]
fn test_apply_should_reject_damaged_markup() {
    let (mut tree, segments) = extract("[fusion_text]<p>Read <a href=\"/faq\">the FAQ</a> first.</p>[/fusion_text]");
    assert_eq!(segments.len(), 1);

    let mut translations = HashMap::new();
    translations.insert(segments[0].id.clone(), "Lies zuerst die FAQ.".to_string());
    let report = apply(&mut tree, &translations, &IntegrityPolicy::default());

    assert_eq!(report.unresolved, vec![segments[0].id.clone()]);
    assert!(serialize(&tree).contains("Read <a href=\"/faq\">the FAQ</a> first."));
}

#[test]
fn test_integrity_should_reject_new_toggle_fragments() {
    let policy = IntegrityPolicy::default();
    assert!(policy.check("s", "Open it", "Öffne es").is_ok());
    assert!(policy.check("s", "Open it", "Öffne es off_toggle]").is_err());
    assert!(policy.check("s", "Open [it]", "Öffne es").is_err());
    assert!(policy.check("s", "Open it", "   ").is_err());
}

#[test]
fn test_lost_brackets_should_keep_source_after_apply() {
    let (mut tree, segments) = extract("[fusion_text]Click [here][/fusion_text]");
    assert_eq!(texts(&segments), vec!["Click [here]"]);

    let mut translations = HashMap::new();
    translations.insert(segments[0].id.clone(), "Klicken hier".to_string());
    let report = apply(&mut tree, &translations, &IntegrityPolicy::default());

    assert_eq!(report.resolved, 0);
    assert_eq!(serialize(&tree), "[fusion_text]Click [here][/fusion_text]");
}

#[test]
fn test_inline_shortcode_attributes_should_stay_out_of_segments() {
    let src = r#"[fusion_text]<p>Call [phone label="Call us now"] today</p>[/fusion_text]"#;
    let (mut tree, segments) = extract(src);
    assert!(!segments.is_empty());
    assert!(segments.iter().all(|s| !s.source_text.contains("Call us now")));

    let translations: HashMap<String, String> = segments
        .iter()
        .map(|s| (s.id.clone(), format!("XX {}", s.source_text)))
        .collect();
    let report = apply(&mut tree, &translations, &IntegrityPolicy::default());
    assert!(report.is_complete());
    assert!(serialize(&tree).contains(r#"[phone label="Call us now"]"#));
}

#[test]
fn test_renamed_bracket_token_should_keep_source() {
    let (mut tree, segments) = extract("[fusion_text]Copyright [year] ACME[/fusion_text]");
    assert_eq!(texts(&segments), vec!["Copyright [year] ACME"]);

    let mut translations = HashMap::new();
    translations.insert(segments[0].id.clone(), "Urheberrecht [Jahr] ACME".to_string());
    let report = apply(&mut tree, &translations, &IntegrityPolicy::default());

    assert_eq!(report.resolved, 0);
    assert_eq!(serialize(&tree), "[fusion_text]Copyright [year] ACME[/fusion_text]");
}

#[test]
fn test_disabling_filters_should_expose_more_text() {
    let config = FilterConfig {
        skip_numeric: false,
        skip_markup_tokens: false,
        ..FilterConfig::default()
    };
    let extractor = Extractor::new(FilterPolicy::from_config(&config).unwrap());
    let mut tree = parse("[fusion_text]<p>2024</p><p>fusion_text</p>[/fusion_text]").unwrap();
    let segments = extractor.extract("doc", &mut tree);
    assert_eq!(texts(&segments), vec!["2024", "fusion_text"]);

    let (_, segments) = extract("[fusion_text]<p>2024</p><p>fusion_text</p>[/fusion_text]");
    assert!(segments.is_empty());
}

#[derive(Debug)]
struct ShortTextRule;

impl FilterRule for ShortTextRule {
    fn name(&self) -> &'static str {
        "short"
    }

    fn excludes(&self, visible: &str, _raw: &str, _context: &FilterContext) -> bool {
        visible.chars().count() < 4
    }
}

#[test]
fn test_custom_rule_should_apply_after_builtin_rules() {
    let policy = FilterPolicy::from_config(&FilterConfig::default())
        .unwrap()
        .with_rule(ShortTextRule);
    assert_eq!(policy.rule_names().last(), Some(&"short"));

    let extractor = Extractor::new(policy);
    let mut tree = parse("[fusion_text]<p>Hi</p><p>Hello there</p>[/fusion_text]").unwrap();
    let segments = extractor.extract("doc", &mut tree);
    assert_eq!(texts(&segments), vec!["Hello there"]);
}

#[test]
fn test_skip_patterns_should_exclude_matching_text() {
    let config = FilterConfig {
        skip_patterns: vec![r"^SKU-\d+$".to_string()],
        ..FilterConfig::default()
    };
    let extractor = Extractor::new(FilterPolicy::from_config(&config).unwrap());
    let mut tree = parse("[fusion_text]<p>SKU-1234</p><p>Solid oak</p>[/fusion_text]").unwrap();
    let segments = extractor.extract("doc", &mut tree);
    assert_eq!(texts(&segments), vec!["Solid oak"]);
}
