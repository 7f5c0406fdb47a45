/*!
 * Integration tests for batch translation and the document pipeline
 */

use std::sync::Arc;
use std::time::Duration;

use fusion_translator::pipeline::{Document, DocumentOutcome, DocumentPipeline, RunSummary};
use fusion_translator::providers::Translator;
use fusion_translator::providers::mock::MockTranslator;
use fusion_translator::segments::{Extractor, FilterConfig, FilterPolicy, IntegrityPolicy};
use fusion_translator::shortcode::ParserOptions;
use fusion_translator::translation::{BatchOptions, BatchTranslator, JobContext};

use crate::common;

fn batch_options(batch_size: usize, max_attempts: u32) -> BatchOptions {
    BatchOptions {
        batch_size,
        retry: common::fast_retry(max_attempts),
        request_timeout: Duration::from_secs(30),
        integrity: IntegrityPolicy::default(),
    }
}

fn pipeline(translator: Arc<dyn Translator>, options: BatchOptions) -> DocumentPipeline {
    DocumentPipeline::new(
        ParserOptions::default(),
        Extractor::new(FilterPolicy::from_config(&FilterConfig::default()).unwrap()),
        IntegrityPolicy::default(),
        BatchTranslator::new(translator, options),
    )
}

fn sample_document() -> Document {
    Document::new("home/container_1.txt", common::SAMPLE_PAGE)
}

#[tokio::test(start_paused = true)]
async fn test_retries_should_converge_to_the_same_translations() {
    let document = sample_document();

    let steady = pipeline(Arc::new(MockTranslator::working()), batch_options(40, 5));
    let prepared = steady.prepare(&document).unwrap();
    let context = JobContext::new(4);
    let expected = steady
        .translator()
        .translate_all(&prepared.segments, "German", "test-model", &context)
        .await;
    assert!(expected.is_complete());
    assert!(expected.stats.delays.is_empty());

    let flaky = MockTranslator::flaky(2);
    let retrying = pipeline(Arc::new(flaky.clone()), batch_options(40, 5));
    let context = JobContext::new(4);
    let result = retrying
        .translator()
        .translate_all(&prepared.segments, "German", "test-model", &context)
        .await;

    assert_eq!(result.translations, expected.translations);
    assert_eq!(
        result.stats.delays,
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
    assert_eq!(flaky.call_count(), 3);
    assert_eq!(context.counters().retries, 2);
}

#[tokio::test(start_paused = true)]
async fn test_parse_failure_should_not_affect_other_documents() {
    let mock = MockTranslator::working();
    let pipeline = pipeline(Arc::new(mock.clone()), batch_options(40, 3));
    let documents = vec![
        sample_document(),
        Document::new("broken/container_1.txt", common::BROKEN_CONTAINER),
    ];
    let context = JobContext::new(2);

    let outcomes = pipeline
        .process_all(&documents, "German", "test-model", &context, 2)
        .await;
    assert_eq!(outcomes.len(), 2);

    let broken = outcomes
        .iter()
        .find(|o| o.document_id() == "broken/container_1.txt")
        .unwrap();
    match broken {
        DocumentOutcome::ParseFailed { error, .. } => assert_eq!(error.offset, 44),
        other => panic!("expected a parse failure, got {:?}", other),
    }

    let good = outcomes.iter().find(|o| o.is_translated()).unwrap();
    match good {
        DocumentOutcome::Translated { text, report, .. } => {
            assert!(report.is_complete());
            assert!(text.contains("[fusion_title title_type=\"text\" size=\"2\"]German: Welcome to our shop[/fusion_title]"));
            assert!(text.contains("German: Contact us"));
        }
        other => panic!("expected a translation, got {:?}", other),
    }

    let summary = RunSummary::from_outcomes(&outcomes);
    assert_eq!(summary.documents, 2);
    assert_eq!(summary.translated, 1);
    assert_eq!(summary.parse_failures.len(), 1);
    assert_eq!(summary.resolved_segments, 5);
    assert!(summary.has_failures());
}

#[tokio::test(start_paused = true)]
async fn test_damaged_translations_should_fall_back_to_source() {
    let mock = MockTranslator::bracket_stripping();
    let pipeline = pipeline(Arc::new(mock.clone()), batch_options(40, 3));
    let src = "[fusion_text]<p>Press [Enter] to start</p><p>Plain words</p>[/fusion_text]";
    let context = JobContext::new(1);

    let outcome = pipeline
        .process(&Document::new("doc", src), "German", "test-model", &context)
        .await;

    match outcome {
        DocumentOutcome::Translated { text, report, .. } => {
            assert_eq!(report.resolved, 1);
            assert_eq!(report.unresolved.len(), 1);
            assert_eq!(
                text,
                "[fusion_text]<p>Press [Enter] to start</p><p>German: Plain words</p>[/fusion_text]"
            );
        }
        other => panic!("expected a translation, got {:?}", other),
    }
    assert_eq!(mock.call_count(), 3);
    assert_eq!(context.counters().failed_segments, 1);
}

#[tokio::test(start_paused = true)]
async fn test_job_context_should_bound_calls_across_documents() {
    let mock = MockTranslator::slow(50);
    let pipeline = pipeline(Arc::new(mock.clone()), batch_options(1, 1));
    let documents: Vec<Document> = (0..6)
        .map(|i| Document::new(format!("page/container_{}.txt", i + 1), common::SAMPLE_PAGE))
        .collect();
    let context = JobContext::new(3);

    let outcomes = pipeline
        .process_all(&documents, "German", "test-model", &context, 6)
        .await;

    assert!(outcomes.iter().all(|o| o.is_translated()));
    assert_eq!(mock.call_count(), 30);
    assert!(mock.max_concurrency() <= 3);
    assert_eq!(context.counters().calls, 30);
}
