/*!
 * Mock translator implementations for testing.
 *
 * This module provides a scripted translator that simulates different behaviors:
 * - `MockTranslator::working()` - Always succeeds with translated text
 * - `MockTranslator::flaky(n)` - Fails the first `n` calls, then succeeds
 * - `MockTranslator::failing()` - Always fails with a non-transient error
 * - `MockTranslator::bracket_stripping()` - Answers, but damages the markup
 *
 * Every call is recorded so tests can assert on batching and concurrency.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{SegmentPayload, TokenUsage, TranslateResponse, Translator};

/// Behavior mode for the mock translator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// The first `failures` calls fail with a connection error
    Flaky { failures: usize },
    /// Always fails with a transient rate-limit error
    RateLimited,
    /// Always fails with an authentication error
    Failing,
    /// The first `calls` calls leave out the last segment of the batch
    Omitting { calls: usize },
    /// Translations lose their square brackets
    StripBrackets,
    /// Waits before answering (for timeout and concurrency testing)
    Slow { delay_ms: u64 },
}

/// Mock translator for testing orchestration behavior
#[derive(Debug)]
pub struct MockTranslator {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter
    request_count: Arc<AtomicUsize>,
    /// Calls currently running
    in_flight: Arc<AtomicUsize>,
    /// Highest number of simultaneous calls seen
    max_in_flight: Arc<AtomicUsize>,
    /// Segment ids of every call, in call order
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&SegmentPayload, &str) -> String>,
}

impl MockTranslator {
    /// Create a new mock translator with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            batches: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn flaky(failures: usize) -> Self {
        Self::new(MockBehavior::Flaky { failures })
    }

    pub fn rate_limited() -> Self {
        Self::new(MockBehavior::RateLimited)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn omitting(calls: usize) -> Self {
        Self::new(MockBehavior::Omitting { calls })
    }

    pub fn bracket_stripping() -> Self {
        Self::new(MockBehavior::StripBrackets)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator, called with the segment and target language
    pub fn with_custom_response(mut self, generator: fn(&SegmentPayload, &str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Default translation: the language name prefixed to the source text
    pub fn default_translation(segment: &SegmentPayload, target_language: &str) -> String {
        format!("{}: {}", target_language, segment.text)
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at the same time
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Segment ids sent with each call
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }

    fn translate_text(&self, segment: &SegmentPayload, target_language: &str) -> String {
        match self.custom_response {
            Some(generator) => generator(segment, target_language),
            None => Self::default_translation(segment, target_language),
        }
    }

    async fn respond(
        &self,
        count: usize,
        segments: &[SegmentPayload],
        target_language: &str,
    ) -> Result<TranslateResponse, ProviderError> {
        let mut included: &[SegmentPayload] = segments;

        match self.behavior {
            MockBehavior::Working | MockBehavior::StripBrackets => {}
            MockBehavior::Flaky { failures } => {
                if count < failures {
                    return Err(ProviderError::ConnectionError(format!("Simulated failure #{}", count + 1)));
                }
            }
            MockBehavior::RateLimited => {
                return Err(ProviderError::RateLimitExceeded("Simulated rate limit".to_string()));
            }
            MockBehavior::Failing => {
                return Err(ProviderError::AuthenticationError("Simulated invalid API key".to_string()));
            }
            MockBehavior::Omitting { calls } => {
                if count < calls && !segments.is_empty() {
                    included = &segments[..segments.len() - 1];
                }
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }

        let translations: HashMap<String, String> = included
            .iter()
            .map(|segment| {
                let mut text = self.translate_text(segment, target_language);
                if self.behavior == MockBehavior::StripBrackets {
                    text.retain(|c| c != '[' && c != ']');
                }
                (segment.id.clone(), text)
            })
            .collect();

        let input_tokens: u64 = segments.iter().map(|s| s.text.len() as u64).sum();
        let output_tokens: u64 = translations.values().map(|t| t.len() as u64).sum();

        Ok(TranslateResponse {
            translations,
            usage: Some(TokenUsage {
                input_tokens,
                output_tokens,
            }),
        })
    }
}

impl Clone for MockTranslator {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            in_flight: Arc::clone(&self.in_flight),
            max_in_flight: Arc::clone(&self.max_in_flight),
            batches: Arc::clone(&self.batches),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        segments: &[SegmentPayload],
        target_language: &str,
        _model: &str,
    ) -> Result<TranslateResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.batches
            .lock()
            .push(segments.iter().map(|s| s.id.clone()).collect());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let result = self.respond(count, segments, target_language).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(id: &str, text: &str) -> SegmentPayload {
        SegmentPayload {
            id: id.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_working_mock_translates_every_segment() {
        let mock = MockTranslator::working();
        let response = mock
            .translate(&[payload("a", "Hello"), payload("b", "World")], "German", "m")
            .await
            .unwrap();
        assert_eq!(response.translations["a"], "German: Hello");
        assert_eq!(response.translations.len(), 2);
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.batches(), vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[tokio::test]
    async fn test_flaky_mock_recovers() {
        let mock = MockTranslator::flaky(1);
        let segments = [payload("a", "Hello")];
        assert!(mock.translate(&segments, "German", "m").await.is_err());
        assert!(mock.translate(&segments, "German", "m").await.is_ok());
    }

    #[tokio::test]
    async fn test_omitting_and_stripping_mocks() {
        let mock = MockTranslator::omitting(1);
        let segments = [payload("a", "One"), payload("b", "Two")];
        let first = mock.translate(&segments, "German", "m").await.unwrap();
        assert!(!first.translations.contains_key("b"));
        let second = mock.translate(&segments, "German", "m").await.unwrap();
        assert!(second.translations.contains_key("b"));

        let mock = MockTranslator::bracket_stripping();
        let response = mock.translate(&[payload("a", "Click [here]")], "German", "m").await.unwrap();
        assert_eq!(response.translations["a"], "German: Click here");
    }

    #[tokio::test]
    async fn test_clones_share_counters() {
        let mock = MockTranslator::failing();
        let clone = mock.clone();
        let err = clone.translate(&[payload("a", "x")], "German", "m").await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(mock.call_count(), 1);
    }
}
