/*!
 * Batch translation processing.
 *
 * Segments are cut into batches of bounded size and sent concurrently to a
 * `Translator`. Each provider call holds a permit from the job-wide
 * `JobContext`, so the number of calls in flight stays bounded no matter how
 * many documents are being processed.
 *
 * Every returned translation is checked on its own. Accepted segments are
 * kept; only the rest of the batch is sent again after a capped exponential
 * backoff. Segments still pending when attempts run out, or when the provider
 * reports a non-transient error, are recorded as failures.
 */

use futures::stream::{self, StreamExt};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::job_context::JobContext;
use super::retry::RetryPolicy;
use crate::errors::{ProviderError, TranslationError};
use crate::providers::{SegmentPayload, TokenUsage, TranslateResponse, Translator};
use crate::segments::{IntegrityPolicy, Segment};

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum segments per provider call
    pub batch_size: usize,
    pub retry: RetryPolicy,
    /// Wait per provider call before it counts as a timeout
    pub request_timeout: Duration,
    pub integrity: IntegrityPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 40,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(180),
            integrity: IntegrityPolicy::default(),
        }
    }
}

/// Why a segment ended without a translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFailure {
    /// Attempts made for the segment's batch
    pub attempts: u32,
    /// Last error seen for the segment
    pub error: String,
}

/// Counters for one `translate_all` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub batches: usize,
    pub calls: usize,
    pub retries: usize,
    /// Backoff delays in batch order
    pub delays: Vec<Duration>,
}

/// Outcome of translating a set of segments
#[derive(Debug, Clone, Default)]
pub struct TranslationResult {
    /// Validated translations keyed by segment id
    pub translations: HashMap<String, String>,
    /// Segments without a usable translation
    pub failures: HashMap<String, SegmentFailure>,
    pub usage: TokenUsage,
    pub stats: BatchStats,
}

impl TranslationResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Ids of failed segments, sorted
    pub fn failed_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.failures.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Result of a single batch, before merging
#[derive(Debug, Default)]
struct BatchOutcome {
    index: usize,
    translations: HashMap<String, String>,
    failures: HashMap<String, SegmentFailure>,
    usage: TokenUsage,
    calls: usize,
    delays: Vec<Duration>,
}

impl BatchOutcome {
    fn fail_all(&mut self, pending: &[SegmentPayload], attempts: u32, error: &str) {
        for segment in pending {
            self.failures.insert(
                segment.id.clone(),
                SegmentFailure {
                    attempts,
                    error: error.to_string(),
                },
            );
        }
    }
}

/// Batch translator for processing segments in batches
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    /// The translator to call
    translator: Arc<dyn Translator>,
    options: BatchOptions,
}

impl BatchTranslator {
    pub fn new(translator: Arc<dyn Translator>, options: BatchOptions) -> Self {
        Self { translator, options }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Translate every segment; never fails as a whole, failures are per segment
    pub async fn translate_all(
        &self,
        segments: &[Segment],
        target_language: &str,
        model: &str,
        context: &JobContext,
    ) -> TranslationResult {
        let mut result = TranslationResult::default();
        if segments.is_empty() {
            return result;
        }

        let batches: Vec<&[Segment]> = segments.chunks(self.options.batch_size.max(1)).collect();
        let total_batches = batches.len();

        let mut outcomes = stream::iter(batches.into_iter().enumerate())
            .map(|(index, batch)| self.translate_batch(index, total_batches, batch, target_language, model, context))
            .buffer_unordered(context.max_concurrent_calls())
            .collect::<Vec<_>>()
            .await;

        // Sort results by batch index to keep delays in a stable order
        outcomes.sort_by_key(|o| o.index);

        result.stats.batches = total_batches;
        for outcome in outcomes {
            result.translations.extend(outcome.translations);
            result.failures.extend(outcome.failures);
            result.usage.input_tokens += outcome.usage.input_tokens;
            result.usage.output_tokens += outcome.usage.output_tokens;
            result.stats.calls += outcome.calls;
            result.stats.retries += outcome.delays.len();
            result.stats.delays.extend(outcome.delays);
        }

        if !result.failures.is_empty() {
            context.record_failed_segments(result.failures.len());
        }
        result
    }

    async fn translate_batch(
        &self,
        index: usize,
        total_batches: usize,
        batch: &[Segment],
        target_language: &str,
        model: &str,
        context: &JobContext,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            index,
            ..BatchOutcome::default()
        };
        let mut pending: Vec<SegmentPayload> = batch
            .iter()
            .map(|s| SegmentPayload {
                id: s.id.clone(),
                text: s.source_text.clone(),
            })
            .collect();
        let retry = self.options.retry;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            outcome.calls += 1;
            debug!(
                "Batch {}/{}: attempt {} with {} segments",
                index + 1,
                total_batches,
                attempts,
                pending.len()
            );

            let last_error = match self.call(&pending, target_language, model, context).await {
                Ok(response) => {
                    if let Some(usage) = response.usage {
                        outcome.usage.input_tokens += usage.input_tokens;
                        outcome.usage.output_tokens += usage.output_tokens;
                    }
                    let (rejected, error) = self.accept_valid(pending, &response, &mut outcome);
                    pending = rejected;
                    if pending.is_empty() {
                        break;
                    }
                    error
                }
                Err(error) if !error.is_transient() => {
                    warn!("Batch {}/{} failed: {}", index + 1, total_batches, error);
                    outcome.fail_all(&pending, attempts, &TranslationError::from(error).to_string());
                    break;
                }
                Err(error) => TranslationError::from(error).to_string(),
            };

            if !retry.can_retry(attempts) {
                warn!(
                    "Batch {}/{}: giving up on {} segments after {} attempts: {}",
                    index + 1,
                    total_batches,
                    pending.len(),
                    attempts,
                    last_error
                );
                outcome.fail_all(&pending, attempts, &last_error);
                break;
            }

            let delay = retry.delay_for(attempts - 1);
            context.record_retry();
            debug!(
                "Batch {}/{}: retrying {} segments in {:?} ({})",
                index + 1,
                total_batches,
                pending.len(),
                delay,
                last_error
            );
            outcome.delays.push(delay);
            tokio::time::sleep(delay).await;
        }

        outcome
    }

    /// Keep valid translations; return the segments to send again and the last reason
    fn accept_valid(
        &self,
        pending: Vec<SegmentPayload>,
        response: &TranslateResponse,
        outcome: &mut BatchOutcome,
    ) -> (Vec<SegmentPayload>, String) {
        let mut rejected = Vec::new();
        let mut last_error = String::new();

        for segment in pending {
            let error = match response.translations.get(&segment.id) {
                Some(text) => match self.options.integrity.check(&segment.id, &segment.text, text) {
                    Ok(()) => {
                        outcome.translations.insert(segment.id.clone(), text.clone());
                        continue;
                    }
                    Err(e) => TranslationError::from(e),
                },
                None => TranslationError::Missing(segment.id.clone()),
            };
            last_error = error.to_string();
            rejected.push(segment);
        }

        (rejected, last_error)
    }

    /// One bounded, timed provider call
    async fn call(
        &self,
        pending: &[SegmentPayload],
        target_language: &str,
        model: &str,
        context: &JobContext,
    ) -> Result<TranslateResponse, ProviderError> {
        let _permit = context.acquire().await?;
        context.record_call();

        let start = Instant::now();
        let timeout = self.options.request_timeout;
        let result = match tokio::time::timeout(timeout, self.translator.translate(pending, target_language, model)).await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(timeout.as_millis() as u64)),
        };

        let usage = result.as_ref().ok().and_then(|r| r.usage);
        context.add_usage(usage, start.elapsed());
        result
    }
}
