/*!
 * Segment translation through AI providers.
 *
 * - `core`: provider-backed `TranslationService` and token accounting
 * - `batch`: batching, bounded concurrency, retry and per-segment validation
 * - `job_context`: job-wide call limit, counters and usage
 * - `prompt`: prompt templates and reply parsing
 * - `retry`: backoff policy
 */

// Re-export main types for easier usage
pub use self::batch::{BatchOptions, BatchStats, BatchTranslator, SegmentFailure, TranslationResult};
pub use self::core::{TokenUsageStats, TranslationService};
pub use self::job_context::{JobContext, JobCounters};
pub use self::retry::RetryPolicy;

// Submodules
pub mod batch;
pub mod core;
pub mod job_context;
pub mod prompt;
pub mod retry;
