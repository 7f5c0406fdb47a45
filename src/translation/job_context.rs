/*!
 * Job-wide shared state.
 *
 * One `JobContext` is created per run and shared by reference (or `Arc`)
 * between every document and batch. It caps the number of provider calls
 * in flight across the whole job and accumulates counters and token usage.
 */

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

use super::core::TokenUsageStats;
use crate::errors::ProviderError;
use crate::providers::TokenUsage;

/// Snapshot of the job counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounters {
    pub calls: usize,
    pub retries: usize,
    pub failed_segments: usize,
}

#[derive(Debug)]
pub struct JobContext {
    permits: Semaphore,
    max_concurrent_calls: usize,
    calls: AtomicUsize,
    retries: AtomicUsize,
    failed_segments: AtomicUsize,
    usage: Mutex<TokenUsageStats>,
}

impl JobContext {
    pub fn new(max_concurrent_calls: usize) -> Self {
        let max_concurrent_calls = max_concurrent_calls.max(1);
        Self {
            permits: Semaphore::new(max_concurrent_calls),
            max_concurrent_calls,
            calls: AtomicUsize::new(0),
            retries: AtomicUsize::new(0),
            failed_segments: AtomicUsize::new(0),
            usage: Mutex::new(TokenUsageStats::new()),
        }
    }

    /// Context that labels its usage summary with provider and model
    pub fn with_provider_info(max_concurrent_calls: usize, provider: &str, model: &str) -> Self {
        let context = Self::new(max_concurrent_calls);
        *context.usage.lock() = TokenUsageStats::with_provider_info(provider.to_string(), model.to_string());
        context
    }

    pub fn max_concurrent_calls(&self) -> usize {
        self.max_concurrent_calls
    }

    /// Wait for a free provider call slot
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, ProviderError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| ProviderError::RequestFailed("Job was shut down".to_string()))
    }

    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_failed_segments(&self, count: usize) {
        self.failed_segments.fetch_add(count, Ordering::SeqCst);
    }

    pub fn add_usage(&self, usage: Option<TokenUsage>, elapsed: Duration) {
        let mut stats = self.usage.lock();
        if let Some(usage) = usage {
            stats.add_token_usage(Some(usage.input_tokens), Some(usage.output_tokens));
        }
        stats.api_duration += elapsed;
    }

    pub fn usage(&self) -> TokenUsageStats {
        self.usage.lock().clone()
    }

    pub fn counters(&self) -> JobCounters {
        JobCounters {
            calls: self.calls.load(Ordering::SeqCst),
            retries: self.retries.load(Ordering::SeqCst),
            failed_segments: self.failed_segments.load(Ordering::SeqCst),
        }
    }
}
