/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API integration
 * - Anthropic: Anthropic API integration
 * - Mock: scripted translator for tests
 *
 * Two seams live here. `Provider` is the raw request/response contract of a
 * chat API. `Translator` is what the batch orchestrator talks to: a batch of
 * segments in, a map of translations out.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably in the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the connection is successful, or an error
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;

    /// Token counts reported by the provider, if any
    fn usage(response: &Self::Response) -> Option<TokenUsage>;
}

/// One segment as sent to a translator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentPayload {
    pub id: String,
    pub text: String,
}

/// Token counts for a single call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Result of one translator call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslateResponse {
    /// Translations keyed by segment id; may be partial
    pub translations: HashMap<String, String>,
    pub usage: Option<TokenUsage>,
}

/// Segment-level translation backend
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Translate one batch of segments into `target_language`
    async fn translate(
        &self,
        segments: &[SegmentPayload],
        target_language: &str,
        model: &str,
    ) -> Result<TranslateResponse, ProviderError>;
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
