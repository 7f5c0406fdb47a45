/*!
 * Core translation service implementation.
 *
 * This module contains the `TranslationService`, the provider-backed
 * `Translator`: it renders the localization prompt, sends one batch to the
 * configured provider and parses the JSON reply back into a segment map.
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::debug;
use std::time::{Duration, Instant};
use url::Url;

use super::prompt;
use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::ProviderError;
use crate::providers::Provider;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::ollama::{ChatRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::{SegmentPayload, TokenUsage, TranslateResponse, Translator};

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Total time spent on API requests
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenUsageStats {
    /// Create a new empty token usage stats instance
    pub fn new() -> Self {
        Self::with_provider_info(String::new(), String::new())
    }

    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String, model: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
            provider,
            model,
        }
    }

    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        // Use the API duration for rate calculation, with fallback to elapsed time
        let duration_minutes = if self.api_duration.as_secs_f64() > 0.0 {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        let elapsed_minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        let api_minutes = self.api_duration.as_secs_f64() / 60.0;

        format!(
            "Token Usage Summary:\n\
             Provider: {}\n\
             Model: {}\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             Elapsed time: {:.2} minutes\n\
             API request time: {:.2} minutes\n\
             Tokens per minute: {:.2}",
            self.provider,
            self.model,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            elapsed_minutes,
            api_minutes,
            self.tokens_per_minute()
        )
    }
}

/// Parse an endpoint string into host and port
fn parse_endpoint(endpoint: &str) -> Result<(String, u16)> {
    if endpoint.is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("http://{}", endpoint))?
    };

    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Invalid host in endpoint: {}", endpoint))?
        .to_string();

    let port = url.port().unwrap_or(if url.scheme() == "https" { 443 } else { 80 });

    Ok((format!("{}://{}", url.scheme(), host), port))
}

/// Translation provider implementation variants
#[derive(Debug)]
enum TranslationProviderImpl {
    /// Ollama LLM service
    Ollama { client: Ollama },

    /// OpenAI API service, or an OpenAI-compatible local server
    OpenAI { client: OpenAI },

    /// Anthropic API service
    Anthropic { client: Anthropic },
}

/// Provider-backed segment translator
#[derive(Debug)]
pub struct TranslationService {
    /// Provider implementation
    provider: TranslationProviderImpl,

    /// Configuration for the translation service
    pub config: TranslationConfig,
}

impl TranslationService {
    /// Create a new translation service from configuration
    pub fn new(config: TranslationConfig) -> Result<Self> {
        let timeout_secs = config.get_timeout_secs();
        let model = config.get_model();

        let provider = match config.provider {
            ConfigTranslationProvider::Ollama => {
                let (host, port) = parse_endpoint(&config.get_endpoint())?;
                TranslationProviderImpl::Ollama {
                    client: Ollama::new(host, port, timeout_secs),
                }
            }
            ConfigTranslationProvider::OpenAI | ConfigTranslationProvider::LMStudio => {
                TranslationProviderImpl::OpenAI {
                    client: OpenAI::new(config.get_api_key(), config.get_endpoint(), model, timeout_secs),
                }
            }
            ConfigTranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                client: Anthropic::new(config.get_api_key(), config.get_endpoint(), model, timeout_secs),
            },
        };

        Ok(Self { provider, config })
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.provider {
            TranslationProviderImpl::Ollama { client } => client.test_connection().await,
            TranslationProviderImpl::OpenAI { client } => client.test_connection().await,
            TranslationProviderImpl::Anthropic { client } => client.test_connection().await,
        }
    }

    /// Send one system + user exchange and return the reply text and usage
    async fn complete_chat(
        &self,
        system: &str,
        user: &str,
        model: &str,
    ) -> Result<(String, Option<TokenUsage>), ProviderError> {
        let temperature = self.config.common.temperature;

        match &self.provider {
            TranslationProviderImpl::Ollama { client } => {
                let mut request = ChatRequest::new(model)
                    .add_message("system", system)
                    .add_message("user", user)
                    .format("json");
                if let Some(t) = temperature {
                    request = request.temperature(t);
                }
                let response = client.complete(request).await?;
                Ok((Ollama::extract_text(&response), Ollama::usage(&response)))
            }
            TranslationProviderImpl::OpenAI { client } => {
                let mut request = OpenAIRequest::new(model)
                    .add_message("system", system)
                    .add_message("user", user);
                if self.config.provider == ConfigTranslationProvider::OpenAI {
                    request = request.json_object();
                }
                if let Some(t) = temperature {
                    request = request.temperature(t);
                }
                let response = client.complete(request).await?;
                Ok((OpenAI::extract_text(&response), OpenAI::usage(&response)))
            }
            TranslationProviderImpl::Anthropic { client } => {
                let mut request = AnthropicRequest::new(model, 8192)
                    .system(system)
                    .add_message("user", user);
                if let Some(t) = temperature {
                    request = request.temperature(t);
                }
                let response = client.complete(request).await?;
                Ok((Anthropic::extract_text(&response), Anthropic::usage(&response)))
            }
        }
    }
}

#[async_trait]
impl Translator for TranslationService {
    async fn translate(
        &self,
        segments: &[SegmentPayload],
        target_language: &str,
        model: &str,
    ) -> Result<TranslateResponse, ProviderError> {
        let system = prompt::build_system_prompt(&self.config.common.system_prompt, target_language);
        let user = prompt::build_user_message(segments)?;

        debug!(
            "Sending {} segments to {} ({})",
            segments.len(),
            self.config.provider.display_name(),
            model
        );
        let (reply, usage) = self.complete_chat(&system, &user, model).await?;
        let translations = prompt::parse_reply(&reply)?;

        Ok(TranslateResponse { translations, usage })
    }
}
