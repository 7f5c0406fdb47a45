use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Provider, TokenUsage};
use crate::errors::ProviderError;

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant, or tool)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Additional model parameters
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Context window size
    #[serde(skip_serializing_if = "Option::is_none")]
    num_ctx: Option<u32>,
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model name to use for generation
    model: String,
    /// Messages of the conversation
    messages: Vec<ChatMessage>,
    /// Format to return a response in
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
    /// Whether to stream the response
    stream: bool,
    /// How long to keep the model loaded in memory
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

/// Chat response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated message
    pub message: ChatMessage,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl ChatRequest {
    /// Create a new non-streaming chat request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            format: None,
            options: None,
            stream: false,
            keep_alive: None,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(ChatOptions::default).temperature = Some(temperature);
        self
    }

    /// Set the context window size
    pub fn num_ctx(mut self, num_ctx: u32) -> Self {
        self.options.get_or_insert_with(ChatOptions::default).num_ctx = Some(num_ctx);
        self
    }

    /// Set the response format (`json`)
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set how long to keep the model loaded
    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }
}

impl Ollama {
    /// Create a client for `host` (with or without scheme) on `port`
    pub fn new(host: impl Into<String>, port: u16, timeout_secs: u64) -> Self {
        let host = host.into();
        let base_url = match host.split_once("://") {
            Some((scheme, rest)) if rest.contains(':') => format!("{}://{}", scheme, rest.trim_end_matches('/')),
            Some((scheme, rest)) => format!("{}://{}:{}", scheme, rest.trim_end_matches('/'), port),
            None => format!("http://{}:{}", host, port),
        };

        Self {
            base_url,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                // Ollama speaks HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(20)
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Parse a body that may be a single object or streamed JSON lines
    fn parse_chat_body(body: &str) -> Result<ChatResponse, ProviderError> {
        if let Ok(response) = serde_json::from_str::<ChatResponse>(body) {
            return Ok(response);
        }

        let mut content = String::new();
        let mut last: Option<ChatResponse> = None;
        for line in body.lines().filter(|l| !l.trim().is_empty()) {
            let chunk: ChatResponse = serde_json::from_str(line).map_err(|e| {
                ProviderError::ParseError(format!("Failed to parse Ollama API chat response: {}", e))
            })?;
            content.push_str(&chunk.message.content);
            last = Some(chunk);
        }

        let mut response = last.ok_or_else(|| ProviderError::ParseError("Empty Ollama API response".to_string()))?;
        response.message.content = content;
        Ok(response)
    }
}

#[async_trait]
impl Provider for Ollama {
    type Request = ChatRequest;
    type Response = ChatResponse;

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let body = response.text().await?;
        Self::parse_chat_body(&body)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::from_status(
                response.status().as_u16(),
                "Ollama version endpoint unavailable",
            ))
        }
    }

    fn extract_text(response: &ChatResponse) -> String {
        response.message.content.clone()
    }

    fn usage(response: &ChatResponse) -> Option<TokenUsage> {
        match (response.prompt_eval_count, response.eval_count) {
            (None, None) => None,
            (input, output) => Some(TokenUsage {
                input_tokens: input.unwrap_or(0),
                output_tokens: output.unwrap_or(0),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_construction() {
        assert_eq!(Ollama::new("localhost", 11434, 5).base_url(), "http://localhost:11434");
        assert_eq!(Ollama::new("https://gpu.local", 11434, 5).base_url(), "https://gpu.local:11434");
        assert_eq!(Ollama::new("http://gpu.local:8080/", 11434, 5).base_url(), "http://gpu.local:8080");
    }

    #[test]
    fn test_parse_chat_body_should_join_streamed_lines() {
        let body = concat!(
            r#"{"model":"m","message":{"role":"assistant","content":"{\"seg"},"done":false}"#,
            "\n",
            r#"{"model":"m","message":{"role":"assistant","content":"ments\":[]}"},"done":true,"prompt_eval_count":4,"eval_count":2}"#,
        );
        let response = Ollama::parse_chat_body(body).unwrap();
        assert_eq!(Ollama::extract_text(&response), r#"{"segments":[]}"#);
        assert_eq!(Ollama::usage(&response).map(|u| u.total()), Some(6));
    }

    #[test]
    fn test_parse_chat_body_should_reject_garbage() {
        assert!(matches!(Ollama::parse_chat_body("not json"), Err(ProviderError::ParseError(_))));
        assert!(matches!(Ollama::parse_chat_body(""), Err(ProviderError::ParseError(_))));
    }
}
