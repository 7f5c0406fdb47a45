/*!
 * Error types for the fusion-translator application.
 *
 * This module contains custom error types for the different layers of the
 * pipeline, using the thiserror crate for ergonomic error definitions:
 *
 * - `ParseError`: malformed or unterminated shortcode markup (per document)
 * - `SegmentValidationError`: a translation that failed the integrity check
 * - `ProviderError`: transport or request failures from a translation provider
 * - `TranslationError`: per-segment translation failure
 * - `AppError`: top-level error for the CLI and job layer
 */

use std::fmt;

use thiserror::Error;

/// Reason a shortcode document could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A closer did not match the innermost open shortcode
    MismatchedCloser {
        /// Tag of the innermost open shortcode
        expected: String,
        /// Tag named by the closer
        found: String,
    },

    /// A closer appeared while no shortcode was open
    UnexpectedCloser(String),

    /// End of input reached with this shortcode still open
    UnterminatedShortcode(String),

    /// An opener or closer token never reached its closing bracket
    UnterminatedToken(String),

    /// A `<script>`, `<style>` or comment span never ended
    UnterminatedRawSpan(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MismatchedCloser { expected, found } => {
                write!(f, "closer [/{}] does not match open [{}]", found, expected)
            }
            Self::UnexpectedCloser(tag) => write!(f, "closer [/{}] has no open shortcode", tag),
            Self::UnterminatedShortcode(tag) => write!(f, "shortcode [{}] is never closed", tag),
            Self::UnterminatedToken(tag) => write!(f, "token for [{}] is missing its closing bracket", tag),
            Self::UnterminatedRawSpan(kind) => write!(f, "{} span is never closed", kind),
        }
    }
}

/// Structural error in shortcode markup
///
/// `offset` is the byte offset of the offending token in the source text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at offset {offset}: {reason}")]
pub struct ParseError {
    /// Byte offset of the offending token
    pub offset: usize,
    /// What went wrong
    pub reason: ParseErrorKind,
}

impl ParseError {
    pub fn new(offset: usize, reason: ParseErrorKind) -> Self {
        Self { offset, reason }
    }
}

/// A translated segment failed the structural integrity check
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("segment {segment_id} failed validation: {reason}")]
pub struct SegmentValidationError {
    /// Id of the segment
    pub segment_id: String,
    /// Human-readable reason
    pub reason: String,
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The call did not answer within the configured wait
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The request itself is unacceptable (unknown model, unsupported language)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Whether retrying the same request can reasonably succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::ParseError(_)
            | Self::ConnectionError(_)
            | Self::Timeout(_)
            | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::AuthenticationError(_) | Self::InvalidRequest(_) => false,
        }
    }

    /// Map an HTTP error status to the matching provider error
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            400 | 404 | 422 => Self::InvalidRequest(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(0)
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur while translating a segment
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The translation came back structurally damaged
    #[error("Validation error: {0}")]
    Validation(#[from] SegmentValidationError),

    /// The provider answered but left this segment out
    #[error("Segment {0} missing from provider response")]
    Missing(String),
}

impl TranslationError {
    /// Transport failures and validation mismatches are retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_transient(),
            Self::Validation(_) | Self::Missing(_) => true,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a job file operation
    #[error("Job I/O error: {0}")]
    JobIo(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from shortcode parsing
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::JobIo(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_transient_classification() {
        assert!(ProviderError::Timeout(100).is_transient());
        assert!(ProviderError::RateLimitExceeded("slow down".into()).is_transient());
        assert!(ProviderError::ApiError { status_code: 503, message: "busy".into() }.is_transient());
        assert!(!ProviderError::ApiError { status_code: 418, message: "teapot".into() }.is_transient());
        assert!(!ProviderError::AuthenticationError("bad key".into()).is_transient());
        assert!(!ProviderError::InvalidRequest("unknown model".into()).is_transient());
    }

    #[test]
    fn test_from_status_should_pick_matching_variant() {
        assert!(matches!(ProviderError::from_status(401, "x"), ProviderError::AuthenticationError(_)));
        assert!(matches!(ProviderError::from_status(429, "x"), ProviderError::RateLimitExceeded(_)));
        assert!(matches!(ProviderError::from_status(400, "x"), ProviderError::InvalidRequest(_)));
        assert!(matches!(ProviderError::from_status(502, "x"), ProviderError::ApiError { status_code: 502, .. }));
    }

    #[test]
    fn test_parse_error_display_should_include_offset() {
        let error = ParseError::new(
            26,
            ParseErrorKind::MismatchedCloser {
                expected: "fusion_text".into(),
                found: "fusion_builder_container".into(),
            },
        );
        let display = error.to_string();
        assert!(display.contains("offset 26"));
        assert!(display.contains("[/fusion_builder_container]"));
    }

    #[test]
    fn test_validation_error_is_transient() {
        let error: TranslationError = SegmentValidationError {
            segment_id: "abc".into(),
            reason: "bracket count".into(),
        }
        .into();
        assert!(error.is_transient());
    }
}
