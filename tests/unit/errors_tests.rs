/*!
 * Tests for error types
 */

use fusion_translator::errors::{
    AppError, ParseError, ParseErrorKind, ProviderError, SegmentValidationError, TranslationError,
};

#[test]
fn test_parse_error_should_report_offset_and_reason() {
    let err = ParseError::new(
        44,
        ParseErrorKind::MismatchedCloser {
            expected: "fusion_text".to_string(),
            found: "fusion_builder_container".to_string(),
        },
    );
    assert_eq!(
        err.to_string(),
        "parse error at offset 44: closer [/fusion_builder_container] does not match open [fusion_text]"
    );

    let app_error: AppError = err.into();
    assert!(app_error.to_string().starts_with("Parse error: parse error at offset 44"));
}

#[test]
fn test_from_status_should_classify_http_errors() {
    assert!(matches!(ProviderError::from_status(401, "bad key"), ProviderError::AuthenticationError(_)));
    assert!(matches!(ProviderError::from_status(429, "slow"), ProviderError::RateLimitExceeded(_)));
    assert!(matches!(ProviderError::from_status(404, "no model"), ProviderError::InvalidRequest(_)));
    assert!(matches!(
        ProviderError::from_status(502, "gateway"),
        ProviderError::ApiError { status_code: 502, .. }
    ));
}

#[test]
fn test_translation_error_transience() {
    let validation = TranslationError::from(SegmentValidationError {
        segment_id: "s1".to_string(),
        reason: "expected 2 '[' but found 0".to_string(),
    });
    assert!(validation.is_transient());
    assert_eq!(
        validation.to_string(),
        "Validation error: segment s1 failed validation: expected 2 '[' but found 0"
    );

    assert!(TranslationError::Missing("s2".to_string()).is_transient());
    assert!(TranslationError::from(ProviderError::Timeout(500)).is_transient());
    assert!(!TranslationError::from(ProviderError::AuthenticationError("nope".to_string())).is_transient());
    assert!(!ProviderError::InvalidRequest("unknown model".to_string()).is_transient());
}

#[test]
fn test_io_error_should_become_job_io() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let app_error: AppError = io.into();
    assert!(matches!(app_error, AppError::JobIo(_)));
}
