/*!
 * Tests for application configuration functionality
 */

use fusion_translator::app_config::{Config, LogLevel, ProviderConfig, TranslationProvider};
use std::time::Duration;

/// Test default configuration values
#[test]
fn test_default_config_should_have_correct_defaults() {
    let config = Config::default();

    assert_eq!(config.target_language, "English");
    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation.get_model(), "gpt-5-mini");
    assert_eq!(config.translation.available_providers.len(), 4);

    let common = &config.translation.common;
    assert_eq!(common.batch_size, 40);
    assert_eq!(common.max_attempts, 5);
    assert_eq!(common.retry_policy().delay_for(0), Duration::from_millis(1000));
    assert_eq!(common.request_timeout(), Duration::from_secs(180));
    assert!(common.temperature.is_none());

    assert_eq!(config.job.document_concurrency, 8);
    assert!(!config.job.overwrite);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_validate_should_reject_inconsistent_values() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.target_language = "  ".to_string();
    assert!(config.validate().is_err());
    config.target_language = "German".to_string();

    config.translation.common.batch_size = 0;
    assert!(config.validate().is_err());
    config.translation.common.batch_size = 10;

    config.job.container_pattern = "[unclosed".to_string();
    assert!(config.validate().is_err());
    config.job.container_pattern = fusion_translator::app_config::default_container_pattern();

    config.filter.skip_patterns = vec!["(".to_string()];
    assert!(config.validate().is_err());
    config.filter.skip_patterns.clear();

    config.translation.set_concurrent_requests(0);
    assert!(config.validate().is_err());
    config.translation.set_concurrent_requests(2);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_for_translation_should_check_api_key() {
    let mut config = Config::default();

    config.translation.provider = TranslationProvider::Ollama;
    assert!(config.validate_for_translation().is_ok());

    config.translation.provider = TranslationProvider::Anthropic;
    if std::env::var("ANTHROPIC_API_KEY").is_err() {
        let err = config.validate_for_translation().unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    config.translation.available_providers = vec![ProviderConfig {
        api_key: "sk-test".to_string(),
        ..ProviderConfig::new(TranslationProvider::Anthropic)
    }];
    assert!(config.validate_for_translation().is_ok());
    assert_eq!(config.translation.get_api_key(), "sk-test");
}

#[test]
fn test_minimal_json_should_fill_defaults() {
    let json = r#"{
        "target_language": "de",
        "translation": {
            "provider": "ollama",
            "available_providers": [{ "type": "ollama", "model": "mistral" }],
            "common": {}
        }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.get_model(), "mistral");
    assert_eq!(config.translation.get_endpoint(), "http://localhost:11434");
    assert_eq!(config.translation.optimal_concurrent_requests(), 8);
    assert_eq!(config.translation.common.batch_size, 40);
    assert!(config.filter.skip_numeric);
    assert!(config.integrity.check_markup);
    assert_eq!(config.job.jobs_dir, std::path::PathBuf::from("jobs"));
    assert!(config.parser.is_shortcode("fusion_text"));
}

#[test]
fn test_overrides_should_create_missing_provider_entry() {
    let mut config = Config::default();
    config.translation.available_providers.clear();
    config.translation.provider = TranslationProvider::LMStudio;

    config.translation.set_model("qwen2.5-7b");
    config.translation.set_concurrent_requests(3);

    assert_eq!(config.translation.available_providers.len(), 1);
    assert_eq!(config.translation.get_model(), "qwen2.5-7b");
    assert_eq!(config.translation.optimal_concurrent_requests(), 3);
    assert_eq!(config.translation.get_endpoint(), "http://localhost:1234/v1");
}

#[test]
fn test_provider_from_str_should_be_case_insensitive() {
    assert_eq!("OpenAI".parse::<TranslationProvider>().unwrap(), TranslationProvider::OpenAI);
    assert_eq!("lmstudio".parse::<TranslationProvider>().unwrap(), TranslationProvider::LMStudio);
    assert!("deepl".parse::<TranslationProvider>().is_err());
    assert_eq!(TranslationProvider::LMStudio.display_name(), "LM Studio");
}
