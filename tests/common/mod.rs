/*!
 * Common test utilities for the fusion-translator test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use fusion_translator::app_config::Config;
use fusion_translator::translation::RetryPolicy;

/// A page with two containers, a toggle, inline markup and non-translatable text
pub const SAMPLE_PAGE: &str = r#"[fusion_builder_container type="flex" hundred_percent="no" background_image="https://example.com/bg.jpg"][fusion_builder_row][fusion_builder_column type="1_1"][fusion_title title_type="text" size="2"]Welcome to our shop[/fusion_title][fusion_text]<p>We build <strong>durable</strong> furniture.</p>
<p>Call us: +49 30 1234567</p>[/fusion_text][/fusion_builder_column][/fusion_builder_row][/fusion_builder_container]

[fusion_builder_container type="flex"][fusion_builder_row][fusion_builder_column type="1_2"][fusion_accordion][fusion_toggle title="Shipping" open="no"]Orders ship within 3 days.[/fusion_toggle][/fusion_accordion][fusion_separator style_type="default" /][fusion_button link="https://example.com/contact" color="default"]Contact us[/fusion_button][/fusion_builder_column][/fusion_builder_row][/fusion_builder_container]
"#;

/// A container whose closer does not match the innermost open shortcode
pub const BROKEN_CONTAINER: &str =
    "[fusion_builder_container][fusion_text]Hello[/fusion_builder_container]";

/// Route library logs through env_logger; `RUST_LOG=debug` shows them
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content, creating parent folders
pub fn create_test_file(dir: &Path, relative: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(relative);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Configuration that keeps jobs in `jobs_dir` and retries fast
pub fn test_config(jobs_dir: &Path) -> Config {
    let mut config = Config::default();
    config.target_language = "German".to_string();
    config.job.jobs_dir = jobs_dir.to_path_buf();
    config.translation.common.max_attempts = 3;
    config.translation.common.retry_backoff_ms = 10;
    config.translation.common.max_backoff_ms = 40;
    config
}

/// Retry policy with small delays
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay_ms: 100,
        max_delay_ms: 10_000,
    }
}
