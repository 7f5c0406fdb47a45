/*!
 * Prompt construction and reply parsing for segment batches.
 *
 * Requests and replies share one JSON shape:
 * `{"segments": [{"id": "...", "text": "..."}]}`.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::ProviderError;
use crate::providers::SegmentPayload;

/// Default system prompt; `{target_language}` is substituted
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a strict localization engine. Translate to {target_language}. \
Return VALID JSON of the form {\"segments\": [{\"id\": \"...\", \"text\": \"...\"}]}. \
Do not change ids. Do not add or remove segments. Do not reorder segments. \
Absolutely never modify ANYTHING inside square brackets [ ... ]. \
That includes shortcodes, shortcode attributes, closing tags, and tokens like on_toggle], off_toggle]. \
Keep any HTML tags and HTML entities unchanged. \
Do not change URLs, emails, numbers, units (px, %, vh), or CSS variables like var(--...). \
Only translate human-readable text outside of [ ... ] and outside of HTML tags/attributes.";

/// Wire format of a batch
#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentBatch {
    pub segments: Vec<SegmentPayload>,
}

static FENCED_JSON_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("Invalid fenced JSON regex")
});

/// Fill the system prompt template
pub fn build_system_prompt(template: &str, target_language: &str) -> String {
    template.replace("{target_language}", target_language)
}

/// Serialize a batch as the user message
pub fn build_user_message(segments: &[SegmentPayload]) -> Result<String, ProviderError> {
    let batch = SegmentBatch {
        segments: segments.to_vec(),
    };
    serde_json::to_string(&batch)
        .map_err(|e| ProviderError::RequestFailed(format!("Failed to serialize segments: {}", e)))
}

/// Pull the segment map out of a model reply.
///
/// Accepts bare JSON, a fenced ```json block, or the outermost `{...}` in
/// surrounding prose. Duplicate ids keep the first occurrence.
pub fn parse_reply(reply: &str) -> Result<HashMap<String, String>, ProviderError> {
    let trimmed = reply.trim();

    let candidates = [
        Some(trimmed),
        FENCED_JSON_REGEX
            .captures(trimmed)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str()),
        match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => Some(&trimmed[start..=end]),
            _ => None,
        },
    ];

    let batch = candidates
        .into_iter()
        .flatten()
        .find_map(|candidate| serde_json::from_str::<SegmentBatch>(candidate).ok())
        .ok_or_else(|| {
            let preview: String = trimmed.chars().take(200).collect();
            ProviderError::ParseError(format!("Reply is not a segment batch: {}", preview))
        })?;

    let mut map = HashMap::with_capacity(batch.segments.len());
    for segment in batch.segments {
        map.entry(segment.id).or_insert(segment.text);
    }
    Ok(map)
}
