/*!
 * Structural integrity check for translated segments.
 *
 * A translation may change every word but must keep the markup. Brackets
 * and the bracketed tokens between them stay exactly as written, inline tags
 * and entities survive, and no shortcode fragments appear that the source
 * did not contain.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use super::markup;
use crate::errors::SegmentValidationError;

/// Rules applied to every translation before it is accepted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IntegrityPolicy {
    /// Substrings a translation must not introduce (case-insensitive)
    pub forbidden_tokens: Vec<String>,

    /// Compare inline tags and entities as a multiset
    pub check_markup: bool,
}

impl Default for IntegrityPolicy {
    fn default() -> Self {
        Self {
            forbidden_tokens: vec!["on_toggle]".to_string(), "off_toggle]".to_string()],
            check_markup: true,
        }
    }
}

impl IntegrityPolicy {
    /// Accept or reject a translation of `source`
    pub fn check(&self, segment_id: &str, source: &str, translated: &str) -> Result<(), SegmentValidationError> {
        let reject = |reason: String| {
            debug!("Rejecting translation for segment {}: {}", segment_id, reason);
            Err(SegmentValidationError {
                segment_id: segment_id.to_string(),
                reason,
            })
        };

        if translated.trim().is_empty() && !source.trim().is_empty() {
            return reject("translation is empty".to_string());
        }

        for bracket in ['[', ']'] {
            let expected = source.matches(bracket).count();
            let found = translated.matches(bracket).count();
            if expected != found {
                return reject(format!("expected {} '{}' but found {}", expected, bracket, found));
            }
        }

        let expected = markup::bracket_tokens(source);
        let found = markup::bracket_tokens(translated);
        if expected != found {
            return reject(format!("bracketed tokens changed (expected {:?}, found {:?})", expected, found));
        }

        if self.check_markup {
            let mut expected = markup::markup_tokens(source);
            let mut found = markup::markup_tokens(translated);
            expected.sort_unstable();
            found.sort_unstable();
            if expected != found {
                let missing: Vec<&str> = expected.iter().filter(|t| !found.contains(t)).copied().collect();
                let added: Vec<&str> = found.iter().filter(|t| !expected.contains(t)).copied().collect();
                return reject(format!(
                    "inline markup changed (missing: {:?}, added: {:?})",
                    missing, added
                ));
            }
        }

        let source_lower = source.to_lowercase();
        let translated_lower = translated.to_lowercase();
        if let Some(token) = self
            .forbidden_tokens
            .iter()
            .map(|t| t.to_lowercase())
            .find(|t| translated_lower.contains(t.as_str()) && !source_lower.contains(t.as_str()))
        {
            return reject(format!("introduces forbidden token '{}'", token));
        }

        Ok(())
    }
}
