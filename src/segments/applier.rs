/*!
 * Segment applier: fills placeholders with validated translations.
 */

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::integrity::IntegrityPolicy;
use crate::shortcode::{PlaceholderState, Tree};

/// What happened to the placeholders of one tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Placeholders filled with a translation
    pub resolved: usize,
    /// Ids left in their source language, in document order
    pub unresolved: Vec<String>,
}

impl ApplyReport {
    pub fn total(&self) -> usize {
        self.resolved + self.unresolved.len()
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Resolve every placeholder in `tree` from `translations`.
///
/// Each translation is validated again; a missing or rejected one leaves the
/// placeholder unresolved so it serializes its source text.
pub fn apply(tree: &mut Tree, translations: &HashMap<String, String>, integrity: &IntegrityPolicy) -> ApplyReport {
    let mut report = ApplyReport::default();

    for placeholder in tree.placeholders_mut() {
        let outcome = match translations.get(&placeholder.segment_id) {
            Some(text) => integrity
                .check(&placeholder.segment_id, &placeholder.source, text)
                .map(|_| text.clone())
                .map_err(|e| e.reason),
            None => Err("no translation".to_string()),
        };

        match outcome {
            Ok(text) => {
                placeholder.translation = Some(text);
                placeholder.state = PlaceholderState::Resolved;
                report.resolved += 1;
            }
            Err(reason) => {
                debug!("Keeping source for segment {}: {}", placeholder.segment_id, reason);
                placeholder.translation = None;
                placeholder.state = PlaceholderState::Unresolved;
                report.unresolved.push(placeholder.segment_id.clone());
            }
        }
    }

    if !report.unresolved.is_empty() {
        warn!(
            "{} of {} segments kept their source text",
            report.unresolved.len(),
            report.total()
        );
    }
    report
}
