/*!
 * Per-document pipeline.
 *
 * parse -> extract -> translate -> apply -> serialize, with every document
 * ending in a `DocumentOutcome`. A document that fails to parse produces a
 * `ParseFailed` outcome and never disturbs the others; translation problems
 * degrade to source text and are listed in the outcome's report.
 */

use anyhow::{Result, anyhow};
use futures::stream::{self, StreamExt};
use log::{error, info};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::app_config::Config;
use crate::errors::ParseError;
use crate::providers::{TokenUsage, Translator};
use crate::segments::{ApplyReport, Extractor, FilterPolicy, IntegrityPolicy, Segment, apply};
use crate::shortcode::{ParserOptions, Tree, parse_with, serialize};
use crate::translation::{BatchOptions, BatchTranslator, JobContext};

/// A source text and its identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Stable key, e.g. the container path relative to the job
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A parsed document with its placeholders in place
#[derive(Debug)]
pub struct PreparedDocument {
    pub document_id: String,
    pub tree: Tree,
    pub segments: Vec<Segment>,
}

/// How one document ended
#[derive(Debug, Clone)]
pub enum DocumentOutcome {
    /// Output produced; `report` lists segments that kept their source text
    Translated {
        document_id: String,
        text: String,
        report: ApplyReport,
        usage: TokenUsage,
    },
    /// The document could not be parsed and produced no output
    ParseFailed { document_id: String, error: ParseError },
}

impl DocumentOutcome {
    pub fn document_id(&self) -> &str {
        match self {
            Self::Translated { document_id, .. } | Self::ParseFailed { document_id, .. } => document_id,
        }
    }

    pub fn is_translated(&self) -> bool {
        matches!(self, Self::Translated { .. })
    }
}

/// Runs documents through parse, extract, translate, apply and serialize
#[derive(Debug)]
pub struct DocumentPipeline {
    parser: ParserOptions,
    extractor: Extractor,
    integrity: IntegrityPolicy,
    translator: BatchTranslator,
}

impl DocumentPipeline {
    pub fn new(parser: ParserOptions, extractor: Extractor, integrity: IntegrityPolicy, translator: BatchTranslator) -> Self {
        Self {
            parser,
            extractor,
            integrity,
            translator,
        }
    }

    /// Build a pipeline from configuration around a translator
    pub fn from_config(config: &Config, translator: Arc<dyn Translator>) -> Result<Self> {
        let policy = FilterPolicy::from_config(&config.filter).map_err(|e| anyhow!("Invalid filter pattern: {}", e))?;
        let common = &config.translation.common;
        let options = BatchOptions {
            batch_size: common.batch_size,
            retry: common.retry_policy(),
            request_timeout: common.request_timeout(),
            integrity: config.integrity.clone(),
        };

        Ok(Self::new(
            config.parser.clone(),
            Extractor::new(policy),
            config.integrity.clone(),
            BatchTranslator::new(translator, options),
        ))
    }

    pub fn translator(&self) -> &BatchTranslator {
        &self.translator
    }

    /// Parse and extract; the tree keeps placeholders for every segment
    pub fn prepare(&self, document: &Document) -> Result<PreparedDocument, ParseError> {
        let mut tree = parse_with(&document.text, &self.parser)?;
        let segments = self.extractor.extract(&document.id, &mut tree);
        Ok(PreparedDocument {
            document_id: document.id.clone(),
            tree,
            segments,
        })
    }

    /// Apply translations and serialize
    pub fn finish(&self, mut prepared: PreparedDocument, translations: &HashMap<String, String>) -> (String, ApplyReport) {
        let report = apply(&mut prepared.tree, translations, &self.integrity);
        (serialize(&prepared.tree), report)
    }

    /// Run one document end to end
    pub async fn process(
        &self,
        document: &Document,
        target_language: &str,
        model: &str,
        context: &JobContext,
    ) -> DocumentOutcome {
        let prepared = match self.prepare(document) {
            Ok(prepared) => prepared,
            Err(error) => {
                error!("Failed to parse {}: {}", document.id, error);
                return DocumentOutcome::ParseFailed {
                    document_id: document.id.clone(),
                    error,
                };
            }
        };

        let result = self
            .translator
            .translate_all(&prepared.segments, target_language, model, context)
            .await;
        let (text, report) = self.finish(prepared, &result.translations);

        DocumentOutcome::Translated {
            document_id: document.id.clone(),
            text,
            report,
            usage: result.usage,
        }
    }

    /// Run many documents, at most `concurrency` at a time; output order is not guaranteed
    pub async fn process_all(
        &self,
        documents: &[Document],
        target_language: &str,
        model: &str,
        context: &JobContext,
        concurrency: usize,
    ) -> Vec<DocumentOutcome> {
        stream::iter(documents)
            .map(|document| self.process(document, target_language, model, context))
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }
}

/// Totals over a set of document outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub documents: usize,
    pub translated: usize,
    /// `(document id, reason)` for each document that failed to parse
    pub parse_failures: Vec<(String, String)>,
    pub resolved_segments: usize,
    pub unresolved_segments: usize,
    pub usage: TokenUsage,
}

impl RunSummary {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a DocumentOutcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.record(outcome);
        }
        summary
    }

    pub fn record(&mut self, outcome: &DocumentOutcome) {
        self.documents += 1;
        match outcome {
            DocumentOutcome::Translated { report, usage, .. } => {
                self.translated += 1;
                self.resolved_segments += report.resolved;
                self.unresolved_segments += report.unresolved.len();
                self.usage.input_tokens += usage.input_tokens;
                self.usage.output_tokens += usage.output_tokens;
            }
            DocumentOutcome::ParseFailed { document_id, error } => {
                self.parse_failures.push((document_id.clone(), error.to_string()));
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.parse_failures.is_empty() || self.unresolved_segments > 0
    }

    /// Log the summary, one failure per line
    pub fn log(&self) {
        info!("{}", self);
        for (document_id, reason) in &self.parse_failures {
            error!("  {}: {}", document_id, reason);
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "documents={} translated={} parse_failed={} segments_resolved={} segments_unresolved={} tokens_in={} tokens_out={}",
            self.documents,
            self.translated,
            self.parse_failures.len(),
            self.resolved_segments,
            self.unresolved_segments,
            self.usage.input_tokens,
            self.usage.output_tokens
        )
    }
}
