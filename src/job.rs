/*!
 * Job folders and file-based stages.
 *
 * A job lives in `jobs/<job_name>/`:
 *
 * ```text
 * containers/<page-dir>/container_N.txt   export
 * containers/index.json
 * extracted/<page-dir>/container_N.json   extract
 * translated/<page-dir>/container_N.json  translate
 * applied/<page-dir>/container_N.txt      apply
 * output/<page-rel>.txt                   merge
 * ```
 *
 * Every stage reads the previous stage's files and writes its own, so any
 * stage can be re-run on its own. Translate skips files that already exist
 * unless `overwrite` is set.
 */

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::containers::{ContainerSplitter, IndexEntry, container_file_name, container_number, merge_containers};
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::language_utils::language_slug;
use crate::pipeline::{Document, DocumentOutcome, DocumentPipeline, RunSummary};
use crate::providers::TokenUsage;
use crate::segments::Segment;
use crate::translation::JobContext;

/// `extracted/…/container_N.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFile {
    pub source_key: String,
    pub segments: Vec<Segment>,
}

/// One entry of a translated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedSegment {
    pub id: String,
    pub text: String,
}

/// `translated/…/container_N.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedFile {
    pub source_key: String,
    pub segments: Vec<TranslatedSegment>,
    /// Ids that got no usable translation
    #[serde(default)]
    pub unresolved: Vec<String>,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl TranslatedFile {
    pub fn translations(&self) -> HashMap<String, String> {
        self.segments.iter().map(|s| (s.id.clone(), s.text.clone())).collect()
    }
}

/// Paths of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    root: PathBuf,
}

impl JobLayout {
    pub fn new<P: AsRef<Path>>(jobs_dir: P, job_name: &str) -> Self {
        Self {
            root: jobs_dir.as_ref().join(job_name),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn containers(&self) -> PathBuf {
        self.root.join("containers")
    }

    pub fn extracted(&self) -> PathBuf {
        self.root.join("extracted")
    }

    pub fn translated(&self) -> PathBuf {
        self.root.join("translated")
    }

    pub fn applied(&self) -> PathBuf {
        self.root.join("applied")
    }

    pub fn output(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn index_file(&self) -> PathBuf {
        self.containers().join("index.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("run.log")
    }

    pub fn create_dirs(&self) -> Result<()> {
        for dir in [
            self.containers(),
            self.extracted(),
            self.translated(),
            self.applied(),
            self.output(),
        ] {
            FileManager::ensure_dir(dir)?;
        }
        Ok(())
    }
}

/// `<language>_<YYYY-MM-DD_HH-MM>`
pub fn default_job_name(target_language: &str, now: DateTime<Local>) -> String {
    format!("{}_{}", language_slug(target_language), now.format("%Y-%m-%d_%H-%M"))
}

/// Counts for one stage run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub stage: &'static str,
    /// Files written
    pub files: usize,
    /// Files left alone because their output existed
    pub skipped: usize,
    /// Stage-specific count: containers, segments or pages
    pub items: usize,
    /// `(source key, reason)` per file the stage could not handle
    pub failures: Vec<(String, String)>,
    /// Segments without a translation
    pub unresolved: usize,
    pub usage: TokenUsage,
}

impl StageReport {
    fn new(stage: &'static str) -> Self {
        Self {
            stage,
            ..Self::default()
        }
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: files={} skipped={} items={} failed={} unresolved={}",
            self.stage,
            self.files,
            self.skipped,
            self.items,
            self.failures.len(),
            self.unresolved
        )?;
        if self.usage.total() > 0 {
            write!(f, " tokens_in={} tokens_out={}", self.usage.input_tokens, self.usage.output_tokens)?;
        }
        Ok(())
    }
}

/// Settings the translate stage needs
#[derive(Debug, Clone)]
pub struct TranslateSettings {
    pub target_language: String,
    pub model: String,
    pub overwrite: bool,
    /// Files translated at the same time
    pub document_concurrency: usize,
}

enum FileStatus {
    Translated { segments: usize, unresolved: usize, usage: TokenUsage },
    Empty,
    Skipped,
}

/// One job and its stages
#[derive(Debug, Clone)]
pub struct Job {
    layout: JobLayout,
}

impl Job {
    pub fn new(layout: JobLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &JobLayout {
        &self.layout
    }

    /// Cut every `*.txt` page under `src_dir` into container files
    pub fn export(&self, src_dir: &Path, splitter: &ContainerSplitter, progress: &ProgressBar) -> Result<StageReport> {
        if !FileManager::dir_exists(src_dir) {
            return Err(anyhow!("Source folder does not exist: {:?}", src_dir));
        }
        let pages = FileManager::find_files(src_dir, "txt")?;
        if pages.is_empty() {
            return Err(anyhow!("No .txt files in: {:?}", src_dir));
        }

        let containers_root = self.layout.containers();
        let mut report = StageReport::new("export");
        let mut index = Vec::with_capacity(pages.len());
        progress.set_length(pages.len() as u64);

        for page in &pages {
            let source_key = FileManager::relative_key(src_dir, page)?;
            let page_dir = containers_root.join(page_dir_for(&source_key));
            let content = FileManager::read_to_string(page)?;
            let containers = splitter.split(&content);

            FileManager::ensure_dir(&page_dir)?;
            for (i, container) in containers.iter().enumerate() {
                FileManager::write_to_file(page_dir.join(container_file_name(i + 1, "txt")), container)?;
            }
            if containers.is_empty() {
                warn!("No containers found in {}", source_key);
            }
            debug!("{} -> {:?} ({})", source_key, page_dir, containers.len());

            index.push(IndexEntry {
                source: source_key,
                output: FileManager::relative_key(&containers_root, &page_dir)?,
                containers: containers.len(),
            });
            report.files += 1;
            report.items += containers.len();
            progress.inc(1);
        }

        FileManager::write_json(self.layout.index_file(), &index)?;
        Ok(report)
    }

    /// Parse every container and write its segments
    pub fn extract(&self, pipeline: &DocumentPipeline, progress: &ProgressBar) -> Result<StageReport> {
        let containers_root = self.layout.containers();
        let files = container_files(&containers_root, "txt")?;
        let mut report = StageReport::new("extract");
        progress.set_length(files.len() as u64);

        for path in &files {
            let source_key = FileManager::relative_key(&containers_root, path)?;
            let document = Document::new(source_key.clone(), FileManager::read_to_string(path)?);

            match pipeline.prepare(&document) {
                Ok(prepared) => {
                    report.items += prepared.segments.len();
                    let extracted = ExtractedFile {
                        source_key: source_key.clone(),
                        segments: prepared.segments,
                    };
                    FileManager::write_json(self.stage_path(&self.layout.extracted(), &source_key, "json"), &extracted)?;
                    report.files += 1;
                }
                Err(e) => {
                    error!("Failed to parse {}: {}", source_key, e);
                    report.failures.push((source_key, e.to_string()));
                }
            }
            progress.inc(1);
        }

        Ok(report)
    }

    /// Translate every extracted file
    pub async fn translate(
        &self,
        pipeline: &DocumentPipeline,
        settings: &TranslateSettings,
        context: &JobContext,
        progress: &ProgressBar,
    ) -> Result<StageReport> {
        let extracted_root = self.layout.extracted();
        let files = container_files(&extracted_root, "json")?;
        let mut report = StageReport::new("translate");
        progress.set_length(files.len() as u64);

        let extracted_root = extracted_root.as_path();
        let results = stream::iter(files.iter())
            .map(|path| async move {
                let result = self.translate_file(extracted_root, path, pipeline, settings, context).await;
                progress.inc(1);
                result
            })
            .buffer_unordered(settings.document_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        for result in results {
            match result? {
                FileStatus::Translated {
                    segments,
                    unresolved,
                    usage,
                } => {
                    report.files += 1;
                    report.items += segments;
                    report.unresolved += unresolved;
                    report.usage.input_tokens += usage.input_tokens;
                    report.usage.output_tokens += usage.output_tokens;
                }
                FileStatus::Empty => report.files += 1,
                FileStatus::Skipped => report.skipped += 1,
            }
        }

        Ok(report)
    }

    async fn translate_file(
        &self,
        extracted_root: &Path,
        path: &Path,
        pipeline: &DocumentPipeline,
        settings: &TranslateSettings,
        context: &JobContext,
    ) -> Result<FileStatus> {
        let key = FileManager::relative_key(extracted_root, path)?;
        let out_path = self.layout.translated().join(&key);
        if FileManager::file_exists(&out_path) && !settings.overwrite {
            debug!("Skipping {}, already translated", key);
            return Ok(FileStatus::Skipped);
        }

        let extracted: ExtractedFile = FileManager::read_json(path)?;
        if extracted.segments.is_empty() {
            let translated = TranslatedFile {
                source_key: extracted.source_key,
                segments: Vec::new(),
                unresolved: Vec::new(),
                usage: TokenUsage::default(),
            };
            FileManager::write_json(&out_path, &translated)?;
            return Ok(FileStatus::Empty);
        }

        let result = pipeline
            .translator()
            .translate_all(&extracted.segments, &settings.target_language, &settings.model, context)
            .await;

        let segments: Vec<TranslatedSegment> = extracted
            .segments
            .iter()
            .filter_map(|s| {
                result.translations.get(&s.id).map(|text| TranslatedSegment {
                    id: s.id.clone(),
                    text: text.clone(),
                })
            })
            .collect();
        let unresolved: Vec<String> = extracted
            .segments
            .iter()
            .filter(|s| result.failures.contains_key(&s.id))
            .map(|s| s.id.clone())
            .collect();

        if unresolved.is_empty() {
            info!("Translated {} | segments={}", key, segments.len());
        } else {
            warn!(
                "Translated {} | segments={} unresolved={}",
                key,
                segments.len(),
                unresolved.len()
            );
        }

        let status = FileStatus::Translated {
            segments: segments.len(),
            unresolved: unresolved.len(),
            usage: result.usage,
        };
        let translated = TranslatedFile {
            source_key: extracted.source_key,
            segments,
            unresolved,
            usage: result.usage,
        };
        FileManager::write_json(&out_path, &translated)?;
        Ok(status)
    }

    /// Fill every container with its translations
    pub fn apply(&self, pipeline: &DocumentPipeline, progress: &ProgressBar) -> Result<RunSummary> {
        let containers_root = self.layout.containers();
        let files = container_files(&containers_root, "txt")?;
        let mut summary = RunSummary::default();
        progress.set_length(files.len() as u64);

        for path in &files {
            let source_key = FileManager::relative_key(&containers_root, path)?;
            let document = Document::new(source_key.clone(), FileManager::read_to_string(path)?);
            let outcome = self.apply_document(pipeline, document)?;
            if let DocumentOutcome::Translated { text, .. } = &outcome {
                FileManager::write_to_file(self.layout.applied().join(&source_key), text)?;
            }
            summary.record(&outcome);
            progress.inc(1);
        }

        Ok(summary)
    }

    fn apply_document(&self, pipeline: &DocumentPipeline, document: Document) -> Result<DocumentOutcome> {
        let prepared = match pipeline.prepare(&document) {
            Ok(prepared) => prepared,
            Err(error) => {
                error!("Failed to parse {}: {}", document.id, error);
                return Ok(DocumentOutcome::ParseFailed {
                    document_id: document.id,
                    error,
                });
            }
        };

        let extracted_path = self.stage_path(&self.layout.extracted(), &document.id, "json");
        let extracted: ExtractedFile = FileManager::read_json(&extracted_path)
            .with_context(|| format!("Missing extracted segments for {}", document.id))?;

        let translated_path = self.stage_path(&self.layout.translated(), &document.id, "json");
        let translated: TranslatedFile = FileManager::read_json(&translated_path)
            .with_context(|| format!("Missing translations for {}", document.id))?;

        let translations = current_translations(&prepared.segments, &extracted, translated.translations());
        let stale = translated.segments.len().saturating_sub(translations.len());
        if stale > 0 {
            warn!(
                "{} changed since extraction; {} translations no longer match their source",
                document.id, stale
            );
        }

        let (text, report) = pipeline.finish(prepared, &translations);
        Ok(DocumentOutcome::Translated {
            document_id: document.id,
            text,
            report,
            usage: translated.usage,
        })
    }

    /// Join each page's containers into `output/<page>.txt`
    pub fn merge(&self, progress: &ProgressBar) -> Result<StageReport> {
        let containers_root = self.layout.containers();
        let applied_root = self.layout.applied();
        let files = container_files(&containers_root, "txt")?;

        // page dir (relative) -> its containers
        let mut pages: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for path in files {
            let key = FileManager::relative_key(&containers_root, &path)?;
            let page = match key.rsplit_once('/') {
                Some((page, _)) => page.to_string(),
                None => String::new(),
            };
            pages.entry(page).or_default().push(path);
        }

        let mut report = StageReport::new("merge");
        progress.set_length(pages.len() as u64);

        for (page, mut containers) in pages {
            containers.sort_by_key(|p| container_number(p));

            let mut parts = Vec::with_capacity(containers.len());
            for source in &containers {
                let key = FileManager::relative_key(&containers_root, source)?;
                let applied = applied_root.join(&key);
                if FileManager::file_exists(&applied) {
                    parts.push(FileManager::read_to_string(&applied)?);
                } else {
                    warn!("No translated container for {}, keeping the source text", key);
                    report.failures.push((key, "not applied".to_string()));
                    parts.push(FileManager::read_to_string(source)?);
                }
            }

            let out_file = if page.is_empty() {
                self.layout.output().join("page.txt")
            } else {
                self.layout.output().join(format!("{}.txt", page))
            };
            FileManager::write_to_file(&out_file, &merge_containers(&parts))?;
            debug!("{} -> {:?}", page, out_file);

            report.files += 1;
            report.items += containers.len();
            progress.inc(1);
        }

        Ok(report)
    }

    /// `<root>/<source_key>` with its extension replaced
    fn stage_path(&self, root: &Path, source_key: &str, extension: &str) -> PathBuf {
        root.join(source_key).with_extension(extension)
    }
}

/// Keep the translations whose segment still has the source text they were made from
fn current_translations(
    segments: &[Segment],
    extracted: &ExtractedFile,
    mut translations: HashMap<String, String>,
) -> HashMap<String, String> {
    let sources: HashMap<&str, &str> = extracted
        .segments
        .iter()
        .map(|s| (s.id.as_str(), s.source_text.as_str()))
        .collect();
    segments
        .iter()
        .filter(|s| sources.get(s.id.as_str()) == Some(&s.source_text.as_str()))
        .filter_map(|s| translations.remove(&s.id).map(|text| (s.id.clone(), text)))
        .collect()
}

/// Page folder for a source page: its relative path without the extension
fn page_dir_for(source_key: &str) -> PathBuf {
    PathBuf::from(source_key).with_extension("")
}

fn container_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !FileManager::dir_exists(root) {
        return Err(AppError::JobIo(format!("Folder does not exist: {:?}", root)).into());
    }
    let files = FileManager::find_container_files(root, extension)?;
    if files.is_empty() {
        return Err(AppError::JobIo(format!("No container_*.{} files in: {:?}", extension, root)).into());
    }
    Ok(files)
}
