use anyhow::{Context, Result, anyhow};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::containers::ContainerSplitter;
use crate::file_utils::FileManager;
use crate::job::{Job, JobLayout, StageReport, TranslateSettings, default_job_name};
use crate::language_utils;
use crate::pipeline::{DocumentPipeline, RunSummary};
use crate::providers::Translator;
use crate::translation::{JobContext, TranslationService};

// @module: Application controller driving the job stages

/// Main application controller for page translation jobs
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Translator override; the configured provider is used when unset
    translator: Option<Arc<dyn Translator>>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            translator: None,
        })
    }

    /// Controller that sends every batch to `translator` instead of the configured provider
    pub fn with_translator(config: Config, translator: Arc<dyn Translator>) -> Self {
        Self {
            config,
            translator: Some(translator),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Job for `job_name`, or a fresh `<language>_<timestamp>` job
    pub fn job(&self, job_name: Option<&str>) -> Job {
        let name = match job_name {
            Some(name) => name.to_string(),
            None => default_job_name(&self.config.target_language, Local::now()),
        };
        Job::new(JobLayout::new(&self.config.job.jobs_dir, &name))
    }

    /// Run every stage, from page export to merged output
    pub async fn run(&self, job: &Job, src_dir: &Path) -> Result<RunSummary> {
        let start_time = Instant::now();
        job.layout().create_dirs()?;
        info!("📁 Job directory: {}", job.layout().root().display());

        let report = self.export(job, src_dir)?;
        info!("✔ Container export completed ({} containers)", report.items);

        let report = self.extract(job)?;
        info!("✔ Segment extraction completed ({} segments)", report.items);

        let translate_report = self.translate(job).await?;
        info!("✔ Translation completed ({} segments)", translate_report.items);

        let mut summary = self.apply(job)?;
        summary.usage = translate_report.usage;
        info!("✔ Translated containers generated");

        self.merge(job)?;
        info!("✔ Pages merged into {}", job.layout().output().display());

        let message = format!("Run completed in {}: {}", Self::format_duration(start_time.elapsed()), summary);
        info!("{}", message);
        self.append_run_log(job, &message);

        Ok(summary)
    }

    pub fn export(&self, job: &Job, src_dir: &Path) -> Result<StageReport> {
        let splitter = ContainerSplitter::new(&self.config.job.container_pattern)
            .map_err(|e| anyhow!("Invalid container pattern: {}", e))?;

        let progress = Self::stage_progress("pages");
        let report = job.export(src_dir, &splitter, &progress);
        progress.finish_and_clear();
        self.finish_stage(job, report)
    }

    pub fn extract(&self, job: &Job) -> Result<StageReport> {
        let pipeline = self.pipeline()?;

        let progress = Self::stage_progress("containers");
        let report = job.extract(&pipeline, &progress);
        progress.finish_and_clear();
        self.finish_stage(job, report)
    }

    pub async fn translate(&self, job: &Job) -> Result<StageReport> {
        let translator = self.translator().await?;
        let pipeline = DocumentPipeline::from_config(&self.config, translator)?;

        let model = self.config.translation.get_model();
        let settings = TranslateSettings {
            target_language: language_utils::resolve_target_language(&self.config.target_language)?,
            model: model.clone(),
            overwrite: self.config.job.overwrite,
            document_concurrency: self.config.job.document_concurrency,
        };
        let context = JobContext::with_provider_info(
            self.config.translation.optimal_concurrent_requests(),
            self.config.translation.provider.display_name(),
            &model,
        );

        info!(
            "🚀 {} - {} → {}",
            self.config.translation.provider.display_name(),
            model,
            settings.target_language
        );

        let progress = Self::stage_progress("files");
        progress.set_message("Translating");
        let report = job.translate(&pipeline, &settings, &context, &progress).await;
        progress.finish_and_clear();

        let usage = context.usage();
        if usage.total_tokens > 0 {
            info!("🔢 {}", usage.summary());
        }
        let counters = context.counters();
        debug!(
            "Provider calls: {} (retries: {}, failed segments: {})",
            counters.calls, counters.retries, counters.failed_segments
        );

        self.finish_stage(job, report)
    }

    pub fn apply(&self, job: &Job) -> Result<RunSummary> {
        let pipeline = self.pipeline()?;

        let progress = Self::stage_progress("containers");
        let summary = job.apply(&pipeline, &progress);
        progress.finish_and_clear();

        let summary = summary?;
        summary.log();
        self.append_run_log(job, &format!("apply: {}", summary));
        Ok(summary)
    }

    pub fn merge(&self, job: &Job) -> Result<StageReport> {
        let progress = Self::stage_progress("pages");
        let report = job.merge(&progress);
        progress.finish_and_clear();
        self.finish_stage(job, report)
    }

    /// Log a stage report and record it in the job's run log
    fn finish_stage(&self, job: &Job, report: Result<StageReport>) -> Result<StageReport> {
        let report = report?;
        info!("{}", report);
        for (key, reason) in &report.failures {
            warn!("  {}: {}", key, reason);
        }
        self.append_run_log(job, &report.to_string());
        Ok(report)
    }

    fn append_run_log(&self, job: &Job, message: &str) {
        if let Err(e) = FileManager::append_to_log_file(job.layout().log_file(), message) {
            warn!("Failed to write run log: {}", e);
        }
    }

    /// Pipeline for the stages that only parse and apply
    fn pipeline(&self) -> Result<DocumentPipeline> {
        let translator: Arc<dyn Translator> = match &self.translator {
            Some(translator) => Arc::clone(translator),
            None => Arc::new(
                TranslationService::new(self.config.translation.clone())
                    .context("Failed to create translation service")?,
            ),
        };
        DocumentPipeline::from_config(&self.config, translator)
    }

    /// Translator for the translate stage, checking the provider is reachable
    async fn translator(&self) -> Result<Arc<dyn Translator>> {
        if let Some(translator) = &self.translator {
            return Ok(Arc::clone(translator));
        }

        let service = TranslationService::new(self.config.translation.clone())
            .context("Failed to create translation service")?;
        if let Err(e) = service.test_connection().await {
            warn!(
                "{} connection test failed: {}",
                self.config.translation.provider.display_name(),
                e
            );
        }
        Ok(Arc::new(service))
    }

    fn stage_progress(unit: &str) -> ProgressBar {
        let progress = ProgressBar::new(0);
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
            unit
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style.progress_chars("█▓▒░"));
        progress
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
