// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, warn};
use std::fs::File;
use std::io::BufReader;
use std::io::Write;
use std::path::{Path, PathBuf};

use fusion_translator::app_config::{self, Config, TranslationProvider};
use fusion_translator::app_controller::Controller;
use fusion_translator::errors::AppError;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Options shared by every stage
#[derive(Args, Debug, Clone)]
struct JobArgs {
    /// Job folder name under the jobs directory (default: <language>_<timestamp>)
    #[arg(long)]
    job_name: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: String,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// Options for stages that call the translation provider
#[derive(Args, Debug, Clone, Default)]
struct TranslateArgs {
    /// Target language, as a name or ISO code (e.g. 'German', 'de')
    #[arg(short, long)]
    lang: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Provider calls and files in flight at the same time
    #[arg(short, long)]
    workers: Option<usize>,

    /// Segments per provider call
    #[arg(short, long)]
    batch: Option<usize>,

    /// Translate again even if the output exists
    #[arg(long)]
    overwrite: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every stage: export, extract, translate, apply, merge
    Run {
        /// Source folder with exported page .txt files
        #[arg(long, default_value = "products")]
        src: PathBuf,

        #[command(flatten)]
        job: JobArgs,

        #[command(flatten)]
        translate: TranslateArgs,
    },

    /// Cut source pages into container files
    Export {
        /// Source folder with exported page .txt files
        #[arg(long, default_value = "products")]
        src: PathBuf,

        #[command(flatten)]
        job: JobArgs,
    },

    /// Extract translatable segments from the containers
    Extract {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Translate extracted segments
    Translate {
        #[command(flatten)]
        job: JobArgs,

        #[command(flatten)]
        translate: TranslateArgs,
    },

    /// Write translated containers
    Apply {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Merge translated containers back into pages
    Merge {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Generate shell completions for fusion-translator
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// fusion-translator - Fusion Builder page translation with AI
///
/// Translates exported WordPress / Fusion Builder pages while keeping every
/// shortcode, attribute and HTML tag exactly as it was.
#[derive(Parser, Debug)]
#[command(name = "fusion-translator")]
#[command(version)]
#[command(about = "AI-powered Fusion Builder page translation")]
#[command(long_about = "fusion-translator cuts exported Fusion Builder pages into containers, extracts the \
human-readable text, translates it with an AI provider and reassembles the pages byte for byte.

EXAMPLES:
    fusion-translator run --src products --lang German          # All stages into a new job
    fusion-translator run --lang de -p anthropic --workers 4    # Another provider, fewer calls
    fusion-translator translate --job-name german_run --overwrite
    fusion-translator apply --job-name german_run               # Re-apply after editing translations
    fusion-translator completions bash > fusion-translator.bash

JOB LAYOUT:
    jobs/<job-name>/containers  extracted  translated  applied  output

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created. API keys may also come from OPENAI_API_KEY or
    ANTHROPIC_API_KEY.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    // Trace is the ceiling; the effective level is set with log::set_max_level
    if let Err(e) = CustomLogger::init(LevelFilter::Trace) {
        eprintln!("Failed to initialize logger: {}", e);
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Err(e) = run_command(cli.command).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "fusion-translator", &mut std::io::stdout());
            Ok(())
        }
        Commands::Run { src, job, translate } => {
            let config = load_config(&job, Some(&translate))?;
            config.validate_for_translation().context("Configuration validation failed")?;

            let controller = Controller::with_config(config)?;
            let job = controller.job(job.job_name.as_deref());
            let summary = controller.run(&job, &src).await?;
            if summary.has_failures() {
                warn!("Some documents were not fully translated, see {}", job.layout().log_file().display());
            }
            Ok(())
        }
        Commands::Export { src, job } => {
            let config = load_config(&job, None)?;
            config.validate().context("Configuration validation failed")?;

            let controller = Controller::with_config(config)?;
            let job = controller.job(job.job_name.as_deref());
            job.layout().create_dirs()?;
            controller.export(&job, &src)?;
            Ok(())
        }
        Commands::Extract { job } => {
            let (controller, job) = existing_job(&job, None, false)?;
            controller.extract(&job)?;
            Ok(())
        }
        Commands::Translate { job, translate } => {
            let (controller, job) = existing_job(&job, Some(&translate), true)?;
            controller.translate(&job).await?;
            Ok(())
        }
        Commands::Apply { job } => {
            let (controller, job) = existing_job(&job, None, false)?;
            controller.apply(&job)?;
            Ok(())
        }
        Commands::Merge { job } => {
            let (controller, job) = existing_job(&job, None, false)?;
            controller.merge(&job)?;
            Ok(())
        }
    }
}

/// Controller and job for a stage that works on an existing job folder
fn existing_job(
    args: &JobArgs,
    translate: Option<&TranslateArgs>,
    needs_provider: bool,
) -> Result<(Controller, fusion_translator::Job)> {
    let job_name = args
        .job_name
        .as_deref()
        .ok_or_else(|| AppError::Config("--job-name is required for this stage".to_string()))?;

    let config = load_config(args, translate)?;
    let validation = if needs_provider {
        config.validate_for_translation()
    } else {
        config.validate()
    };
    validation.context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    let job = controller.job(Some(job_name));
    if !job.layout().root().is_dir() {
        return Err(AppError::JobIo(format!("Job folder does not exist: {}", job.layout().root().display())).into());
    }
    Ok((controller, job))
}

/// Load or create the configuration file, then apply command line overrides
fn load_config(args: &JobArgs, translate: Option<&TranslateArgs>) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(level) = &args.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = &args.config;
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader::<_, Config>(reader).context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    if let Some(translate) = translate {
        apply_overrides(&mut config, translate);
    }

    match &args.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    Ok(config)
}

/// Command line flags take precedence over the configuration file
fn apply_overrides(config: &mut Config, args: &TranslateArgs) {
    if let Some(provider) = &args.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &args.model {
        config.translation.set_model(model.clone());
    }
    if let Some(lang) = &args.lang {
        config.target_language = lang.clone();
    }
    if let Some(workers) = args.workers {
        config.translation.set_concurrent_requests(workers);
        config.job.document_concurrency = workers;
    }
    if let Some(batch) = args.batch {
        config.translation.common.batch_size = batch;
    }
    if args.overwrite {
        config.job.overwrite = true;
    }
}
