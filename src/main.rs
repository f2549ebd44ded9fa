use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info};
use std::io::Write;
use std::path::{Path, PathBuf};

use doc_mt::app_config::{Config, LogLevel};
use doc_mt::app_controller::Controller;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a document content payload
    Translate(TranslateArgs),

    /// Show stored documents and backend usage
    Stats(StatsArgs),

    /// Generate shell completions for doc-mt
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// JSON file with `contents`, `url` and `locale`
    #[arg(value_name = "PAYLOAD")]
    input_path: PathBuf,

    /// Target locale (e.g., 'de', 'zh-CN')
    #[arg(short, long)]
    target_lang: String,

    /// Backend to use instead of the configured default (dev, google, deepl, ms)
    #[arg(short, long)]
    backend: Option<String>,

    /// Write the translated payload here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct StatsArgs {
    /// Only list documents stored for this url
    #[arg(short, long)]
    url: Option<String>,

    #[command(flatten)]
    common: CommonArgs,
}

/// doc-mt - machine translation of document content
///
/// Translates the text, HTML and XML content of web documents through
/// machine translation backends and keeps every translation for reuse.
#[derive(Parser, Debug)]
#[command(name = "doc-mt")]
#[command(version)]
#[command(about = "Machine translation of document content")]
#[command(long_about = "doc-mt translates document content payloads and reuses stored translations.

EXAMPLES:
    doc-mt translate page.json -t de                 # Translate with the default backend
    doc-mt translate page.json -t fr -b deepl -o out.json
    doc-mt stats --url https://example.com/page      # Show stored documents for a url
    doc-mt completions bash > doc-mt.bash            # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED BACKENDS:
    dev    - Pseudo-translation for development (default)
    google - Google Translate (requires API key)
    deepl  - DeepL (requires API key)
    ms     - Microsoft Translator (requires API key)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // The level filter here is the ceiling; set_max_level narrows it later
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and marker for a log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
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
            let (color, marker) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                marker,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "doc-mt", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
        Commands::Stats(args) => run_stats(args).await,
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let config = load_config(&options.common)?;
    let controller = Controller::with_config(config)?;

    let translated = controller
        .translate_file(
            &options.input_path,
            &options.target_lang,
            options.backend.as_deref(),
            options.output.as_deref(),
        )
        .await?;

    if options.output.is_none() {
        let json = serde_json::to_string_pretty(&translated)
            .context("Failed to serialize translated payload")?;
        println!("{}", json);
    }
    Ok(())
}

async fn run_stats(options: StatsArgs) -> Result<()> {
    let config = load_config(&options.common)?;
    let controller = Controller::with_config(config)?;

    let report = controller.stats_report(options.url.as_deref()).await?;
    print!("{}", report);
    Ok(())
}

/// Load the configuration, writing a default one when the file is missing
fn load_config(options: &CommonArgs) -> Result<Config> {
    if let Some(level) = &options.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    let config_path = Path::new(&options.config);
    let config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        info!("Config file not found, creating default: {}", options.config);
        let config = Config::default();
        config
            .save(config_path)
            .with_context(|| format!("Failed to write default config: {}", options.config))?;
        config
    };

    config.validate().context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }
    Ok(config)
}
