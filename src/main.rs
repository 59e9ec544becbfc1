// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use narrasync::app_config::{self, Config, StoryProvider};
use narrasync::app_controller::Controller;
use narrasync::story::Genre;

/// CLI Wrapper for StoryProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliStoryProvider {
    Ollama,
    Anthropic,
    Mock,
}

impl From<CliStoryProvider> for StoryProvider {
    fn from(cli_provider: CliStoryProvider) -> Self {
        match cli_provider {
            CliStoryProvider::Ollama => StoryProvider::Ollama,
            CliStoryProvider::Anthropic => StoryProvider::Anthropic,
            CliStoryProvider::Mock => StoryProvider::Mock,
        }
    }
}

/// CLI Wrapper for Genre to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliGenre {
    Bedtime,
    Horror,
    Fantasy,
    Comedy,
}

impl From<CliGenre> for Genre {
    fn from(cli_genre: CliGenre) -> Self {
        match cli_genre {
            CliGenre::Bedtime => Genre::BedtimeStory,
            CliGenre::Horror => Genre::Horror,
            CliGenre::Fantasy => Genre::Fantasy,
            CliGenre::Comedy => Genre::Comedy,
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

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a story and narrate it
    Story {
        /// Story genre (random when omitted)
        #[arg(short, long, value_enum)]
        genre: Option<CliGenre>,

        /// Story provider to use
        #[arg(short, long, value_enum)]
        provider: Option<CliStoryProvider>,

        /// Model name to use for story generation
        #[arg(short, long, env = "NARRASYNC_MODEL")]
        model: Option<String>,
    },

    /// Narrate an existing SSML file
    Narrate {
        /// SSML (or plain text) file to narrate
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,
    },

    /// Validate and repair an SSML file without synthesizing it
    Check {
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Print the repaired markup
        #[arg(long)]
        print: bool,
    },

    /// Build a synchronization index from an SSML file and a recorded speech-mark stream
    Marks {
        #[arg(value_name = "SSML_FILE")]
        markup_file: PathBuf,

        #[arg(value_name = "MARKS_FILE")]
        marks_file: PathBuf,
    },

    /// Generate shell completions for narrasync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// NarraSync - narrated stories with word-level synchronization
#[derive(Parser, Debug)]
#[command(name = "narrasync")]
#[command(version)]
#[command(about = "Narrated SSML stories with a playback synchronization index")]
#[command(long_about = "NarraSync generates SSML stories, narrates them through a speech synthesis backend and
writes the audio together with a word and sentence level synchronization index.

EXAMPLES:
    narrasync story                              # Random genre, default voice
    narrasync story -g horror -p anthropic       # Horror story from Anthropic
    narrasync --voice Matthew narrate tale.ssml  # Narrate an existing document
    narrasync check tale.ssml --print            # Validate and show the repaired markup
    narrasync marks tale.ssml tale.marks         # Index a recorded speech-mark stream
    narrasync completions bash > narrasync.bash  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Voice used for narration
    #[arg(long, global = true, env = "NARRASYNC_VOICE")]
    voice: Option<String>,

    /// Output directory for audio and index files
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,
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
        log::set_boxed_logger(Box::new(CustomLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌", "1;31"),
            Level::Warn => ("🚧", "1;33"),
            Level::Info => ("🔊", "1;32"),
            Level::Debug => ("🔍", "1;36"),
            Level::Trace => ("📋", "1;35"),
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
            let (emoji, color) = Self::decoration(record.level());
            let _ = writeln!(std::io::stderr(), "\x1B[{}m{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set via log::set_max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "narrasync", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(cmd_log_level) = &cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let (mut config, created) = Config::load_or_create(&cli.config_path)
        .with_context(|| format!("Failed to load config file: {}", cli.config_path))?;
    if created {
        warn!("Config file not found at '{}', created a default config.", cli.config_path);
    }

    // Override config with CLI options if provided
    if let Commands::Story { provider, model, .. } = &cli.command {
        if let Some(provider) = provider {
            config.story.provider = provider.clone().into();
        }
        if let Some(model) = model {
            config.story.active_provider_config_mut().model = model.clone();
        }
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let voice = cli.voice.as_deref();
    let output_dir = cli.output_dir.as_deref();

    match cli.command {
        Commands::Story { genre, .. } => {
            let controller = Controller::with_config(config)?;
            let output = controller.run_story(genre.map(Genre::from), voice, output_dir).await?;
            info!("Audio: {:?}", output.audio_path);
            info!("Index: {:?}", output.sync_path);
        }
        Commands::Narrate { input_file } => {
            let controller = Controller::with_config(config)?;
            let output = controller.run_narrate(&input_file, voice, output_dir).await?;
            info!("Audio: {:?}", output.audio_path);
            info!("Index: {:?}", output.sync_path);
        }
        Commands::Check { input_file, print } => {
            let controller = Controller::with_config(config)?;
            let report = controller.check(&input_file)?;
            info!(
                "{:?}: {} sentences, {} words, repair: {}",
                input_file, report.sentences, report.words, report.repair_applied
            );
            if print {
                println!("{}", report.ssml);
            }
        }
        Commands::Marks { markup_file, marks_file } => {
            let controller = Controller::with_config(config)?;
            let index = controller.marks(&markup_file, &marks_file)?;
            let captions = serde_json::json!({
                "index": &index,
                "captions": index.captions(),
            });
            println!("{}", serde_json::to_string_pretty(&captions).context("Failed to serialize index")?);
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
