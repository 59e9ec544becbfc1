use anyhow::{anyhow, Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{Config, SpeechProvider, StoryProvider};
use crate::file_utils::FileManager;
use crate::markup::{validate_and_repair, RepairApplied};
use crate::narration::{narrate_prompt, narrate_with_encoding, Narration, NarrationSummary};
use crate::providers::anthropic::AnthropicGenerator;
use crate::providers::mock::{MockGenerator, MockSynthesizer};
use crate::providers::ollama::{Ollama, OllamaGenerator};
use crate::providers::polly::PollyClient;
use crate::providers::{Backends, RetryPolicy, SpeechSynthesizer, StoryGenerator};
use crate::story::{random_genre, Genre, PromptTemplate};
use crate::synthesis::AudioEncoding;
use crate::timing::{build_index, parse_events, Caption, SynchronizationIndex};

// @module: Application controller for story narration

/// Contents of the `<stem>.sync.json` file
#[derive(Debug, Serialize)]
struct SyncFile<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    genre: Option<Genre>,
    voice_id: &'a str,
    audio_file: String,
    audio_encoding: AudioEncoding,
    mime_type: &'static str,
    summary: NarrationSummary,
    index: &'a SynchronizationIndex,
    captions: Vec<Caption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_base64: Option<String>,
}

/// Files written for one narration
#[derive(Debug, Clone)]
pub struct NarrationOutput {
    pub stem: String,
    pub audio_path: PathBuf,
    pub ssml_path: PathBuf,
    pub sync_path: PathBuf,
    pub summary: NarrationSummary,
}

/// Result of checking a markup file without synthesizing it
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub repair_applied: RepairApplied,
    pub sentences: usize,
    pub words: usize,
    /// The validated markup, re-serialized
    pub ssml: String,
    /// Text as it will be spoken
    pub display_text: String,
}

/// Main application controller for story narration
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Story and speech backends
    backends: Backends,
}

impl Controller {
    /// Create a controller with mock backends and the default configuration
    pub fn new_for_test() -> Result<Self> {
        let mut config = Config::default();
        config.story.provider = StoryProvider::Mock;
        config.speech.provider = SpeechProvider::Mock;
        Self::with_config(config)
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let backends = Self::build_backends(&config)?;
        Ok(Self::with_backends(config, backends))
    }

    // @method: Create a controller around already constructed backends
    pub fn with_backends(config: Config, backends: Backends) -> Self {
        Self { config, backends }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the backends named by the configuration
    pub fn build_backends(config: &Config) -> Result<Backends> {
        let story = &config.story;
        let story_retry = RetryPolicy {
            max_retries: story.retry_count,
            backoff_base_ms: story.retry_backoff_ms,
        };

        let generator: Arc<dyn StoryGenerator> = match story.provider {
            StoryProvider::Ollama => {
                let client = Ollama::new(story.get_endpoint(), story.get_timeout_secs(), story_retry);
                Arc::new(OllamaGenerator::new(client, story.get_model()).with_generation(story.max_tokens, story.temperature))
            }
            StoryProvider::Anthropic => {
                let api_key = story.get_api_key();
                if api_key.is_empty() {
                    return Err(anyhow!("Anthropic API key is not configured"));
                }
                Arc::new(
                    AnthropicGenerator::new(api_key, story.get_endpoint(), story.get_model(), story.get_timeout_secs())
                        .with_generation(story.max_tokens, story.temperature),
                )
            }
            StoryProvider::Mock => Arc::new(MockGenerator::working()),
        };

        let speech = &config.speech;
        let synthesizer: Arc<dyn SpeechSynthesizer> = match speech.provider {
            SpeechProvider::Polly => Arc::new(
                PollyClient::new(&speech.endpoint, &speech.engine, speech.timeout_secs)
                    .with_api_key(&speech.api_key)
                    .with_retry(RetryPolicy {
                        max_retries: speech.retry_count,
                        backoff_base_ms: speech.retry_backoff_ms,
                    }),
            ),
            SpeechProvider::Mock => Arc::new(MockSynthesizer::working()),
        };

        debug!("Using story backend {} and speech backend {}", generator.name(), synthesizer.name());
        Ok(Backends::new(generator, synthesizer))
    }

    fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .or_else(|_| ProgressStyle::default_spinner().template("{spinner} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    fn resolve_voice<'a>(&'a self, voice: Option<&'a str>) -> &'a str {
        voice
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(self.config.speech.default_voice.as_str())
    }

    fn resolve_output_dir(&self, output_dir: Option<&Path>) -> PathBuf {
        output_dir.map_or_else(|| PathBuf::from(&self.config.output.directory), Path::to_path_buf)
    }

    /// Generate a story, narrate it and write the results
    pub async fn run_story(&self, genre: Option<Genre>, voice: Option<&str>, output_dir: Option<&Path>) -> Result<NarrationOutput> {
        let start_time = Instant::now();
        let genre = genre.unwrap_or_else(random_genre);
        let voice = self.resolve_voice(voice);
        let prompt = PromptTemplate::new(&self.config.story.system_prompt).render(genre);

        let spinner = Self::spinner(&format!("Writing and narrating a {}...", genre.story_phrase()));
        let result = narrate_prompt(&self.backends, &prompt, voice, self.config.speech.audio_encoding).await;
        spinner.finish_and_clear();

        let story = result.map_err(|e| {
            error!("Story narration failed: {}", e);
            e
        })?;

        let output_dir = self.resolve_output_dir(output_dir);
        let output = self.write_narration(&story.narration, Some(story.genre), voice, &output_dir)?;
        info!(
            "Narrated {} in {}: {:?}",
            genre.story_phrase(),
            Self::format_duration(start_time.elapsed()),
            output.audio_path
        );
        Ok(output)
    }

    /// Narrate a markup file and write the results
    pub async fn run_narrate(&self, input_file: &Path, voice: Option<&str>, output_dir: Option<&Path>) -> Result<NarrationOutput> {
        let start_time = Instant::now();
        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        let raw = FileManager::read_to_string(input_file)?;
        let voice = self.resolve_voice(voice);

        let spinner = Self::spinner(&format!("Narrating {:?} with {}...", input_file, voice));
        let result = narrate_with_encoding(&self.backends, &raw, voice, self.config.speech.audio_encoding).await;
        spinner.finish_and_clear();

        let narration = result.with_context(|| format!("Failed to narrate {:?}", input_file))?;
        let output_dir = self.resolve_output_dir(output_dir);
        let output = self.write_narration(&narration, None, voice, &output_dir)?;
        info!("Narration completed in {}.", Self::format_duration(start_time.elapsed()));
        Ok(output)
    }

    /// Validate and repair a markup file without calling any backend
    pub fn check(&self, input_file: &Path) -> Result<CheckReport> {
        let raw = FileManager::read_to_string(input_file)?;
        let document = validate_and_repair(&raw).with_context(|| format!("Invalid markup in {:?}", input_file))?;
        let segmentation = document.segment();

        if document.repair_applied() != RepairApplied::None {
            warn!("{:?} needed a repair: {}", input_file, document.repair_applied());
        }

        Ok(CheckReport {
            repair_applied: document.repair_applied(),
            sentences: segmentation.sentence_count(),
            words: segmentation.word_count(),
            ssml: document.to_ssml(),
            display_text: document.display_text(),
        })
    }

    /// Build a synchronization index from a markup file and a recorded speech-mark stream
    pub fn marks(&self, markup_file: &Path, marks_file: &Path) -> Result<SynchronizationIndex> {
        let raw = FileManager::read_to_string(markup_file)?;
        let document = validate_and_repair(&raw).with_context(|| format!("Invalid markup in {:?}", markup_file))?;
        let stream = std::fs::read(marks_file).with_context(|| format!("Failed to read file: {:?}", marks_file))?;

        let events = parse_events(&stream).with_context(|| format!("Invalid speech marks in {:?}", marks_file))?;
        let index = build_index(&events, &document)
            .with_context(|| format!("Speech marks in {:?} do not match {:?}", marks_file, markup_file))?;
        debug!("Indexed {} events from {:?}", events.len(), marks_file);
        Ok(index)
    }

    /// Write audio, markup and synchronization files for a narration
    fn write_narration(&self, narration: &Narration, genre: Option<Genre>, voice: &str, output_dir: &Path) -> Result<NarrationOutput> {
        FileManager::ensure_dir(output_dir)?;

        let stem = FileManager::output_stem(&self.config.output.file_prefix);
        let encoding = narration.audio_encoding;
        let audio_path = FileManager::generate_output_path(output_dir, &stem, encoding.extension());
        let ssml_path = FileManager::generate_output_path(output_dir, &stem, "ssml");
        let sync_path = FileManager::generate_output_path(output_dir, &stem, "sync.json");

        FileManager::write_bytes(&audio_path, &narration.audio)?;
        FileManager::write_to_file(&ssml_path, narration.document.ssml())?;

        let summary = narration.summary();
        let audio_file = audio_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let sync = SyncFile {
            genre,
            voice_id: voice,
            audio_file,
            audio_encoding: encoding,
            mime_type: encoding.mime_type(),
            summary: summary.clone(),
            index: &narration.index,
            captions: narration.index.captions(),
            audio_base64: self
                .config
                .output
                .embed_audio_base64
                .then(|| BASE64.encode(&narration.audio)),
        };
        let sync_json = serde_json::to_string_pretty(&sync).context("Failed to serialize synchronization index")?;
        FileManager::write_to_file(&sync_path, &sync_json)?;

        Ok(NarrationOutput {
            stem,
            audio_path,
            ssml_path,
            sync_path,
            summary,
        })
    }

    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
