use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::story::PromptTemplate;
use crate::synthesis::AudioEncoding;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Story generation config
    #[serde(default)]
    pub story: StoryConfig,

    /// Speech synthesis config
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Where and how results are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Story generation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoryProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: Anthropic
    Anthropic,
    // @provider: Canned stories, no network
    Mock,
}

impl StoryProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::Anthropic => "Anthropic",
            Self::Mock => "Mock",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }
}

impl std::fmt::Display for StoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for StoryProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "anthropic" => Ok(Self::Anthropic),
            "mock" => Ok(Self::Mock),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Speech synthesis provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    // @provider: Polly compatible SynthesizeSpeech endpoint
    #[default]
    Polly,
    // @provider: Fabricated audio and speech marks, no network
    Mock,
}

impl std::fmt::Display for SpeechProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Polly => write!(f, "polly"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: StoryProvider) -> Self {
        match provider_type {
            StoryProvider::Ollama => Self {
                provider_type: "ollama".to_string(),
                model: default_ollama_model(),
                api_key: String::new(),
                endpoint: default_ollama_endpoint(),
                timeout_secs: default_timeout_secs(),
            },
            StoryProvider::Anthropic => Self {
                provider_type: "anthropic".to_string(),
                model: default_anthropic_model(),
                api_key: String::new(),
                endpoint: default_anthropic_endpoint(),
                timeout_secs: default_timeout_secs(),
            },
            StoryProvider::Mock => Self {
                provider_type: "mock".to_string(),
                model: "mock".to_string(),
                api_key: String::new(),
                endpoint: String::new(),
                timeout_secs: default_timeout_secs(),
            },
        }
    }
}

/// Story generation configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoryConfig {
    /// Story provider to use
    #[serde(default)]
    pub provider: StoryProvider,

    /// Available story providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Maximum number of tokens per story
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Storyteller instructions sent as the system prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Speech synthesis configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    /// Speech provider to use
    #[serde(default)]
    pub provider: SpeechProvider,

    /// `SynthesizeSpeech` endpoint (usually a signing gateway)
    #[serde(default = "default_speech_endpoint")]
    pub endpoint: String,

    /// Bearer token for the endpoint, if it needs one
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Synthesis engine (`standard`, `neural`, ...)
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Voice used when none is given on the command line
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// Encoding of the narrated audio
    #[serde(default)]
    pub audio_encoding: AudioEncoding,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            provider: SpeechProvider::default(),
            endpoint: default_speech_endpoint(),
            api_key: String::new(),
            engine: default_engine(),
            default_voice: default_voice(),
            audio_encoding: AudioEncoding::default(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Output file configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Directory for audio, markup and index files
    #[serde(default = "default_output_directory")]
    pub directory: String,

    /// Embed the audio as base64 in the `.sync.json` file
    #[serde(default)]
    pub embed_audio_base64: bool,

    /// Prefix of generated file names
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            embed_audio_base64: false,
            file_prefix: default_file_prefix(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.8
}

fn default_retry_count() -> u32 {
    3 // Default to 3 retries
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_system_prompt() -> String {
    PromptTemplate::STORYTELLER.to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-7-sonnet-latest".to_string()
}

fn default_speech_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_engine() -> String {
    "neural".to_string()
}

fn default_voice() -> String {
    "Joanna".to_string()
}

fn default_output_directory() -> String {
    "static/audio".to_string()
}

fn default_file_prefix() -> String {
    "story".to_string()
}

fn validate_url(what: &str, value: &str) -> Result<()> {
    Url::parse(value).with_context(|| format!("Invalid {} URL: {}", what, value))?;
    Ok(())
}

impl Config {
    /// Load the configuration file, creating it with defaults when missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok((config, false));
        }

        let config = Config::default();
        config.save(path)?;
        Ok((config, true))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path.as_ref(), config_json)
            .with_context(|| format!("Failed to write config to file: {:?}", path.as_ref()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        match self.story.provider {
            StoryProvider::Anthropic => {
                if self.story.get_api_key().is_empty() {
                    return Err(anyhow!("Story API key is required for Anthropic provider"));
                }
                validate_url("Anthropic endpoint", &self.story.get_endpoint())?;
            }
            StoryProvider::Ollama => validate_url("Ollama endpoint", &self.story.get_endpoint())?,
            StoryProvider::Mock => {}
        }

        if !(0.0..=1.0).contains(&self.story.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 1.0, got {}", self.story.temperature));
        }
        if self.story.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be greater than zero"));
        }

        if self.speech.default_voice.trim().is_empty() {
            return Err(anyhow!("A default voice is required"));
        }
        if self.speech.provider == SpeechProvider::Polly {
            validate_url("speech endpoint", &self.speech.endpoint)?;
        }

        if self.output.directory.trim().is_empty() {
            return Err(anyhow!("Output directory must not be empty"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            story: StoryConfig::default(),
            speech: SpeechConfig::default(),
            output: OutputConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl StoryConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers.iter().find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider configuration, added if missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let position = self.available_providers.iter().position(|p| p.provider_type == provider_str);
        let index = match position {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        // Default fallback based on provider type
        match self.provider {
            StoryProvider::Ollama => default_ollama_model(),
            StoryProvider::Anthropic => default_anthropic_model(),
            StoryProvider::Mock => "mock".to_string(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        // Default fallback - Ollama doesn't use API keys
        String::new()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        // Default fallback based on provider type
        match self.provider {
            StoryProvider::Ollama => default_ollama_endpoint(),
            StoryProvider::Anthropic => default_anthropic_endpoint(),
            StoryProvider::Mock => String::new(),
        }
    }

    /// Get the timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map_or_else(default_timeout_secs, |p| p.timeout_secs)
    }
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            provider: StoryProvider::default(),
            // Add default providers
            available_providers: vec![
                ProviderConfig::new(StoryProvider::Ollama),
                ProviderConfig::new(StoryProvider::Anthropic),
            ],
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}
