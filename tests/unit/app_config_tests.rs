/*!
 * Tests for application configuration functionality
 */

use narrasync::app_config::{Config, LogLevel, SpeechProvider, StoryProvider};
use narrasync::synthesis::AudioEncoding;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.story.provider, StoryProvider::Ollama);
    assert_eq!(config.story.max_tokens, 2048);
    assert_eq!(config.story.get_endpoint(), "http://localhost:11434");
    assert_eq!(config.speech.provider, SpeechProvider::Polly);
    assert_eq!(config.speech.engine, "neural");
    assert_eq!(config.speech.default_voice, "Joanna");
    assert_eq!(config.speech.audio_encoding, AudioEncoding::Mp3);
    assert_eq!(config.output.directory, "static/audio");
    assert!(!config.output.embed_audio_base64);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test that a missing config file is created with defaults and then loaded back
#[test]
fn test_loadOrCreate_withMissingFile_shouldCreateThenLoad() -> anyhow::Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let (created, was_created) = Config::load_or_create(&path)?;
    assert!(was_created);
    assert!(path.exists());

    let (loaded, was_created) = Config::load_or_create(&path)?;
    assert!(!was_created);
    assert_eq!(loaded.speech.default_voice, created.speech.default_voice);
    assert_eq!(loaded.story.available_providers.len(), 2);
    Ok(())
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() -> anyhow::Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.speech.default_voice = " ".to_string();
    assert!(config.validate().is_err());
    config.speech.default_voice = "Joanna".to_string();

    config.story.temperature = 1.5;
    assert!(config.validate().is_err());
    config.story.temperature = 0.8;

    config.story.provider = StoryProvider::Anthropic;
    assert!(config.validate().is_err());
    config.story.active_provider_config_mut().api_key = "test-key".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_storyProvider_fromStr_shouldBeCaseInsensitive() {
    assert_eq!("Anthropic".parse::<StoryProvider>().unwrap(), StoryProvider::Anthropic);
    assert_eq!(StoryProvider::Ollama.display_name(), "Ollama");
    assert!("openai".parse::<StoryProvider>().is_err());
}
