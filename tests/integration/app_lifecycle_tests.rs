/*!
 * Integration tests for application lifecycle
 */

use anyhow::Result;
use std::sync::Arc;

use narrasync::app_config::{Config, SpeechProvider, StoryProvider};
use narrasync::app_controller::Controller;
use narrasync::providers::mock::{MockGenerator, MockSynthesizer};
use narrasync::{Backends, Genre, RepairApplied};

use crate::common;

fn mock_config(output_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.story.provider = StoryProvider::Mock;
    config.speech.provider = SpeechProvider::Mock;
    config.output.directory = output_dir.to_string_lossy().to_string();
    config
}

/// Test the controller initialization with default config
#[test]
fn test_controller_initialization_withDefaultConfig_shouldSucceed() -> Result<()> {
    let controller = Controller::new_for_test()?;
    assert_eq!(controller.config().speech.default_voice, "Joanna");
    Ok(())
}

/// Test the full story run writes audio, markup and index files
#[test]
fn test_runStory_withMockBackends_shouldWriteAllOutputs() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let mut config = mock_config(temp_dir.path());
    config.output.embed_audio_base64 = true;
    let controller = Controller::with_config(config)?;

    let output = tokio_test::block_on(controller.run_story(Some(Genre::Fantasy), Some("Matthew"), None))?;

    assert!(output.stem.starts_with("story_"));
    assert_eq!(output.audio_path.extension().and_then(|e| e.to_str()), Some("mp3"));
    assert!(output.audio_path.exists());
    assert!(std::fs::read_to_string(&output.ssml_path)?.starts_with("<speak>"));

    let sync: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output.sync_path)?)?;
    assert_eq!(sync["genre"], "fantasy");
    assert_eq!(sync["voice_id"], "Matthew");
    assert_eq!(sync["mime_type"], "audio/mpeg");
    assert_eq!(sync["captions"].as_array().map(Vec::len), Some(3));
    assert_eq!(sync["summary"]["words"], output.summary.words);
    assert!(sync["audio_base64"].as_str().is_some_and(|b| !b.is_empty()));
    Ok(())
}

/// Test narrating an input file into an explicit output directory
#[tokio::test]
async fn test_runNarrate_withTruncatedFile_shouldRepairAndWrite() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "tale.ssml", common::TRUNCATED_STORY)?;
    let out_dir = temp_dir.path().join("out");
    let controller = Controller::with_config(mock_config(temp_dir.path()))?;

    let output = controller.run_narrate(&input, None, Some(out_dir.as_path())).await?;

    assert!(output.sync_path.starts_with(&out_dir));
    assert_eq!(output.summary.repair_applied, RepairApplied::AppendedClosingTag);
    let sync: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output.sync_path)?)?;
    assert!(sync.get("audio_base64").is_none());
    assert!(sync.get("genre").is_none());
    Ok(())
}

#[tokio::test]
async fn test_runNarrate_withMissingFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(mock_config(temp_dir.path()))?;

    let result = controller.run_narrate(&temp_dir.path().join("missing.ssml"), None, None).await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_runStory_withFailingSynthesizer_shouldNotWriteFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let out_dir = temp_dir.path().join("audio");
    let backends = Backends::new(Arc::new(MockGenerator::working()), Arc::new(MockSynthesizer::failing()));
    let controller = Controller::with_backends(mock_config(&out_dir), backends);

    assert!(controller.run_story(None, None, None).await.is_err());
    assert!(!out_dir.exists());
    Ok(())
}

/// Test checking and indexing files without any backend call
#[test]
fn test_checkAndMarks_withRecordedStream_shouldWorkOffline() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let markup = common::create_test_file(temp_dir.path(), "story.ssml", common::SAMPLE_STORY)?;
    let stream: String = MockSynthesizer::fabricate_events(common::SAMPLE_STORY)?
        .iter()
        .map(|e| e.to_json_line() + "\n")
        .collect();
    let marks = common::create_test_file(temp_dir.path(), "story.marks", &stream)?;
    let controller = Controller::new_for_test()?;

    let report = controller.check(&markup)?;
    assert_eq!((report.sentences, report.words), (3, 9));
    assert_eq!(report.repair_applied, RepairApplied::None);

    let index = controller.marks(&markup, &marks)?;
    assert_eq!(index.len(), 9);
    assert_eq!(index.word_at(1450), Some((1, 4)));

    let bad = common::create_test_file(temp_dir.path(), "bad.ssml", "<speak>a</speak><speak>")?;
    assert!(controller.check(&bad).is_err());
    Ok(())
}
