/*!
 * End-to-end narration pipeline tests with mock backends
 */

use narrasync::errors::{BackendErrorKind, EventParseError, NarrationError};
use narrasync::providers::mock::MockSynthesizer;
use narrasync::{narrate, narrate_story, Genre, RepairApplied};

use crate::common;

#[tokio::test]
async fn test_narrate_withSampleStory_shouldIndexEveryWord() {
    common::init_logging();
    let backends = common::mock_backends();

    let narration = narrate(&backends, common::SAMPLE_STORY, "Joanna").await.unwrap();

    assert!(narration.audio.starts_with(b"ID3"));
    assert_eq!(narration.repair_applied, RepairApplied::None);
    assert_eq!(narration.index.len(), narration.document.segment().word_count());

    let summary = narration.summary();
    assert_eq!(summary.sentences, 3);
    assert_eq!(summary.words, 9);
    assert_eq!(summary.marks, 1);
    assert_eq!(summary.duration_millis, Some(2800));
}

#[tokio::test]
async fn test_narrate_withTruncatedMarkup_shouldRepairAndKeepEntities() {
    let narration = narrate(&common::mock_backends(), common::TRUNCATED_STORY, "Joanna")
        .await
        .unwrap();

    assert_eq!(narration.repair_applied, RepairApplied::AppendedClosingTag);
    assert!(narration.document.to_ssml().contains("&amp;"));
    assert_eq!(narration.index.word(1).map(|w| w.text.as_str()), Some("Jerry"));
}

#[tokio::test]
async fn test_narrate_withIntermittentSynthesizer_shouldSurfaceBackendError() {
    // The mock fails every second request; the timing request is the second call
    let backends = common::backends_with_synthesizer(MockSynthesizer::intermittent(2));

    match narrate(&backends, common::SAMPLE_STORY, "Joanna").await {
        Err(NarrationError::Backend(e)) => assert_eq!(e.kind, BackendErrorKind::Api { status: 503 }),
        other => panic!("expected a backend error, got {:?}", other.map(|n| n.summary())),
    }
}

#[tokio::test]
async fn test_narrate_withGarbageMarks_shouldFailWithParseError() {
    let synthesizer = MockSynthesizer::working().with_custom_marks(|_| "{\"time\":0}\n".to_string());
    let backends = common::backends_with_synthesizer(synthesizer);

    let err = narrate(&backends, common::SAMPLE_STORY, "Joanna").await.unwrap_err();
    assert!(matches!(
        err,
        NarrationError::EventParse(EventParseError::InvalidRecord { line_number: 1, .. })
    ));
}

#[tokio::test]
async fn test_narrateStory_shouldNarrateGeneratedStory() {
    let story = narrate_story(&common::mock_backends(), Genre::BedtimeStory, "Joanna")
        .await
        .unwrap();

    assert_eq!(story.genre, Genre::BedtimeStory);
    assert!(story.raw_markup.contains("bedtime story"));
    assert_eq!(story.narration.index.sentences().len(), 3);
}
