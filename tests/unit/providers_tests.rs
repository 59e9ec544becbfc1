/*!
 * Tests for provider implementations and the retry policy
 */

use std::sync::atomic::{AtomicUsize, Ordering};

use narrasync::errors::{BackendError, BackendErrorKind};
use narrasync::providers::mock::{MockGenerator, MockSynthesizer};
use narrasync::providers::{RetryPolicy, SpeechSynthesizer, StoryGenerator};
use narrasync::story::StoryPrompt;
use narrasync::synthesis::build_request_pair;
use narrasync::{validate_and_repair, Genre};

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff_base_ms: 1,
    }
}

#[tokio::test]
async fn test_retry_withIntermittentGenerator_shouldRecover() {
    let generator = MockGenerator::intermittent(2);
    let prompt = StoryPrompt::for_genre(Genre::Fantasy);
    let policy = fast_retry(2);

    for _ in 0..2 {
        let story = policy.run("mock", || generator.generate(&prompt)).await.unwrap();
        assert!(story.starts_with("<speak>"));
    }
    // The second call failed once and was retried
    assert_eq!(generator.request_count(), 3);
}

#[tokio::test]
async fn test_retry_withFailingGenerator_shouldGiveUpAfterRetries() {
    let generator = MockGenerator::failing();
    let prompt = StoryPrompt::for_genre(Genre::Comedy);

    let err = fast_retry(2).run("mock", || generator.generate(&prompt)).await.unwrap_err();
    assert_eq!(err.kind, BackendErrorKind::Api { status: 500 });
    assert_eq!(generator.request_count(), 3);
}

#[tokio::test]
async fn test_retry_withPermanentError_shouldNotRetry() {
    let counter = AtomicUsize::new(0);
    let attempts = &counter;
    let result: Result<(), BackendError> = fast_retry(3)
        .run("mock", move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::from_status(401, "bad key"))
        })
        .await;

    assert_eq!(result.unwrap_err().kind, BackendErrorKind::Authentication);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_backendError_fromStatus_shouldClassifyTransience() {
    assert!(BackendError::from_status(429, "slow down").is_transient());
    assert!(BackendError::from_status(502, "bad gateway").is_transient());
    assert!(!BackendError::from_status(400, "bad request").is_transient());
    assert!(BackendError::transport("connection reset").is_transient());
}

#[tokio::test]
async fn test_mockSynthesizer_shouldAnswerBothRequestKinds() {
    let synthesizer = MockSynthesizer::working();
    let doc = validate_and_repair("<speak><s>Hello there.</s></speak>").unwrap();
    let pair = build_request_pair(&doc, "Joanna").unwrap();

    let audio = synthesizer.synthesize(&pair.audio).await.unwrap();
    let marks = synthesizer.synthesize(&pair.timing).await.unwrap();

    assert!(audio.starts_with(b"ID3"));
    let lines: Vec<&str> = std::str::from_utf8(&marks).unwrap().lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("\"type\":\"sentence\""));
    assert_eq!(synthesizer.request_count(), 2);
}

#[tokio::test]
async fn test_mockGenerator_truncated_shouldDropClosingRoot() {
    let story = MockGenerator::truncated()
        .generate(&StoryPrompt::for_genre(Genre::Horror))
        .await
        .unwrap();

    assert!(story.contains("horror story"));
    assert!(!story.contains("</speak>"));
}
