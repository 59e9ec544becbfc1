/*!
 * Tests for markup validation, repair and segmentation
 */

use narrasync::errors::MarkupError;
use narrasync::markup::ElementKind;
use narrasync::{validate_and_repair, RepairApplied};

use crate::common;

#[test]
fn test_validateAndRepair_withWellFormedStory_shouldKeepMarkupIntact() {
    common::init_logging();
    let doc = validate_and_repair(common::SAMPLE_STORY).unwrap();

    assert_eq!(doc.repair_applied(), RepairApplied::None);
    assert_eq!(doc.count(ElementKind::Paragraph), 2);
    assert_eq!(doc.count(ElementKind::Sentence), 3);
    assert_eq!(doc.count(ElementKind::Mark), 1);
    assert!(doc.to_ssml().contains(r#"<break time="1s"/>"#));
    assert!(doc.to_ssml().contains(r#"<emphasis level="strong">something</emphasis>"#));
}

#[test]
fn test_validateAndRepair_withTruncatedStory_shouldAppendClosingTag() {
    let doc = validate_and_repair(common::TRUNCATED_STORY).unwrap();

    assert_eq!(doc.repair_applied(), RepairApplied::AppendedClosingTag);
    assert!(doc.to_ssml().trim_end().ends_with("</speak>"));
    assert!(doc.to_ssml().contains("Tom &amp; Jerry"));
    assert!(doc.plain_text().contains("Tom & Jerry"));
}

#[test]
fn test_validateAndRepair_withBareText_shouldWrapInRoot() {
    let doc = validate_and_repair("  It was a dark night.  ").unwrap();

    assert_eq!(doc.repair_applied(), RepairApplied::WrappedBothTags);
    assert!(doc.to_ssml().starts_with("<speak>"));
    assert_eq!(doc.segment().word_count(), 5);
}

#[test]
fn test_validateAndRepair_withUnbalancedRoots_shouldFail() {
    assert_eq!(
        validate_and_repair("<speak>a</speak><speak>b").unwrap_err(),
        MarkupError::UnrepairedRoot
    );
    assert_eq!(validate_and_repair("</speak>").unwrap_err(), MarkupError::UnrepairedRoot);
    assert_eq!(validate_and_repair(" \n\t ").unwrap_err(), MarkupError::Empty);
}

#[test]
fn test_validateAndRepair_withCrossedTags_shouldBeMalformed() {
    let err = validate_and_repair("<speak><s>a</speak>").unwrap_err();
    assert!(matches!(err, MarkupError::Malformed { .. }));
}

#[test]
fn test_segment_withStory_shouldFindSentencesAndWords() {
    let doc = validate_and_repair(common::SAMPLE_STORY).unwrap();
    let segmentation = doc.segment();

    let sentences: Vec<&str> = segmentation.sentences.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(
        sentences,
        vec!["The lantern flickered twice.", "Nobody moved.", "Then something knocked."]
    );
    assert_eq!(segmentation.word_count(), 9);
    assert_eq!(segmentation.words[8].text, "knocked");
    assert_eq!(segmentation.words[8].sentence_id, 2);
}

#[test]
fn test_segment_withEntityInSentence_shouldSkipPunctuationTokens() {
    let doc = validate_and_repair(common::TRUNCATED_STORY).unwrap();
    let words: Vec<String> = doc.segment().words.into_iter().map(|w| w.text).collect();

    assert_eq!(words, vec!["Tom", "Jerry", "ran", "They", "hid"]);
}

#[test]
fn test_wordContaining_shouldMapBytesToWords() {
    let doc = validate_and_repair("<speak>Hello brave world.</speak>").unwrap();
    let segmentation = doc.segment();
    let brave = segmentation.text.find("brave").unwrap();

    assert_eq!(segmentation.word_containing(brave + 2).map(|w| w.text.as_str()), Some("brave"));
    assert!(segmentation.word_containing(brave - 1).is_none());
}
