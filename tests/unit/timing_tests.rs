/*!
 * Tests for speech-mark parsing and the synchronization index
 */

use narrasync::errors::{BoundaryKind, EventParseError, IndexError};
use narrasync::providers::mock::MockSynthesizer;
use narrasync::timing::TimingEventKind;
use narrasync::{build_index, parse_events, validate_and_repair, TimingEvent};

use crate::common;

/// Speech marks for the sample story, as a synthesizer would stream them
fn sample_stream() -> String {
    MockSynthesizer::fabricate_events(common::SAMPLE_STORY)
        .unwrap()
        .iter()
        .map(|e| e.to_json_line() + "\n")
        .collect()
}

#[test]
fn test_parseEvents_withFabricatedStream_shouldKeepEveryKind() {
    let events = parse_events(sample_stream().as_bytes()).unwrap();

    let count = |kind: TimingEventKind| events.iter().filter(|e| e.kind == kind).count();
    assert_eq!(count(TimingEventKind::SentenceStart), 3);
    assert_eq!(count(TimingEventKind::WordStart), 9);
    assert_eq!(count(TimingEventKind::MarkupMarker), 1);
}

#[test]
fn test_parseEvents_withVisemeRecord_shouldRejectWholeStream() {
    let stream = format!("{}{}\n", sample_stream(), r#"{"time":10,"type":"viseme","value":"p"}"#);
    let err = parse_events(stream.as_bytes()).unwrap_err();

    assert_eq!(
        err,
        EventParseError::InvalidRecord {
            line_number: 14,
            detail: "unknown event type 'viseme'".to_string(),
        }
    );
}

#[test]
fn test_buildIndex_withSampleStory_shouldAnswerPlaybackQueries() {
    common::init_logging();
    let doc = validate_and_repair(common::SAMPLE_STORY).unwrap();
    let events = parse_events(sample_stream().as_bytes()).unwrap();
    let index = build_index(&events, &doc).unwrap();

    assert_eq!(index.len(), 9);
    assert_eq!(index.sentences().len(), 3);
    assert_eq!(index.word_at(0), Some((0, 0)));
    assert_eq!(index.word_at(1500), Some((1, 4)));
    assert_eq!(index.word_at(2799), Some((2, 7)));
    assert_eq!(index.offset_of(1, 5), Some(1700));
    assert_eq!(index.offset_of(0, 5), None);
    assert_eq!(index.sentence_at(2300), Some(2));

    let moved = doc.plain_text().find("moved").unwrap();
    assert_eq!(index.offset_at_text(moved + 1), Some(1700));

    let marks = index.marks();
    assert_eq!(marks.len(), 1);
    assert_eq!(marks[0].name, "knock");
    assert_eq!(marks[0].offset_millis, 2800);
}

#[test]
fn test_captions_shouldEndWhereNextSentenceStarts() {
    let doc = validate_and_repair(common::SAMPLE_STORY).unwrap();
    let events = parse_events(sample_stream().as_bytes()).unwrap();
    let captions = build_index(&events, &doc).unwrap().captions();

    let spans: Vec<(u64, Option<u64>)> = captions.iter().map(|c| (c.start_millis, c.end_millis)).collect();
    assert_eq!(spans, vec![(0, Some(1400)), (1400, Some(2200)), (2200, None)]);
    assert_eq!(captions[1].text, "Nobody moved.");
}

#[test]
fn test_buildIndex_withMissingSentence_shouldReportSentenceMismatchFirst() {
    let doc = validate_and_repair("<speak><s>One.</s><s>Two.</s></speak>").unwrap();
    let events = vec![TimingEvent::sentence(0, 0, 4, "One."), TimingEvent::word(0, 0, 3, "One")];

    assert_eq!(
        build_index(&events, &doc).unwrap_err(),
        IndexError::BoundaryMismatch {
            boundary: BoundaryKind::Sentence,
            expected: 2,
            found: 1,
        }
    );
}

#[test]
fn test_buildIndex_withWordGoingBackInTime_shouldReportOffendingEvent() {
    let doc = validate_and_repair("<speak>Run fast.</speak>").unwrap();
    let events = vec![
        TimingEvent::sentence(0, 0, 9, "Run fast."),
        TimingEvent::word(100, 0, 3, "Run"),
        TimingEvent::word(50, 4, 8, "fast"),
    ];

    assert_eq!(build_index(&events, &doc).unwrap_err(), IndexError::OutOfOrder { at_index: 2 });
}

#[test]
fn test_buildIndex_withEmptyDocumentText_shouldBeEmpty() {
    let doc = validate_and_repair(r#"<speak><break time="2s"/></speak>"#).unwrap();
    let index = build_index(&[], &doc).unwrap();

    assert!(index.is_empty());
    assert_eq!(index.word_at(1000), None);
    assert!(index.captions().is_empty());
}
