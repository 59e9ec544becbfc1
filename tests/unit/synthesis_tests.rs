/*!
 * Tests for synthesis request building
 */

use narrasync::errors::BuildError;
use narrasync::synthesis::{build_request_pair, AudioEncoding};
use narrasync::{build_request, validate_and_repair, OutputFormat};

use crate::common;

#[test]
fn test_buildRequestPair_shouldShareOneDocument() {
    let doc = validate_and_repair(common::TRUNCATED_STORY).unwrap();
    let pair = build_request_pair(&doc, " Joanna ").unwrap();

    assert!(pair.audio.shares_document_with(&pair.timing));
    assert_eq!(pair.audio.document(), doc.to_ssml());
    assert_eq!(pair.audio.voice_id(), "Joanna");
    assert_eq!(pair.audio.output_format(), OutputFormat::Audio);
    assert_eq!(pair.timing.output_format(), OutputFormat::TimingEvents);
}

#[test]
fn test_buildRequest_withBlankVoice_shouldFail() {
    let doc = validate_and_repair(common::SAMPLE_STORY).unwrap();
    assert_eq!(
        build_request(&doc, "   ", OutputFormat::Audio).unwrap_err(),
        BuildError::MissingVoice
    );
}

#[test]
fn test_serialize_shouldProduceSynthesizeSpeechBodies() {
    let doc = validate_and_repair("<speak>Hi.</speak>").unwrap();
    let pair = build_request_pair(&doc, "Matthew").unwrap().with_audio_encoding(AudioEncoding::OggVorbis);

    let audio = serde_json::to_value(&pair.audio).unwrap();
    assert_eq!(
        audio,
        serde_json::json!({
            "OutputFormat": "ogg_vorbis",
            "Text": "<speak>Hi.</speak>",
            "TextType": "ssml",
            "VoiceId": "Matthew",
        })
    );

    let timing = serde_json::to_value(&pair.timing).unwrap();
    assert_eq!(timing["OutputFormat"], "json");
    assert_eq!(timing["SpeechMarkTypes"], serde_json::json!(["sentence", "word", "ssml"]));
}

#[test]
fn test_audioEncoding_fromStr_shouldAcceptShortNames() {
    assert_eq!("ogg".parse::<AudioEncoding>().unwrap(), AudioEncoding::OggVorbis);
    assert_eq!("MP3".parse::<AudioEncoding>().unwrap().extension(), "mp3");
    assert!("flac".parse::<AudioEncoding>().is_err());
}
