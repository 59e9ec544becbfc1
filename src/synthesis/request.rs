/*!
 * Synthesis request builder.
 *
 * Requests serialize to the `SynthesizeSpeech` JSON body understood by Polly
 * compatible endpoints. The document is carried as a shared `Arc<str>` so the
 * audio request and the timing-event request hold the byte-identical markup.
 */

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::BuildError;
use crate::markup::Document;

/// What a synthesis call produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Encoded audio
    Audio,
    /// Newline-delimited JSON timing events (speech marks)
    TimingEvents,
}

/// Audio encoding requested for `OutputFormat::Audio`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    #[default]
    Mp3,
    OggVorbis,
    Pcm,
}

impl AudioEncoding {
    /// Value of the `OutputFormat` field on the wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg_vorbis",
            Self::Pcm => "pcm",
        }
    }

    /// File extension for audio in this encoding
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg",
            Self::Pcm => "pcm",
        }
    }

    /// MIME type, used for data URLs
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::OggVorbis => "audio/ogg",
            Self::Pcm => "audio/pcm",
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for AudioEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "ogg_vorbis" | "ogg" => Ok(Self::OggVorbis),
            "pcm" => Ok(Self::Pcm),
            other => Err(format!("Unsupported audio encoding: {}", other)),
        }
    }
}

/// Kind of speech mark requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechMarkType {
    Sentence,
    Word,
    Ssml,
}

/// Mark types requested for a timing-event call
pub const TIMING_MARK_TYPES: [SpeechMarkType; 3] =
    [SpeechMarkType::Sentence, SpeechMarkType::Word, SpeechMarkType::Ssml];

/// An immutable request for one speech-synthesis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    document: Arc<str>,
    voice_id: String,
    output_format: OutputFormat,
    audio_encoding: AudioEncoding,
}

impl SynthesisRequest {
    /// The SSML document to synthesize
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn audio_encoding(&self) -> AudioEncoding {
        self.audio_encoding
    }

    /// Always `ssml`: documents are validated markup
    pub fn text_type(&self) -> &'static str {
        "ssml"
    }

    /// Speech mark types requested; empty for audio requests
    pub fn mark_types(&self) -> &'static [SpeechMarkType] {
        match self.output_format {
            OutputFormat::Audio => &[],
            OutputFormat::TimingEvents => &TIMING_MARK_TYPES,
        }
    }

    /// Whether both requests carry the very same document allocation
    pub fn shares_document_with(&self, other: &SynthesisRequest) -> bool {
        Arc::ptr_eq(&self.document, &other.document)
    }

    /// Copy of this request with a different audio encoding
    pub fn with_audio_encoding(mut self, encoding: AudioEncoding) -> Self {
        self.audio_encoding = encoding;
        self
    }
}

impl Serialize for SynthesisRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let marks = self.mark_types();
        let fields = if marks.is_empty() { 4 } else { 5 };
        let mut body = serializer.serialize_struct("SynthesizeSpeech", fields)?;
        match self.output_format {
            OutputFormat::Audio => body.serialize_field("OutputFormat", self.audio_encoding.wire_name())?,
            OutputFormat::TimingEvents => body.serialize_field("OutputFormat", "json")?,
        }
        if !marks.is_empty() {
            body.serialize_field("SpeechMarkTypes", marks)?;
        }
        body.serialize_field("Text", &*self.document)?;
        body.serialize_field("TextType", self.text_type())?;
        body.serialize_field("VoiceId", &self.voice_id)?;
        body.end()
    }
}

fn require_voice(voice_id: &str) -> Result<String, BuildError> {
    let voice = voice_id.trim();
    if voice.is_empty() {
        return Err(BuildError::MissingVoice);
    }
    Ok(voice.to_string())
}

/// Build a synthesis request for a validated document.
///
/// # Errors
///
/// `BuildError::MissingVoice` when `voice_id` is empty.
pub fn build_request(
    doc: &Document,
    voice_id: &str,
    output_format: OutputFormat,
) -> Result<SynthesisRequest, BuildError> {
    Ok(SynthesisRequest {
        document: Arc::clone(doc.ssml()),
        voice_id: require_voice(voice_id)?,
        output_format,
        audio_encoding: AudioEncoding::default(),
    })
}

/// The audio request and the timing-event request of one narration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPair {
    pub audio: SynthesisRequest,
    pub timing: SynthesisRequest,
}

impl RequestPair {
    pub fn with_audio_encoding(self, encoding: AudioEncoding) -> Self {
        Self {
            audio: self.audio.with_audio_encoding(encoding),
            timing: self.timing,
        }
    }
}

/// Build both requests of a narration from the same document
pub fn build_request_pair(doc: &Document, voice_id: &str) -> Result<RequestPair, BuildError> {
    Ok(RequestPair {
        audio: build_request(doc, voice_id, OutputFormat::Audio)?,
        timing: build_request(doc, voice_id, OutputFormat::TimingEvents)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::validate_and_repair;
    use serde_json::json;

    fn doc() -> Document {
        validate_and_repair("<speak><s>Hello there.</s></speak>").unwrap()
    }

    #[test]
    fn test_buildRequest_withEmptyVoice_shouldFail() {
        let doc = doc();
        assert_eq!(build_request(&doc, "", OutputFormat::Audio), Err(BuildError::MissingVoice));
        assert_eq!(build_request(&doc, "   ", OutputFormat::TimingEvents), Err(BuildError::MissingVoice));
    }

    #[test]
    fn test_buildRequestPair_shouldShareDocument() {
        let doc = doc();
        let pair = build_request_pair(&doc, "Joanna").unwrap();

        assert!(pair.audio.shares_document_with(&pair.timing));
        assert_eq!(pair.audio.document(), doc.to_ssml());
        assert_eq!(pair.audio.output_format(), OutputFormat::Audio);
        assert_eq!(pair.timing.output_format(), OutputFormat::TimingEvents);
    }

    #[test]
    fn test_serialize_audioRequest_shouldMatchWireBody() {
        let request = build_request(&doc(), "Joanna", OutputFormat::Audio)
            .unwrap()
            .with_audio_encoding(AudioEncoding::OggVorbis);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "OutputFormat": "ogg_vorbis",
                "Text": "<speak><s>Hello there.</s></speak>",
                "TextType": "ssml",
                "VoiceId": "Joanna"
            })
        );
    }

    #[test]
    fn test_serialize_timingRequest_shouldRequestAllMarkTypes() {
        let request = build_request(&doc(), "Matthew", OutputFormat::TimingEvents).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["OutputFormat"], "json");
        assert_eq!(body["SpeechMarkTypes"], json!(["sentence", "word", "ssml"]));
        assert_eq!(body["VoiceId"], "Matthew");
    }

    #[test]
    fn test_audioEncoding_fromStr_shouldAcceptAliases() {
        assert_eq!("MP3".parse::<AudioEncoding>(), Ok(AudioEncoding::Mp3));
        assert_eq!("ogg".parse::<AudioEncoding>(), Ok(AudioEncoding::OggVorbis));
        assert!("wav".parse::<AudioEncoding>().is_err());
    }
}
