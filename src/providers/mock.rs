/*!
 * Mock backend implementations for testing.
 *
 * This module provides mock backends that simulate different behaviors:
 * - `MockGenerator::working()` - Always returns a well-formed story
 * - `MockGenerator::truncated()` - Returns a story without its closing root tag
 * - `MockSynthesizer::working()` - Returns fake audio and a speech-mark stream
 *   consistent with the request's document
 * - `failing()`, `intermittent(n)`, `empty()`, `slow(ms)` on both
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::{BackendError, BackendErrorKind};
use crate::markup::{validate_and_repair, Element, ElementKind, Node};
use crate::providers::{SpeechSynthesizer, StoryGenerator};
use crate::story::StoryPrompt;
use crate::synthesis::{OutputFormat, SynthesisRequest};
use crate::timing::TimingEvent;

/// Milliseconds between two fabricated word starts
pub const WORD_MILLIS: u64 = 300;

/// Extra pause fabricated between sentences
pub const SENTENCE_GAP_MILLIS: u64 = 200;

/// Behavior mode for the mock backends
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Generator: story without `</speak>`; synthesizer: last word mark dropped
    Truncated,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns an empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Shared request counting and failure injection
#[derive(Debug, Clone)]
struct MockState {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
}

impl MockState {
    fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Count the request and apply failure or delay behaviors
    async fn enter(&self) -> Result<(), BackendError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            MockBehavior::Intermittent { fail_every } if (count + 1) % fail_every.max(1) == 0 => Err(
                BackendError::new(
                    BackendErrorKind::Api { status: 503 },
                    format!("Simulated intermittent failure (request #{})", count + 1),
                ),
            ),
            MockBehavior::Failing => Err(BackendError::new(
                BackendErrorKind::Api { status: 500 },
                "Simulated backend failure",
            )),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

/// Mock story generator
#[derive(Debug, Clone)]
pub struct MockGenerator {
    state: MockState,
    /// Custom story generator (optional)
    custom_response: Option<fn(&StoryPrompt) -> String>,
}

impl MockGenerator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            state: MockState::new(behavior),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn truncated() -> Self {
        Self::new(MockBehavior::Truncated)
    }

    /// Fails every `fail_every`th request; zero is treated as one
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Set a custom story generator
    pub fn with_custom_response(mut self, generator: fn(&StoryPrompt) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.state.count()
    }

    /// A short well-formed story for a prompt
    pub fn sample_story(prompt: &StoryPrompt) -> String {
        format!(
            "<speak><p><s>Once upon a time there was a {}.</s><s>It was <emphasis>very</emphasis> short.</s></p>\
             <break time=\"500ms\"/><p><s>The end.</s></p></speak>",
            prompt.genre.story_phrase()
        )
    }
}

#[async_trait]
impl StoryGenerator for MockGenerator {
    async fn generate(&self, prompt: &StoryPrompt) -> Result<String, BackendError> {
        self.state.enter().await?;

        let story = match self.custom_response {
            Some(generator) => generator(prompt),
            None => Self::sample_story(prompt),
        };
        Ok(match self.state.behavior {
            MockBehavior::Empty => String::new(),
            MockBehavior::Truncated => story.trim_end().trim_end_matches("</speak>").to_string(),
            _ => story,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Mock speech synthesizer
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    state: MockState,
    /// Custom speech-mark stream generator (optional)
    custom_marks: Option<fn(&SynthesisRequest) -> String>,
}

impl MockSynthesizer {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            state: MockState::new(behavior),
            custom_marks: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn truncated() -> Self {
        Self::new(MockBehavior::Truncated)
    }

    /// Fails every `fail_every`th request; zero is treated as one
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom speech-mark stream generator
    pub fn with_custom_marks(mut self, generator: fn(&SynthesisRequest) -> String) -> Self {
        self.custom_marks = Some(generator);
        self
    }

    pub fn request_count(&self) -> usize {
        self.state.count()
    }

    /// Fake audio for a request; starts with an ID3 tag so players accept the file name
    pub fn fake_audio(request: &SynthesisRequest) -> Bytes {
        let mut audio = b"ID3".to_vec();
        audio.extend_from_slice(
            format!(
                "mock {} audio, voice {}, {} bytes of ssml",
                request.audio_encoding(),
                request.voice_id(),
                request.document().len()
            )
            .as_bytes(),
        );
        Bytes::from(audio)
    }

    /// Fabricate the speech-mark events of a document: one word every
    /// `WORD_MILLIS`, with a `SENTENCE_GAP_MILLIS` pause before each sentence
    pub fn fabricate_events(ssml: &str) -> Result<Vec<TimingEvent>, BackendError> {
        let doc = validate_and_repair(ssml)
            .map_err(|e| BackendError::new(BackendErrorKind::Api { status: 400 }, e.to_string()))?;
        let segmentation = doc.segment();
        let word_time = |id: usize, sentence_id: usize| {
            id as u64 * WORD_MILLIS + sentence_id as u64 * SENTENCE_GAP_MILLIS
        };

        let mut events = Vec::new();
        for sentence in &segmentation.sentences {
            events.push(TimingEvent::sentence(
                word_time(sentence.words.start, sentence.id),
                sentence.start,
                sentence.end,
                sentence.text.clone(),
            ));
            for word in &segmentation.words[sentence.words.clone()] {
                events.push(TimingEvent::word(
                    word_time(word.id, word.sentence_id),
                    word.start,
                    word.end,
                    word.text.clone(),
                ));
            }
        }

        let end_time = segmentation
            .words
            .last()
            .map_or(0, |w| word_time(w.id, w.sentence_id) + WORD_MILLIS);
        let mut marks = Vec::new();
        collect_marks(doc.root(), &mut 0, &mut marks);
        for (name, offset) in marks {
            let time = segmentation
                .words
                .iter()
                .find(|w| w.start >= offset)
                .map_or(end_time, |w| word_time(w.id, w.sentence_id));
            events.push(TimingEvent::marker(time, offset, offset, name));
        }

        Ok(events)
    }

    fn speech_marks(&self, request: &SynthesisRequest) -> Result<String, BackendError> {
        if let Some(generator) = self.custom_marks {
            return Ok(generator(request));
        }

        let mut events = Self::fabricate_events(request.document())?;
        if self.state.behavior == MockBehavior::Truncated {
            if let Some(last_word) = events
                .iter()
                .rposition(|e| e.kind == crate::timing::TimingEventKind::WordStart)
            {
                events.remove(last_word);
            }
        }
        Ok(events.iter().map(|e| e.to_json_line() + "\n").collect())
    }
}

/// Names of the `<mark>` elements with their plain-text offsets
fn collect_marks(element: &Element, offset: &mut usize, marks: &mut Vec<(String, usize)>) {
    for child in element.children() {
        match child {
            Node::Text(leaf) => *offset += leaf.text().len(),
            Node::Element(child) if child.kind() == ElementKind::Mark => {
                marks.push((child.attribute("name").unwrap_or_default().to_string(), *offset));
            }
            Node::Element(child) => collect_marks(child, offset, marks),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, BackendError> {
        self.state.enter().await?;

        if self.state.behavior == MockBehavior::Empty {
            return Ok(Bytes::new());
        }
        match request.output_format() {
            OutputFormat::Audio => Ok(Self::fake_audio(request)),
            OutputFormat::TimingEvents => Ok(Bytes::from(self.speech_marks(request)?)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
