/*!
 * Narration pipeline.
 *
 * Composes markup repair, request building, the two speech-synthesis calls,
 * timing-event parsing and index construction. Any failure aborts the whole
 * narration; there are no partial results.
 */

use bytes::Bytes;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::errors::NarrationError;
use crate::markup::{validate_and_repair, Document, RepairApplied};
use crate::providers::Backends;
use crate::story::{Genre, StoryPrompt};
use crate::synthesis::{build_request_pair, AudioEncoding};
use crate::timing::{build_index, parse_events, SynchronizationIndex};

/// Narrated audio with its synchronization index
#[derive(Debug, Clone)]
pub struct Narration {
    /// Encoded audio, opaque to the pipeline
    pub audio: Bytes,
    pub audio_encoding: AudioEncoding,
    pub index: SynchronizationIndex,
    pub repair_applied: RepairApplied,
    /// The validated document that was synthesized
    pub document: Document,
}

/// A generated story and its narration
#[derive(Debug, Clone)]
pub struct StoryNarration {
    pub genre: Genre,
    /// Markup exactly as the generator returned it
    pub raw_markup: String,
    pub narration: Narration,
}

/// Summary of a narration, for logs and output files
#[derive(Debug, Clone, Serialize)]
pub struct NarrationSummary {
    pub sentences: usize,
    pub words: usize,
    pub marks: usize,
    pub audio_bytes: usize,
    pub duration_millis: Option<u64>,
    pub repair_applied: RepairApplied,
}

impl Narration {
    pub fn summary(&self) -> NarrationSummary {
        NarrationSummary {
            sentences: self.index.sentences().len(),
            words: self.index.len(),
            marks: self.index.marks().len(),
            audio_bytes: self.audio.len(),
            duration_millis: self.index.entries().last().map(|e| e.offset_millis),
            repair_applied: self.repair_applied,
        }
    }
}

/// Narrate a raw markup document with the default (mp3) audio encoding
pub async fn narrate(backends: &Backends, raw_document: &str, voice_id: &str) -> Result<Narration, NarrationError> {
    narrate_with_encoding(backends, raw_document, voice_id, AudioEncoding::default()).await
}

/// Narrate a raw markup document.
///
/// The audio and timing-event requests are issued concurrently against the
/// same validated document.
///
/// # Errors
///
/// Any markup, request, backend, event or index error aborts the narration.
pub async fn narrate_with_encoding(
    backends: &Backends,
    raw_document: &str,
    voice_id: &str,
    audio_encoding: AudioEncoding,
) -> Result<Narration, NarrationError> {
    let document = validate_and_repair(raw_document)?;
    if document.repair_applied() != RepairApplied::None {
        warn!("Narration markup was repaired: {}", document.repair_applied());
    }

    let requests = build_request_pair(&document, voice_id)?.with_audio_encoding(audio_encoding);
    debug!(
        "Synthesizing {} bytes of SSML with voice {} via {}",
        requests.audio.document().len(),
        requests.audio.voice_id(),
        backends.synthesizer.name()
    );

    let synthesizer = &backends.synthesizer;
    let (audio, marks) = futures::try_join!(
        synthesizer.synthesize(&requests.audio),
        synthesizer.synthesize(&requests.timing)
    )
    .map_err(|e| {
        error!("Speech synthesis failed: {}", e);
        e
    })?;

    let events = parse_events(&marks)?;
    let index = build_index(&events, &document)?;
    info!(
        "Narrated {} sentences and {} words ({} bytes of {} audio)",
        index.sentences().len(),
        index.len(),
        audio.len(),
        audio_encoding
    );

    Ok(Narration {
        audio,
        audio_encoding,
        index,
        repair_applied: document.repair_applied(),
        document,
    })
}

/// Generate a story in the given genre with the default prompt and narrate it as mp3
pub async fn narrate_story(backends: &Backends, genre: Genre, voice_id: &str) -> Result<StoryNarration, NarrationError> {
    narrate_prompt(backends, &StoryPrompt::for_genre(genre), voice_id, AudioEncoding::default()).await
}

/// Generate a story for a rendered prompt and narrate it
pub async fn narrate_prompt(
    backends: &Backends,
    prompt: &StoryPrompt,
    voice_id: &str,
    audio_encoding: AudioEncoding,
) -> Result<StoryNarration, NarrationError> {
    info!("Generating a {} with {}", prompt.genre.story_phrase(), backends.generator.name());
    let raw_markup = backends.generator.generate(prompt).await.map_err(|e| {
        error!("Story generation failed: {}", e);
        e
    })?;
    debug!("Generated {} bytes of markup", raw_markup.len());

    let narration = narrate_with_encoding(backends, &raw_markup, voice_id, audio_encoding).await?;
    Ok(StoryNarration {
        genre: prompt.genre,
        raw_markup,
        narration,
    })
}
