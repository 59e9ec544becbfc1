/*!
 * Synchronization index.
 *
 * Merges the parsed timing events with the sentence and word boundaries of
 * the document they were produced from. The result answers "what is being
 * spoken at time T" and the reverse, for caption highlighting.
 */

use std::ops::Range;

use log::debug;
use serde::Serialize;

use super::events::{TimingEvent, TimingEventKind};
use crate::errors::{BoundaryKind, IndexError};
use crate::markup::Document;

/// A spoken word and the time it starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub offset_millis: u64,
    pub sentence_id: usize,
    pub word_id: usize,
    /// Byte span reported by the event
    pub byte_start: usize,
    pub byte_end: usize,
    /// The word as it appears in the document
    pub text: String,
}

/// A spoken sentence and the time it starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceEntry {
    pub offset_millis: u64,
    pub sentence_id: usize,
    pub byte_start: usize,
    pub byte_end: usize,
    pub text: String,
}

/// A `<mark>` reached during playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkEntry {
    pub offset_millis: u64,
    pub name: String,
    pub byte_start: usize,
    pub byte_end: usize,
}

/// A sentence-level caption cue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caption {
    pub sentence_id: usize,
    pub start_millis: u64,
    /// Start of the next sentence; `None` for the last one
    pub end_millis: Option<u64>,
    pub text: String,
}

/// Queryable mapping between playback time and text position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SynchronizationIndex {
    entries: Vec<IndexEntry>,
    sentences: Vec<SentenceEntry>,
    marks: Vec<MarkEntry>,
    /// Document spans of the words, by word id
    #[serde(skip)]
    word_spans: Vec<Range<usize>>,
}

impl SynchronizationIndex {
    /// The word being spoken at `offset_millis`: the entry with the greatest
    /// start time not after it. `None` before the first word.
    ///
    /// Words that share a start time resolve to the first of them, so
    /// `word_at(offset_of(s, w))` returns `(s, w)` for that first word.
    pub fn word_at(&self, offset_millis: u64) -> Option<(usize, usize)> {
        let idx = self.entries.partition_point(|e| e.offset_millis <= offset_millis);
        let start = self.entries.get(idx.checked_sub(1)?)?.offset_millis;
        let first = self.entries.partition_point(|e| e.offset_millis < start);
        self.entries.get(first).map(|e| (e.sentence_id, e.word_id))
    }

    /// Start time of a word; `None` if the pair is not in the index
    pub fn offset_of(&self, sentence_id: usize, word_id: usize) -> Option<u64> {
        self.entries
            .get(word_id)
            .filter(|e| e.sentence_id == sentence_id)
            .map(|e| e.offset_millis)
    }

    /// The sentence being spoken at `offset_millis`
    pub fn sentence_at(&self, offset_millis: u64) -> Option<usize> {
        let idx = self.sentences.partition_point(|s| s.offset_millis <= offset_millis);
        idx.checked_sub(1).map(|i| self.sentences[i].sentence_id)
    }

    pub fn sentence_offset(&self, sentence_id: usize) -> Option<u64> {
        self.sentences.get(sentence_id).map(|s| s.offset_millis)
    }

    /// Start time of the word covering a byte of the document's plain text.
    /// Resolved through the document's word spans, which share the plain-text
    /// byte space the engine reports its event spans in.
    pub fn offset_at_text(&self, byte: usize) -> Option<u64> {
        let idx = self.word_spans.partition_point(|span| span.end <= byte);
        match self.word_spans.get(idx) {
            Some(span) if span.start <= byte => self.entries.get(idx).map(|e| e.offset_millis),
            _ => None,
        }
    }

    /// One caption cue per sentence, ending where the next one starts
    pub fn captions(&self) -> Vec<Caption> {
        self.sentences
            .iter()
            .enumerate()
            .map(|(i, sentence)| Caption {
                sentence_id: sentence.sentence_id,
                start_millis: sentence.offset_millis,
                end_millis: self.sentences.get(i + 1).map(|next| next.offset_millis),
                text: sentence.text.clone(),
            })
            .collect()
    }

    pub fn marks(&self) -> &[MarkEntry] {
        &self.marks
    }

    pub fn word(&self, word_id: usize) -> Option<&IndexEntry> {
        self.entries.get(word_id)
    }

    pub fn sentence(&self, sentence_id: usize) -> Option<&SentenceEntry> {
        self.sentences.get(sentence_id)
    }

    /// Word entries, ascending by start time
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn sentences(&self) -> &[SentenceEntry] {
        &self.sentences
    }

    /// Number of word entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fail on the first event that starts earlier than the previous event of its kind
fn check_order(events: &[TimingEvent]) -> Result<(), IndexError> {
    let mut last = [0u64; 3];
    for (at_index, event) in events.iter().enumerate() {
        let slot = match event.kind {
            TimingEventKind::SentenceStart => 0,
            TimingEventKind::WordStart => 1,
            TimingEventKind::MarkupMarker => 2,
        };
        if event.offset_millis < last[slot] {
            return Err(IndexError::OutOfOrder { at_index });
        }
        last[slot] = event.offset_millis;
    }
    Ok(())
}

fn check_count(boundary: BoundaryKind, expected: usize, found: usize) -> Result<(), IndexError> {
    if expected != found {
        return Err(IndexError::BoundaryMismatch { boundary, expected, found });
    }
    Ok(())
}

/// Build the synchronization index of a document from its timing events.
///
/// # Errors
///
/// * `IndexError::OutOfOrder` - an event starts before the previous event of
///   the same kind
/// * `IndexError::BoundaryMismatch` - the stream has a different number of
///   sentence (checked first) or word events than the document has boundaries
pub fn build_index(events: &[TimingEvent], doc: &Document) -> Result<SynchronizationIndex, IndexError> {
    check_order(events)?;

    let segmentation = doc.segment();
    let count = |kind: TimingEventKind| events.iter().filter(|e| e.kind == kind).count();
    check_count(
        BoundaryKind::Sentence,
        segmentation.sentence_count(),
        count(TimingEventKind::SentenceStart),
    )?;
    check_count(BoundaryKind::Word, segmentation.word_count(), count(TimingEventKind::WordStart))?;

    let mut index = SynchronizationIndex {
        entries: Vec::with_capacity(segmentation.word_count()),
        sentences: Vec::with_capacity(segmentation.sentence_count()),
        marks: Vec::new(),
        word_spans: segmentation.words.iter().map(|w| w.start..w.end).collect(),
    };

    let mut sentences = segmentation.sentences.iter();
    let mut words = segmentation.words.iter();
    for event in events {
        match event.kind {
            TimingEventKind::SentenceStart => {
                if let Some(sentence) = sentences.next() {
                    index.sentences.push(SentenceEntry {
                        offset_millis: event.offset_millis,
                        sentence_id: sentence.id,
                        byte_start: event.byte_start,
                        byte_end: event.byte_end,
                        text: sentence.text.clone(),
                    });
                }
            }
            TimingEventKind::WordStart => {
                if let Some(word) = words.next() {
                    index.entries.push(IndexEntry {
                        offset_millis: event.offset_millis,
                        sentence_id: word.sentence_id,
                        word_id: word.id,
                        byte_start: event.byte_start,
                        byte_end: event.byte_end,
                        text: word.text.clone(),
                    });
                }
            }
            TimingEventKind::MarkupMarker => index.marks.push(MarkEntry {
                offset_millis: event.offset_millis,
                name: event.mark_name.clone().unwrap_or_default(),
                byte_start: event.byte_start,
                byte_end: event.byte_end,
            }),
        }
    }

    debug!(
        "Built synchronization index: {} sentences, {} words, {} marks",
        index.sentences.len(),
        index.entries.len(),
        index.marks.len()
    );
    Ok(index)
}
