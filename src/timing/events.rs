/*!
 * Timing event (speech mark) parser.
 *
 * The speech engine reports timing events as newline-delimited JSON:
 *
 * ```text
 * {"time":0,"type":"sentence","start":7,"end":19,"value":"The cat sat."}
 * {"time":6,"type":"word","start":7,"end":10,"value":"The"}
 * {"time":380,"type":"ssml","start":31,"end":52,"value":"chapter-1"}
 * ```
 *
 * Parsing is all or nothing: one bad record fails the whole stream.
 */

use std::fmt;
use std::str;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::EventParseError;

/// Kind of a timing event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingEventKind {
    SentenceStart,
    WordStart,
    /// A `<mark>` in the document was reached
    MarkupMarker,
}

impl TimingEventKind {
    /// Value of the `type` field on the wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::SentenceStart => "sentence",
            Self::WordStart => "word",
            Self::MarkupMarker => "ssml",
        }
    }

    fn from_wire(name: &str) -> Option<Self> {
        match name {
            "sentence" => Some(Self::SentenceStart),
            "word" => Some(Self::WordStart),
            "ssml" => Some(Self::MarkupMarker),
            _ => None,
        }
    }
}

impl fmt::Display for TimingEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// One timestamped marker correlating a text span with playback time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingEvent {
    /// Milliseconds from the start of the audio
    pub offset_millis: u64,
    pub kind: TimingEventKind,
    /// Spoken text; empty for markup markers
    pub text_value: String,
    /// Byte span in the plain-text projection of the document
    pub byte_start: usize,
    pub byte_end: usize,
    /// Name of the `<mark>` for markup markers
    pub mark_name: Option<String>,
}

impl TimingEvent {
    pub fn sentence(offset_millis: u64, byte_start: usize, byte_end: usize, text: impl Into<String>) -> Self {
        Self {
            offset_millis,
            kind: TimingEventKind::SentenceStart,
            text_value: text.into(),
            byte_start,
            byte_end,
            mark_name: None,
        }
    }

    pub fn word(offset_millis: u64, byte_start: usize, byte_end: usize, text: impl Into<String>) -> Self {
        Self {
            kind: TimingEventKind::WordStart,
            ..Self::sentence(offset_millis, byte_start, byte_end, text)
        }
    }

    pub fn marker(offset_millis: u64, byte_start: usize, byte_end: usize, name: impl Into<String>) -> Self {
        Self {
            offset_millis,
            kind: TimingEventKind::MarkupMarker,
            text_value: String::new(),
            byte_start,
            byte_end,
            mark_name: Some(name.into()),
        }
    }

    /// Encode this event as one record of the wire stream (no trailing newline)
    pub fn to_json_line(&self) -> String {
        let value = match self.kind {
            TimingEventKind::MarkupMarker => self.mark_name.as_deref().unwrap_or_default(),
            _ => self.text_value.as_str(),
        };
        let record = WireRecord {
            time: self.offset_millis,
            kind: self.kind.wire_name().to_string(),
            start: self.byte_start,
            end: self.byte_end,
            value: value.to_string(),
        };
        // A record of plain strings and integers always serializes
        serde_json::to_string(&record).unwrap_or_default()
    }
}

/// A record as it appears on the wire
#[derive(Debug, Serialize, Deserialize)]
struct WireRecord {
    time: u64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    start: usize,
    #[serde(default)]
    end: usize,
    #[serde(default)]
    value: String,
}

impl WireRecord {
    fn into_event(self) -> Result<TimingEvent, String> {
        let kind = TimingEventKind::from_wire(&self.kind)
            .ok_or_else(|| format!("unknown event type '{}'", self.kind))?;
        if self.start > self.end {
            return Err(format!("start {} is after end {}", self.start, self.end));
        }

        Ok(match kind {
            TimingEventKind::MarkupMarker => TimingEvent::marker(self.time, self.start, self.end, self.value),
            TimingEventKind::SentenceStart => TimingEvent::sentence(self.time, self.start, self.end, self.value),
            TimingEventKind::WordStart => TimingEvent::word(self.time, self.start, self.end, self.value),
        })
    }
}

/// Parse a raw timing-event stream into events, in arrival order.
///
/// # Errors
///
/// `EventParseError::InvalidRecord` for the first record that is not valid
/// UTF-8, not a JSON object of the expected shape, of an unknown type, or has
/// `start > end`. Blank lines are skipped.
pub fn parse_events(raw_stream: &[u8]) -> Result<Vec<TimingEvent>, EventParseError> {
    let mut events = Vec::new();

    for (index, line) in raw_stream.split(|b| *b == b'\n').enumerate() {
        let line_number = index + 1;
        let invalid = |detail: String| EventParseError::InvalidRecord { line_number, detail };

        let line = str::from_utf8(line).map_err(|e| invalid(format!("not valid UTF-8: {}", e)))?;
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }

        let record: WireRecord = serde_json::from_str(line).map_err(|e| invalid(e.to_string()))?;
        events.push(record.into_event().map_err(invalid)?);
    }

    debug!("Parsed {} timing events", events.len());
    Ok(events)
}
