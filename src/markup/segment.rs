/*!
 * Sentence and word segmentation of a narration document.
 *
 * Boundaries are computed over the plain-text projection of the document, so
 * their byte spans line up with the offsets reported by the speech engine.
 * Every `<s>` element is one sentence. Text outside `<s>` elements is split
 * into implicit regions at paragraph edges and sentence elements, and each
 * region is split after tokens that end a sentence. `<break/>` and `<mark/>`
 * elements end the token they interrupt, even without surrounding whitespace.
 */

use std::ops::Range;

use serde::Serialize;

use super::document::{Element, ElementKind, Node};

/// A word boundary in the plain-text projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordSpan {
    pub id: usize,
    pub sentence_id: usize,
    /// Byte offset of the first character of the word
    pub start: usize,
    /// Byte offset one past the last character of the word
    pub end: usize,
    pub text: String,
}

/// A sentence boundary in the plain-text projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceSpan {
    pub id: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Ids of the words of this sentence
    pub words: Range<usize>,
}

/// Sentence and word boundaries of a document, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    /// The plain-text projection the spans point into
    pub text: String,
    pub sentences: Vec<SentenceSpan>,
    pub words: Vec<WordSpan>,
}

impl Segmentation {
    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// The word whose span contains the given byte offset
    pub fn word_containing(&self, byte: usize) -> Option<&WordSpan> {
        let idx = self.words.partition_point(|w| w.end <= byte);
        self.words.get(idx).filter(|w| w.start <= byte)
    }

    fn push_sentence(&mut self, tokens: &[Range<usize>]) {
        let sentence_id = self.sentences.len();
        let first_word = self.words.len();

        for token in tokens {
            let raw = &self.text[token.clone()];
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
            if word.is_empty() {
                continue;
            }
            let lead = raw.len() - raw.trim_start_matches(|c: char| !c.is_alphanumeric()).len();
            let start = token.start + lead;
            self.words.push(WordSpan {
                id: self.words.len(),
                sentence_id,
                start,
                end: start + word.len(),
                text: word.to_string(),
            });
        }

        // A sentence made only of punctuation is not a boundary
        if self.words.len() == first_word {
            return;
        }

        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return;
        };
        self.sentences.push(SentenceSpan {
            id: sentence_id,
            start: first.start,
            end: last.end,
            text: self.text[first.start..last.end].to_string(),
            words: first_word..self.words.len(),
        });
    }
}

/// A contiguous run of plain text that forms one or more sentences
#[derive(Debug, Clone, PartialEq, Eq)]
enum Region {
    /// Content of an `<s>` element
    Explicit(Range<usize>),
    /// Text outside any `<s>` element
    Implicit(Range<usize>),
}

struct RegionWalker {
    text: String,
    regions: Vec<Region>,
    open_implicit: Option<usize>,
    /// Plain-text offsets of `<break/>` and `<mark/>` elements, ascending
    cuts: Vec<usize>,
}

impl RegionWalker {
    fn flush(&mut self) {
        if let Some(start) = self.open_implicit.take() {
            if start < self.text.len() {
                self.regions.push(Region::Implicit(start..self.text.len()));
            }
        }
    }

    fn walk(&mut self, element: &Element, in_sentence: bool) {
        for child in element.children() {
            match child {
                Node::Text(leaf) => {
                    if !in_sentence && self.open_implicit.is_none() {
                        self.open_implicit = Some(self.text.len());
                    }
                    self.text.push_str(leaf.text());
                }
                Node::Element(child) if child.kind() == ElementKind::Sentence => {
                    self.flush();
                    let start = self.text.len();
                    self.walk(child, true);
                    self.regions.push(Region::Explicit(start..self.text.len()));
                }
                Node::Element(child) if child.kind() == ElementKind::Paragraph => {
                    self.flush();
                    self.walk(child, in_sentence);
                    self.flush();
                }
                Node::Element(child) if matches!(child.kind(), ElementKind::Break | ElementKind::Mark) => {
                    if self.cuts.last() != Some(&self.text.len()) {
                        self.cuts.push(self.text.len());
                    }
                }
                Node::Element(child) => self.walk(child, in_sentence),
            }
        }
    }
}

/// Byte ranges of the tokens inside `range`, delimited by whitespace and by `cuts`
fn tokens(text: &str, range: Range<usize>, cuts: &[usize]) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut start = None;

    for (i, c) in text[range.clone()].char_indices() {
        let at = range.start + i;
        if let Some(s) = start {
            if cuts.binary_search(&at).is_ok() {
                found.push(s..at);
                start = None;
            }
        }
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                found.push(s..at);
                start = None;
            }
            (false, None) => start = Some(at),
            _ => {}
        }
    }
    if let Some(s) = start {
        found.push(s..range.end);
    }
    found
}

/// Whether a token closes a sentence (`.`, `!`, `?` or `…`, before any closing quotes)
fn ends_sentence(token: &str) -> bool {
    let stripped = token.trim_end_matches(['"', '\'', '\u{201D}', '\u{2019}', ')', ']', '\u{BB}']);
    stripped.ends_with(['.', '!', '?', '\u{2026}'])
}

/// Segment the tree below `root` into sentences and words
pub(crate) fn segment(root: &Element) -> Segmentation {
    let mut walker = RegionWalker {
        text: String::new(),
        regions: Vec::new(),
        open_implicit: None,
        cuts: Vec::new(),
    };
    walker.walk(root, false);
    walker.flush();

    let mut segmentation = Segmentation {
        text: walker.text,
        ..Segmentation::default()
    };

    for region in walker.regions {
        match region {
            Region::Explicit(range) => {
                let tokens = tokens(&segmentation.text, range, &walker.cuts);
                segmentation.push_sentence(&tokens);
            }
            Region::Implicit(range) => {
                let tokens = tokens(&segmentation.text, range, &walker.cuts);
                let mut from = 0;
                for (i, token) in tokens.iter().enumerate() {
                    if ends_sentence(&segmentation.text[token.clone()]) {
                        segmentation.push_sentence(&tokens[from..=i]);
                        from = i + 1;
                    }
                }
                if from < tokens.len() {
                    segmentation.push_sentence(&tokens[from..]);
                }
            }
        }
    }

    segmentation
}

#[cfg(test)]
mod tests {
    use crate::markup::validate_and_repair;

    fn words(ssml: &str) -> Vec<String> {
        let doc = validate_and_repair(ssml).unwrap();
        doc.segment().words.into_iter().map(|w| w.text).collect()
    }

    #[test]
    fn test_segment_withSentenceElements_shouldUseThemAsBoundaries() {
        let doc = validate_and_repair("<speak><s>The cat sat.</s><s>It purred.</s></speak>").unwrap();
        let seg = doc.segment();

        assert_eq!(seg.sentence_count(), 2);
        assert_eq!(seg.word_count(), 5);
        assert_eq!(seg.sentences[0].text, "The cat sat.");
        assert_eq!(seg.sentences[1].words, 3..5);
        assert_eq!(seg.words[4].text, "purred");
        assert_eq!(seg.words[4].sentence_id, 1);
    }

    #[test]
    fn test_segment_withBareText_shouldSplitOnTerminalPunctuation() {
        let doc = validate_and_repair("<speak>Once upon a time. \"Who's there?\" she asked</speak>").unwrap();
        let seg = doc.segment();

        let sentences: Vec<_> = seg.sentences.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(sentences, vec!["Once upon a time.", "\"Who's there?\"", "she asked"]);
        assert_eq!(seg.words[4].text, "Who's");
    }

    #[test]
    fn test_segment_spans_shouldPointIntoPlainText() {
        let doc = validate_and_repair("<speak><p>Hello, <emphasis>brave</emphasis> world!</p></speak>").unwrap();
        let seg = doc.segment();

        assert_eq!(seg.text, doc.plain_text());
        for word in &seg.words {
            assert_eq!(&seg.text[word.start..word.end], word.text);
        }
        assert_eq!(seg.words[0].text, "Hello");
        assert_eq!(seg.words[2].text, "world");
    }

    #[test]
    fn test_segment_withParagraphs_shouldNotJoinRegions() {
        let doc = validate_and_repair("<speak><p>No full stop here</p><p>Second paragraph</p></speak>").unwrap();
        assert_eq!(doc.segment().sentence_count(), 2);
    }

    #[test]
    fn test_segment_shouldSkipPunctuationOnlyTokens() {
        assert_eq!(words("<speak><s>Wait - what ...</s></speak>"), vec!["Wait", "what"]);
        let doc = validate_and_repair("<speak><s>...</s><s>Go.</s></speak>").unwrap();
        let seg = doc.segment();
        assert_eq!(seg.sentence_count(), 1);
        assert_eq!(seg.sentences[0].id, 0);
    }

    #[test]
    fn test_segment_withBreakInsideWord_shouldSplitWords() {
        assert_eq!(words("<speak><s>Wait<break time=\"1s\"/>listen</s></speak>"), vec!["Wait", "listen"]);
        assert_eq!(words("<speak>Knock<mark name=\"door\"/>knock</speak>"), vec!["Knock", "knock"]);

        let doc = validate_and_repair("<speak><s>Wait<break time=\"1s\"/>listen</s></speak>").unwrap();
        let seg = doc.segment();
        assert_eq!(seg.sentence_count(), 1);
        assert_eq!(seg.text, "Waitlisten");
        assert_eq!((seg.words[1].start, seg.words[1].end), (4, 10));
    }

    #[test]
    fn test_segment_withBreakAfterTerminalPunctuation_shouldSplitSentences() {
        let doc = validate_and_repair("<speak>It ended.<break time=\"1s\"/>Then silence.</speak>").unwrap();
        let seg = doc.segment();

        let sentences: Vec<_> = seg.sentences.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(sentences, vec!["It ended.", "Then silence."]);
        assert_eq!(seg.words[2].text, "Then");
        assert_eq!(seg.words[2].sentence_id, 1);

        // A break without terminal punctuation only separates words
        let doc = validate_and_repair("<speak>It ended<break/>then silence.</speak>").unwrap();
        assert_eq!(doc.segment().sentence_count(), 1);
        assert_eq!(doc.segment().word_count(), 4);
    }

    #[test]
    fn test_segment_withMultibyteText_shouldUseByteOffsets() {
        let doc = validate_and_repair("<speak><s>Café au lait</s></speak>").unwrap();
        let seg = doc.segment();
        assert_eq!(seg.words[1].start, "Café ".len());
        assert_eq!(seg.word_containing(2).map(|w| w.id), Some(0));
        assert_eq!(seg.word_containing(5).map(|w| w.text.as_str()), None);
        assert_eq!(seg.word_containing(6).map(|w| w.text.as_str()), Some("au"));
    }
}
