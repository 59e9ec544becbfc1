/*!
 * Validation and bounded repair of generated narration markup.
 *
 * The story generator sometimes forgets the `<speak>` wrapper or stops before
 * closing it. Exactly two repairs are attempted, once, before the structural
 * parse:
 * - no root tags at all: wrap the whole input in `<speak>` ... `</speak>`
 * - a single root open tag with no close tag: append `</speak>`
 *
 * Every other defect is reported as a `MarkupError`.
 */

use std::fmt;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::document::Document;
use super::parser::parse_root;
use crate::errors::MarkupError;

static ROOT_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<speak(?:\s[^>]*)?>").expect("root open pattern is valid"));

static ROOT_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</speak\s*>").expect("root close pattern is valid"));

/// Which repair was applied before parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairApplied {
    /// The input already had a balanced root pair
    #[default]
    None,
    /// Neither root tag was present; the input was wrapped in both
    WrappedBothTags,
    /// The root was opened but never closed; a closing tag was appended
    AppendedClosingTag,
}

impl fmt::Display for RepairApplied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::WrappedBothTags => write!(f, "wrapped in <speak> tags"),
            Self::AppendedClosingTag => write!(f, "appended </speak>"),
        }
    }
}

/// Occurrences of root tags in a raw candidate document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RootTags {
    opens: usize,
    closes: usize,
}

impl RootTags {
    fn scan(raw: &str) -> Self {
        Self {
            opens: ROOT_OPEN.find_iter(raw).count(),
            closes: ROOT_CLOSE.find_iter(raw).count(),
        }
    }
}

/// Decide which repair a trimmed candidate needs, without parsing it
fn plan_repair(candidate: &str) -> Result<RepairApplied, MarkupError> {
    let tags = RootTags::scan(candidate);
    debug!("Root tags in candidate markup: {} open, {} close", tags.opens, tags.closes);

    match (tags.opens, tags.closes) {
        (0, 0) => Ok(RepairApplied::WrappedBothTags),
        (1, 0) => Ok(RepairApplied::AppendedClosingTag),
        (opens, closes) if opens == closes => Ok(RepairApplied::None),
        _ => Err(MarkupError::UnrepairedRoot),
    }
}

/// Validate a raw candidate document, repairing a missing root wrapper.
///
/// # Errors
///
/// * `MarkupError::Empty` - the input is empty or whitespace
/// * `MarkupError::UnrepairedRoot` - root tags are present but unbalanced in a
///   way neither repair covers (several opens, stray closes)
/// * `MarkupError::Malformed` - the (possibly repaired) markup is not a
///   well-formed `<speak>` document
pub fn validate_and_repair(raw: &str) -> Result<Document, MarkupError> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return Err(MarkupError::Empty);
    }

    let repair = plan_repair(candidate)?;
    let root = match repair {
        RepairApplied::None => parse_root(candidate)?,
        RepairApplied::WrappedBothTags => parse_root(&format!("<speak>\n{}\n</speak>", candidate))?,
        RepairApplied::AppendedClosingTag => parse_root(&format!("{}\n</speak>", candidate))?,
    };

    debug!("Markup validated (repair: {})", repair);
    Ok(Document::new(root, repair))
}
