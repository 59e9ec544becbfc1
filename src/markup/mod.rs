/*!
 * Narration markup handling.
 *
 * - `repair`: validation and the two bounded root-tag repairs
 * - `parser`: structural parse into the narration tree
 * - `document`: the immutable `Document` tree and its text projections
 * - `segment`: sentence and word boundaries in document order
 */

pub mod document;
mod parser;
pub mod repair;
pub mod segment;

pub use document::{Document, Element, ElementKind, Node, TextLeaf};
pub use repair::{validate_and_repair, RepairApplied};
pub use segment::{Segmentation, SentenceSpan, WordSpan};
