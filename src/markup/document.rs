/*!
 * Narration document tree.
 *
 * A `Document` is the validated form of an SSML narration: a single `<speak>`
 * root with paragraphs, sentences and prosody elements below it. It is built
 * once by `validate_and_repair` and never mutated afterwards.
 */

use std::fmt;
use std::sync::Arc;

use quick_xml::escape::escape;
use serde::Serialize;

use super::repair::RepairApplied;
use super::segment::{self, Segmentation};

/// Kind of an SSML element in the narration tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementKind {
    /// `<speak>`, the document root
    Speak,
    /// `<p>` / `<paragraph>`
    Paragraph,
    /// `<s>` / `<sentence>`
    Sentence,
    /// `<emphasis>`
    Emphasis,
    /// `<prosody>`
    Prosody,
    /// `<break/>`
    Break,
    /// `<mark name=".."/>`, reported back by the speech engine as a markup marker
    Mark,
    /// Any other SSML element (`say-as`, `sub`, `amazon:effect`, ...)
    Other,
}

impl ElementKind {
    /// Classify a tag name as written in the markup
    pub fn from_tag(name: &str) -> Self {
        match name {
            "speak" => Self::Speak,
            "p" | "paragraph" => Self::Paragraph,
            "s" | "sentence" => Self::Sentence,
            "emphasis" => Self::Emphasis,
            "prosody" => Self::Prosody,
            "break" => Self::Break,
            "mark" => Self::Mark,
            _ => Self::Other,
        }
    }

    /// Whether elements of this kind must not have content
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Break | Self::Mark)
    }
}

/// A character-data leaf.
///
/// `raw` keeps the text exactly as it appeared in the markup, entity
/// references included, so re-serialization is byte-faithful. `text` is the
/// decoded character data used for the plain-text projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLeaf {
    raw: String,
    text: String,
}

impl TextLeaf {
    pub(crate) fn new() -> Self {
        Self { raw: String::new(), text: String::new() }
    }

    /// Append character data that contains no markup characters
    pub(crate) fn push_literal(&mut self, content: &str) {
        self.raw.push_str(content);
        self.text.push_str(content);
    }

    /// Append CDATA content, escaping it for the serialized form
    pub(crate) fn push_cdata(&mut self, content: &str) {
        self.raw.push_str(&content.replace('&', "&amp;").replace('<', "&lt;"));
        self.text.push_str(content);
    }

    /// Append a decoded entity reference, keeping its source form
    pub(crate) fn push_reference(&mut self, entity: &str, decoded: char) {
        self.raw.push('&');
        self.raw.push_str(entity);
        self.raw.push(';');
        self.text.push(decoded);
    }

    /// Character data as written in the markup
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decoded character data
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A node of the narration tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(TextLeaf),
}

/// An SSML element with its attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    kind: ElementKind,
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub(crate) fn new(name: impl Into<String>, attributes: Vec<(String, String)>) -> Self {
        let name = name.into();
        Self {
            kind: ElementKind::from_tag(&name),
            name,
            attributes,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Tag name as written, including any namespace prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Look up a decoded attribute value
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub(crate) fn push_child(&mut self, node: Node) {
        self.children.push(node);
    }

    /// The text leaf that trailing character data should be appended to
    pub(crate) fn trailing_text_mut(&mut self) -> &mut TextLeaf {
        if !matches!(self.children.last(), Some(Node::Text(_))) {
            self.children.push(Node::Text(TextLeaf::new()));
        }
        match self.children.last_mut() {
            Some(Node::Text(leaf)) => leaf,
            _ => unreachable!("a text leaf was just pushed"),
        }
    }

    /// Iterate over all descendant elements in document order
    pub fn descendants(&self) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_descendants(self, &mut found);
        found
    }

    fn write_ssml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(element) => element.write_ssml(out),
                Node::Text(leaf) => out.push_str(&leaf.raw),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn collect_descendants<'a>(element: &'a Element, found: &mut Vec<&'a Element>) {
    for child in &element.children {
        if let Node::Element(child) = child {
            found.push(child);
            collect_descendants(child, found);
        }
    }
}

/// A validated narration document with a single `<speak>` root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
    ssml: Arc<str>,
    repair_applied: RepairApplied,
}

impl Document {
    pub(crate) fn new(root: Element, repair_applied: RepairApplied) -> Self {
        let mut ssml = String::new();
        root.write_ssml(&mut ssml);
        Self {
            root,
            ssml: Arc::from(ssml),
            repair_applied,
        }
    }

    /// The `<speak>` root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Which repair, if any, was needed to build this document
    pub fn repair_applied(&self) -> RepairApplied {
        self.repair_applied
    }

    /// Serialized SSML, shared by every request built from this document
    pub fn ssml(&self) -> &Arc<str> {
        &self.ssml
    }

    /// Re-serialize the document to an SSML string
    pub fn to_ssml(&self) -> String {
        self.ssml.to_string()
    }

    /// Concatenated decoded text of every text leaf, in document order.
    ///
    /// Timing-event byte offsets and word spans refer to this string.
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        push_plain_text(&self.root, &mut text);
        text
    }

    /// Human-readable text: one line per paragraph, whitespace collapsed
    pub fn display_text(&self) -> String {
        let mut text = String::new();
        push_display_text(&self.root, &mut text);
        text.lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of elements of the given kind
    pub fn count(&self, kind: ElementKind) -> usize {
        self.root
            .descendants()
            .into_iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    /// Split the document into sentence and word boundaries
    pub fn segment(&self) -> Segmentation {
        segment::segment(&self.root)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ssml)
    }
}

fn push_plain_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Element(child) => push_plain_text(child, out),
            Node::Text(leaf) => out.push_str(&leaf.text),
        }
    }
}

fn push_display_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Element(child) if child.kind() == ElementKind::Paragraph => {
                out.push('\n');
                push_display_text(child, out);
                out.push('\n');
            }
            Node::Element(child) if child.kind() == ElementKind::Break => out.push(' '),
            Node::Element(child) if child.kind() == ElementKind::Sentence => {
                push_display_text(child, out);
                out.push(' ');
            }
            Node::Element(child) => push_display_text(child, out),
            Node::Text(leaf) => out.push_str(&leaf.text),
        }
    }
}
