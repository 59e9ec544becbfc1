/*!
 * Structural SSML parser.
 *
 * Builds the narration tree from a markup string with `quick_xml` events and
 * enforces the document rules: a single `<speak>` root, no nested paragraphs
 * or sentences, empty `<break/>` and `<mark/>`, no content outside the root.
 */

use std::str;

use log::trace;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::document::{Element, ElementKind, Node};
use crate::errors::MarkupError;

/// Parse a markup string into the `<speak>` root element
pub(crate) fn parse_root(input: &str) -> Result<Element, MarkupError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            MarkupError::malformed(format!("{} at position {}", e, reader.error_position()))
        })?;

        match event {
            Event::Start(e) => {
                let element = open_element(&e, &reader, &stack, root.is_some())?;
                stack.push(element);
            }
            Event::Empty(e) => {
                let element = open_element(&e, &reader, &stack, root.is_some())?;
                attach(element, &mut stack, &mut root)?;
            }
            Event::End(e) => {
                let name = decode_name(e.name().as_ref())?;
                let element = stack.pop().ok_or_else(|| {
                    MarkupError::malformed(format!("closing tag </{}> has no opening tag", name))
                })?;
                if element.name() != name {
                    return Err(MarkupError::malformed(format!(
                        "expected </{}>, found </{}>",
                        element.name(),
                        name
                    )));
                }
                attach(element, &mut stack, &mut root)?;
            }
            Event::Text(e) => {
                let content = e
                    .xml_content()
                    .map_err(|err| MarkupError::malformed(err.to_string()))?;
                let Some(parent) = text_parent(&mut stack, content.trim().is_empty())? else {
                    continue;
                };
                parent.trailing_text_mut().push_literal(&content);
            }
            Event::CData(e) => {
                let content = str::from_utf8(&e)
                    .map_err(|err| MarkupError::malformed(format!("CDATA is not UTF-8: {}", err)))?;
                let Some(parent) = text_parent(&mut stack, content.trim().is_empty())? else {
                    continue;
                };
                parent.trailing_text_mut().push_cdata(content);
            }
            Event::GeneralRef(e) => {
                let entity = str::from_utf8(e.as_ref())
                    .map_err(|err| MarkupError::malformed(format!("entity name is not UTF-8: {}", err)))?;
                let decoded = decode_entity(entity)?;
                let Some(parent) = text_parent(&mut stack, false)? else {
                    continue;
                };
                parent.trailing_text_mut().push_reference(entity, decoded);
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(MarkupError::malformed(format!("<{}> is never closed", open.name())));
    }

    root.ok_or_else(|| MarkupError::malformed("document has no <speak> root element"))
}

/// Find the element character data belongs to.
///
/// Whitespace outside the root is ignored; anything else there is a defect.
fn text_parent(stack: &mut [Element], whitespace: bool) -> Result<Option<&mut Element>, MarkupError> {
    match stack.last_mut() {
        Some(parent) if parent.kind().is_void() => {
            if whitespace {
                Ok(None)
            } else {
                Err(MarkupError::malformed(format!("<{}> must be empty", parent.name())))
            }
        }
        Some(parent) => Ok(Some(parent)),
        None if whitespace => Ok(None),
        None => Err(MarkupError::malformed("text outside the <speak> root element")),
    }
}

fn open_element(
    start: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    stack: &[Element],
    root_closed: bool,
) -> Result<Element, MarkupError> {
    let name = decode_name(start.name().as_ref())?;
    let kind = ElementKind::from_tag(&name);

    if root_closed && stack.is_empty() {
        return Err(MarkupError::malformed(format!("<{}> appears after the root element", name)));
    }
    if stack.is_empty() && kind != ElementKind::Speak {
        return Err(MarkupError::malformed(format!("root element must be <speak>, found <{}>", name)));
    }
    if let Some(parent) = stack.last() {
        if parent.kind().is_void() {
            return Err(MarkupError::malformed(format!("<{}> must be empty", parent.name())));
        }
    }

    let inside = |k: ElementKind| stack.iter().any(|e| e.kind() == k);
    match kind {
        ElementKind::Speak if !stack.is_empty() => {
            return Err(MarkupError::malformed("<speak> cannot be nested"));
        }
        ElementKind::Paragraph if inside(ElementKind::Paragraph) || inside(ElementKind::Sentence) => {
            return Err(MarkupError::malformed(format!(
                "<{}> cannot be nested inside a paragraph or sentence",
                name
            )));
        }
        ElementKind::Sentence if inside(ElementKind::Sentence) => {
            return Err(MarkupError::malformed(format!("<{}> cannot be nested inside a sentence", name)));
        }
        _ => {}
    }

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| {
            MarkupError::malformed(format!("invalid attribute in <{}>: {}", name, e))
        })?;
        let key = decode_name(attr.key.as_ref())?;
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| MarkupError::malformed(format!("invalid value for {} in <{}>: {}", key, name, e)))?;
        attributes.push((key, value.into_owned()));
    }

    trace!("Opened <{}> at depth {}", name, stack.len());
    Ok(Element::new(name, attributes))
}

/// Attach a finished element to its parent, or make it the root
fn attach(element: Element, stack: &mut [Element], root: &mut Option<Element>) -> Result<(), MarkupError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_child(Node::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(MarkupError::malformed("document has more than one root element")),
    }
}

fn decode_name(bytes: &[u8]) -> Result<String, MarkupError> {
    str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| MarkupError::malformed(format!("tag name is not UTF-8: {}", e)))
}

/// Decode a character or predefined entity reference (without `&` and `;`)
fn decode_entity(entity: &str) -> Result<char, MarkupError> {
    if let Some(number) = entity.strip_prefix('#') {
        let (radix, digits) = number
            .strip_prefix('x')
            .map_or((10, number), |hex| (16, hex));
        return u32::from_str_radix(digits, radix)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| MarkupError::malformed(format!("invalid character reference &{};", entity)));
    }

    match entity {
        "amp" => Ok('&'),
        "lt" => Ok('<'),
        "gt" => Ok('>'),
        "quot" => Ok('"'),
        "apos" => Ok('\''),
        _ => Err(MarkupError::malformed(format!("unknown entity &{};", entity))),
    }
}
