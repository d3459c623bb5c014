//! Minimal element tree built on quick-xml.
//!
//! Hypervisor documents are small and shallow, so they are read fully into a
//! tree before any interpretation. A document is accepted only if it is
//! well-formed: one root element, balanced tags, no stray text outside the
//! root.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::ParseError;

/// An XML element with its attributes, concatenated text and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>, position: u64) -> Result<Self, ParseError> {
        let name = utf8(start.name().as_ref(), position)?.to_string();

        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| malformed(position, e))?;
            let key = utf8(attr.key.as_ref(), position)?.to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| malformed(position, e))?
                .into_owned();
            attrs.push((key, value));
        }

        Ok(Element {
            name,
            attrs,
            text: String::new(),
            children: Vec::new(),
        })
    }

    /// Value of attribute `name`, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Direct children named `name`, in document order.
    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Trimmed text content.
    pub fn text(&self) -> &str {
        self.text.trim()
    }
}

/// Parse `bytes` into the document's root element.
pub(crate) fn parse_document(bytes: &[u8]) -> Result<Element, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|e| malformed(position, e))?;

        match event {
            Event::Start(start) => stack.push(Element::from_start(&start, position)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start, position)?;
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed(position, "closing tag without opening tag"))?;
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::Text(raw) => {
                let content = raw.unescape().map_err(|e| malformed(position, e))?;
                push_text(&mut stack, &content, position)?;
            }
            Event::CData(raw) => {
                let bytes = raw.into_inner();
                let content = utf8(&bytes, position)?;
                push_text(&mut stack, content, position)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype.
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(
            reader.buffer_position() as u64,
            format!("unclosed element <{}>", open.name),
        ));
    }

    root.ok_or(ParseError::MissingRoot)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    position: u64,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(malformed(position, "multiple root elements"));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [Element], content: &str, position: u64) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.text.push_str(content);
            Ok(())
        }
        None if content.trim().is_empty() => Ok(()),
        None => Err(malformed(position, "text outside the root element")),
    }
}

fn utf8(bytes: &[u8], position: u64) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|e| malformed(position, e))
}

fn malformed(position: u64, message: impl std::fmt::Display) -> ParseError {
    ParseError::Malformed {
        position,
        message: message.to_string(),
    }
}
