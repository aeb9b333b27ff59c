//! Forward-only token cursor and sink every codec drives.
//!
//! A codec that decodes is handed an [`XmlReader`] positioned on the start tag
//! of its value and leaves it on the next start tag, end tag or end of
//! document after that value. A codec that encodes writes zero or more
//! tokens to an [`XmlWriter`].

pub mod reader;
pub mod writer;

pub use reader::{EventReader, parse_events};
pub use writer::{EventWriter, render};

use crate::{Error, QName, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    StartElement,
    EndElement,
    Characters,
    EndDocument,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: QName, value: impl Into<String>) -> Attribute {
        Attribute {
            name,
            value: value.into(),
        }
    }
}

/// A structural token. End of document is implied by the end of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent {
    StartElement {
        name: QName,
        attributes: Vec<Attribute>,
        /// Declarations made on this element, `(prefix, namespace)`. The
        /// default namespace has an empty prefix.
        namespaces: Vec<(String, String)>,
    },
    EndElement {
        name: QName,
    },
    Characters(String),
    Comment(String),
}

impl XmlEvent {
    pub fn start(name: QName) -> XmlEvent {
        XmlEvent::StartElement {
            name,
            attributes: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    pub fn end(name: QName) -> XmlEvent {
        XmlEvent::EndElement { name }
    }

    pub fn text(text: impl Into<String>) -> XmlEvent {
        XmlEvent::Characters(text.into())
    }
}

/// The streaming input consumed by codecs.
pub trait XmlReader {
    /// Kind of the current token.
    fn event(&self) -> EventKind;

    /// Tag of the current start or end tag.
    fn name(&self) -> Option<&QName>;

    /// Number of attributes on the current start tag.
    fn attribute_count(&self) -> usize;

    fn attribute_name(&self, index: usize) -> Option<&QName>;

    fn attribute_value(&self, index: usize) -> Option<&str>;

    /// Character data of the current token.
    fn text(&self) -> Option<&str>;

    /// Move to the next token and return its kind. Once the end of the
    /// document is reached this keeps returning [`EventKind::EndDocument`].
    fn advance(&mut self) -> Result<EventKind>;

    /// Resolve a prefix against the namespaces in scope at the current token.
    /// The empty prefix resolves the default namespace.
    fn namespace_uri(&self, prefix: &str) -> Option<&str>;
}

/// The streaming output written by codecs.
pub trait XmlWriter {
    fn write_start_element(&mut self, name: &QName) -> Result<()>;

    /// Add an attribute to the start tag that was just written.
    fn write_attribute(&mut self, name: &QName, value: &str) -> Result<()>;

    /// Declare a namespace on the start tag that was just written.
    fn write_namespace(&mut self, prefix: &str, namespace: &str) -> Result<()>;

    fn write_characters(&mut self, text: &str) -> Result<()>;

    fn write_end_element(&mut self) -> Result<()>;

    /// The prefix bound to `namespace` in the current output scope. The
    /// default binding is reported as `Some("")`.
    fn prefix_for(&self, namespace: &str) -> Option<String>;

    /// The namespace `prefix` resolves to in the current output scope.
    fn namespace_for(&self, prefix: &str) -> Option<String>;

    /// Tag of the innermost open element, with the prefix it was written with.
    fn current_element(&self) -> Option<&QName>;
}

/// Value of the attribute `name` on the current start tag.
pub fn attribute<'r>(reader: &'r dyn XmlReader, name: &QName) -> Option<&'r str> {
    (0..reader.attribute_count())
        .find(|&i| reader.attribute_name(i) == Some(name))
        .and_then(|i| reader.attribute_value(i))
}

/// Whether the current start tag carries `xsi:nil="true"`.
pub fn is_nil(reader: &dyn XmlReader) -> bool {
    matches!(
        attribute(reader, &QName::xsi("nil")).map(str::trim),
        Some("true") | Some("1")
    )
}

/// Advance past character data to the next start tag, end tag or end of
/// document.
pub fn skip_to_tag(reader: &mut dyn XmlReader) -> Result<EventKind> {
    loop {
        match reader.advance()? {
            EventKind::Characters => continue,
            kind => return Ok(kind),
        }
    }
}

/// Move to the first start tag if the reader sits on leading character data.
pub fn skip_to_start(reader: &mut dyn XmlReader) -> Result<()> {
    let mut kind = reader.event();
    while kind == EventKind::Characters {
        kind = reader.advance()?;
    }
    match kind {
        EventKind::StartElement => Ok(()),
        _ => Err(unexpected(reader, "start tag")),
    }
}

/// The tag of the current start tag, or an error naming what was found.
pub fn expect_start<'r>(reader: &'r dyn XmlReader) -> Result<&'r QName> {
    match (reader.event(), reader.name()) {
        (EventKind::StartElement, Some(name)) => Ok(name),
        _ => Err(unexpected(reader, "start tag")),
    }
}

/// Collect the character content of the current element.
///
/// The reader must be on a start tag and is left on the matching end tag, so
/// namespaces declared on the element are still in scope.
pub fn element_text(reader: &mut dyn XmlReader) -> Result<String> {
    expect_start(reader)?;

    let mut text = String::new();
    loop {
        match reader.advance()? {
            EventKind::Characters => text.push_str(reader.text().unwrap_or_default()),
            EventKind::EndElement => return Ok(text),
            _ => return Err(unexpected(reader, "character data")),
        }
    }
}

/// Consume the current element including all of its content.
pub fn skip_element(reader: &mut dyn XmlReader) -> Result<EventKind> {
    expect_start(reader)?;

    let mut depth = 0usize;
    loop {
        match reader.advance()? {
            EventKind::StartElement => depth += 1,
            EventKind::EndElement if depth == 0 => break,
            EventKind::EndElement => depth -= 1,
            EventKind::Characters => {}
            EventKind::EndDocument => return Err(unexpected(reader, "end tag")),
        }
    }

    skip_to_tag(reader)
}

/// Step over the end tag the reader is on once an element's content has been
/// consumed.
pub fn finish_element(reader: &mut dyn XmlReader) -> Result<EventKind> {
    match reader.event() {
        EventKind::EndElement => skip_to_tag(reader),
        EventKind::StartElement => Err(Error::UnexpectedElement(
            reader.name().cloned().unwrap_or_else(|| QName::local("")),
        )),
        _ => Err(unexpected(reader, "end tag")),
    }
}

pub(crate) fn unexpected(reader: &dyn XmlReader, expected: &'static str) -> Error {
    let found = match (reader.event(), reader.name()) {
        (EventKind::StartElement, Some(name)) => format!("<{}>", name),
        (EventKind::EndElement, Some(name)) => format!("</{}>", name),
        (EventKind::Characters, _) => "character data".to_string(),
        (EventKind::EndDocument, _) => "end of document".to_string(),
        _ => "unknown token".to_string(),
    };
    Error::UnexpectedEvent { expected, found }
}
