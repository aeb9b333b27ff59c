use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{Attribute, EventKind, XmlEvent, XmlReader};
use crate::qname::{XML_NS, XMLNS_NS};
use crate::{Error, QName, Result};

type Scope = Vec<(String, String)>;

/// Parse a document into structural events with every name resolved against
/// the namespace declarations in scope.
///
/// Adjacent character data is merged, including CDATA sections. Processing
/// instructions and the document type declaration are dropped.
pub fn parse_events(xml: &str) -> Result<Vec<XmlEvent>> {
    let mut reader = Reader::from_str(xml);
    let mut scopes: Vec<Scope> = Vec::new();
    let mut open: Vec<QName> = Vec::new();
    let mut events = Vec::new();

    loop {
        match reader.read_event().map_err(Error::xml)? {
            Event::Start(start) => {
                let event = resolve_start(&start, &mut scopes)?;
                if let XmlEvent::StartElement { name, .. } = &event {
                    open.push(name.clone());
                }
                events.push(event);
            }
            Event::Empty(start) => {
                let event = resolve_start(&start, &mut scopes)?;
                scopes.pop();
                if let XmlEvent::StartElement { name, .. } = &event {
                    let end = XmlEvent::end(name.clone());
                    events.push(event);
                    events.push(end);
                }
            }
            Event::End(_) => {
                let name = open
                    .pop()
                    .ok_or_else(|| Error::Xml("end tag without a start tag".into()))?;
                scopes.pop();
                events.push(XmlEvent::end(name));
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(Error::xml)?;
                push_text(&mut events, &text);
            }
            Event::CData(data) => {
                let text = String::from_utf8(data.into_inner().into_owned()).map_err(Error::xml)?;
                push_text(&mut events, &text);
            }
            Event::Comment(comment) => {
                events.push(XmlEvent::Comment(
                    String::from_utf8_lossy(&comment).into_owned(),
                ));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(name) = open.pop() {
        return Err(Error::Xml(format!("element <{}> is never closed", name)));
    }

    tracing::trace!(events = events.len(), "parsed document");
    Ok(events)
}

pub(crate) fn push_text(events: &mut Vec<XmlEvent>, text: &str) {
    if text.is_empty() {
        return;
    }
    match events.last_mut() {
        Some(XmlEvent::Characters(previous)) => previous.push_str(text),
        _ => events.push(XmlEvent::text(text)),
    }
}

fn resolve_start(start: &BytesStart<'_>, scopes: &mut Vec<Scope>) -> Result<XmlEvent> {
    let raw_name = std::str::from_utf8(start.name().as_ref())
        .map_err(Error::xml)?
        .to_string();

    let mut namespaces = Vec::new();
    let mut raw_attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(Error::xml)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(Error::xml)?
            .to_string();
        let value = attr.unescape_value().map_err(Error::xml)?.into_owned();

        if key == "xmlns" {
            namespaces.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespaces.push((prefix.to_string(), value));
        } else {
            raw_attributes.push((key, value));
        }
    }

    scopes.push(namespaces.clone());

    let name = resolve_name(&raw_name, scopes, true)?;
    let attributes = raw_attributes
        .into_iter()
        .map(|(key, value)| Ok(Attribute::new(resolve_name(&key, scopes, false)?, value)))
        .collect::<Result<Vec<_>>>()?;

    Ok(XmlEvent::StartElement {
        name,
        attributes,
        namespaces,
    })
}

fn resolve_name(raw: &str, scopes: &[Scope], use_default: bool) -> Result<QName> {
    let (prefix, local) = QName::split_raw(raw);
    if local.is_empty() {
        return Err(Error::EmptyLocalName(raw.to_string()));
    }

    if prefix.is_empty() {
        let namespace = if use_default {
            lookup(scopes, "").unwrap_or_default()
        } else {
            ""
        };
        return Ok(QName::new(namespace, local));
    }

    let namespace =
        lookup(scopes, prefix).ok_or_else(|| Error::UnboundPrefix(prefix.to_string()))?;
    Ok(QName::with_prefix(namespace, local, prefix))
}

fn lookup<'s>(scopes: &'s [Scope], prefix: &str) -> Option<&'s str> {
    match prefix {
        "xml" => return Some(XML_NS),
        "xmlns" => return Some(XMLNS_NS),
        _ => {}
    }

    scopes
        .iter()
        .rev()
        .flat_map(|scope| scope.iter().rev())
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| uri.as_str())
}

/// An [`XmlReader`] over a parsed event sequence.
///
/// The namespace scope of a start tag is entered when the cursor arrives on it
/// and left when the cursor moves past the matching end tag. Comments are
/// never reported.
#[derive(Debug, Clone)]
pub struct EventReader {
    events: Vec<XmlEvent>,
    pos: usize,
    scopes: Vec<Scope>,
}

impl EventReader {
    pub fn from_str(xml: &str) -> Result<EventReader> {
        Ok(EventReader::from_events(parse_events(xml)?))
    }

    pub fn from_events(events: Vec<XmlEvent>) -> EventReader {
        let mut reader = EventReader {
            events,
            pos: 0,
            scopes: Vec::new(),
        };
        reader.settle();
        reader
    }

    /// Skip comments and enter the scope of a start tag under the cursor.
    fn settle(&mut self) {
        while let Some(XmlEvent::Comment(_)) = self.events.get(self.pos) {
            self.pos += 1;
        }
        if let Some(XmlEvent::StartElement { namespaces, .. }) = self.events.get(self.pos) {
            self.scopes.push(namespaces.clone());
        }
    }

    fn current(&self) -> Option<&XmlEvent> {
        self.events.get(self.pos)
    }

    fn current_attributes(&self) -> &[Attribute] {
        match self.current() {
            Some(XmlEvent::StartElement { attributes, .. }) => attributes,
            _ => &[],
        }
    }
}

impl XmlReader for EventReader {
    fn event(&self) -> EventKind {
        match self.current() {
            Some(XmlEvent::StartElement { .. }) => EventKind::StartElement,
            Some(XmlEvent::EndElement { .. }) => EventKind::EndElement,
            Some(XmlEvent::Characters(_)) | Some(XmlEvent::Comment(_)) => EventKind::Characters,
            None => EventKind::EndDocument,
        }
    }

    fn name(&self) -> Option<&QName> {
        match self.current() {
            Some(XmlEvent::StartElement { name, .. }) | Some(XmlEvent::EndElement { name }) => {
                Some(name)
            }
            _ => None,
        }
    }

    #[inline(always)]
    fn attribute_count(&self) -> usize {
        self.current_attributes().len()
    }

    fn attribute_name(&self, index: usize) -> Option<&QName> {
        self.current_attributes().get(index).map(|a| &a.name)
    }

    fn attribute_value(&self, index: usize) -> Option<&str> {
        self.current_attributes()
            .get(index)
            .map(|a| a.value.as_str())
    }

    fn text(&self) -> Option<&str> {
        match self.current() {
            Some(XmlEvent::Characters(text)) => Some(text),
            _ => None,
        }
    }

    fn advance(&mut self) -> Result<EventKind> {
        if self.pos >= self.events.len() {
            return Ok(EventKind::EndDocument);
        }
        if let Some(XmlEvent::EndElement { .. }) = self.current() {
            self.scopes.pop();
        }
        self.pos += 1;
        self.settle();
        Ok(self.event())
    }

    fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        lookup(&self.scopes, prefix)
    }
}
