use quick_xml::escape::escape;

use super::reader::push_text;
use super::{Attribute, XmlEvent, XmlWriter};
use crate::qname::XML_NS;
use crate::{Error, QName, Result};

#[derive(Debug)]
struct Frame {
    name: QName,
    namespaces: Vec<(String, String)>,
}

/// An [`XmlWriter`] that records events, declaring namespaces as names need
/// them.
#[derive(Debug, Default)]
pub struct EventWriter {
    events: Vec<XmlEvent>,
    stack: Vec<Frame>,
    open_start: Option<usize>,
}

impl EventWriter {
    pub fn new() -> EventWriter {
        EventWriter::default()
    }

    pub fn events(&self) -> &[XmlEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<XmlEvent> {
        self.events
    }

    /// Serialize everything written so far.
    pub fn to_xml(&self, indent: Option<usize>) -> Result<String> {
        if let Some(frame) = self.stack.last() {
            return Err(Error::Xml(format!("element <{}> is never closed", frame.name)));
        }
        Ok(render(&self.events, indent))
    }

    fn lookup_uri(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        self.stack
            .iter()
            .rev()
            .flat_map(|frame| frame.namespaces.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn lookup_prefix(&self, namespace: &str, allow_default: bool) -> Option<&str> {
        if namespace == XML_NS {
            return Some("xml");
        }
        self.stack
            .iter()
            .rev()
            .flat_map(|frame| frame.namespaces.iter().rev())
            .filter(|(p, uri)| uri == namespace && (allow_default || !p.is_empty()))
            .map(|(p, _)| p.as_str())
            .find(|p| self.lookup_uri(p) == Some(namespace))
    }

    fn declare(&mut self, prefix: &str, namespace: &str) -> Result<()> {
        let (Some(index), Some(frame)) = (self.open_start, self.stack.last_mut()) else {
            return Err(Error::UnexpectedEvent {
                expected: "open start tag",
                found: format!("namespace declaration for `{}`", namespace),
            });
        };
        match frame.namespaces.iter().find(|(p, _)| p == prefix) {
            Some((_, uri)) if uri == namespace => return Ok(()),
            Some((_, uri)) => return Err(Error::prefix_conflict(prefix, uri, namespace)),
            None => {}
        }
        frame
            .namespaces
            .push((prefix.to_string(), namespace.to_string()));

        if let Some(XmlEvent::StartElement { namespaces, .. }) = self.events.get_mut(index) {
            namespaces.push((prefix.to_string(), namespace.to_string()));
        }
        Ok(())
    }

    fn fresh_prefix(&self) -> String {
        (1..)
            .map(|n| format!("ns{}", n))
            .find(|p| self.lookup_uri(p).is_none())
            .unwrap_or_else(|| "ns".to_string())
    }
}

impl XmlWriter for EventWriter {
    fn write_start_element(&mut self, name: &QName) -> Result<()> {
        let namespace = name.namespace();
        let mut declarations = Vec::new();

        let prefix = if namespace.is_empty() {
            if !self.lookup_uri("").unwrap_or_default().is_empty() {
                declarations.push((String::new(), String::new()));
            }
            String::new()
        } else {
            match name.prefix() {
                Some(prefix) => {
                    if self.lookup_uri(prefix) != Some(namespace) {
                        declarations.push((prefix.to_string(), namespace.to_string()));
                    }
                    prefix.to_string()
                }
                None => match self.lookup_prefix(namespace, true) {
                    Some(prefix) => prefix.to_string(),
                    None => {
                        declarations.push((String::new(), namespace.to_string()));
                        String::new()
                    }
                },
            }
        };

        let written = QName::with_prefix(namespace, name.local_part(), prefix);
        self.open_start = Some(self.events.len());
        self.events.push(XmlEvent::StartElement {
            name: written.clone(),
            attributes: Vec::new(),
            namespaces: declarations.clone(),
        });
        self.stack.push(Frame {
            name: written,
            namespaces: declarations,
        });
        Ok(())
    }

    fn write_attribute(&mut self, name: &QName, value: &str) -> Result<()> {
        let Some(index) = self.open_start else {
            return Err(Error::UnexpectedEvent {
                expected: "open start tag",
                found: format!("attribute {}", name),
            });
        };

        let written = if name.namespace().is_empty() {
            QName::local(name.local_part())
        } else {
            let namespace = name.namespace();
            let prefix = match name.prefix() {
                Some(prefix) if self.lookup_uri(prefix) == Some(namespace) => prefix.to_string(),
                hint => match self.lookup_prefix(namespace, false) {
                    Some(prefix) => prefix.to_string(),
                    None => {
                        let prefix = hint
                            .filter(|p| self.lookup_uri(p).is_none())
                            .map(str::to_string)
                            .unwrap_or_else(|| self.fresh_prefix());
                        self.declare(&prefix, namespace)?;
                        prefix
                    }
                },
            };
            QName::with_prefix(namespace, name.local_part(), prefix)
        };

        if let Some(XmlEvent::StartElement { attributes, .. }) = self.events.get_mut(index) {
            attributes.retain(|a| a.name != written);
            attributes.push(Attribute::new(written, value));
        }
        Ok(())
    }

    fn write_namespace(&mut self, prefix: &str, namespace: &str) -> Result<()> {
        self.declare(prefix, namespace)
    }

    fn write_characters(&mut self, text: &str) -> Result<()> {
        self.open_start = None;
        push_text(&mut self.events, text);
        Ok(())
    }

    fn write_end_element(&mut self) -> Result<()> {
        let frame = self.stack.pop().ok_or_else(|| Error::UnexpectedEvent {
            expected: "open element",
            found: "end tag".to_string(),
        })?;
        self.open_start = None;
        self.events.push(XmlEvent::end(frame.name));
        Ok(())
    }

    fn prefix_for(&self, namespace: &str) -> Option<String> {
        self.lookup_prefix(namespace, true).map(str::to_string)
    }

    fn namespace_for(&self, prefix: &str) -> Option<String> {
        self.lookup_uri(prefix).map(str::to_string)
    }

    fn current_element(&self) -> Option<&QName> {
        self.stack.last().map(|frame| &frame.name)
    }
}

/// Serialize events as markup. With `indent`, element-only content is laid
/// out one tag per line; mixed content is written as is.
pub fn render(events: &[XmlEvent], indent: Option<usize>) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    let mut previous: Option<&XmlEvent> = None;
    let mut iter = events.iter().peekable();

    while let Some(event) = iter.next() {
        match event {
            XmlEvent::StartElement {
                name,
                attributes,
                namespaces,
            } => {
                if let Some(width) = indent {
                    if previous.is_some() && !matches!(previous, Some(XmlEvent::Characters(_))) {
                        newline(&mut out, width, depth);
                    }
                }

                out.push('<');
                out.push_str(&name.to_lexical());
                for (prefix, uri) in namespaces {
                    if prefix.is_empty() {
                        out.push_str(" xmlns=\"");
                    } else {
                        out.push_str(" xmlns:");
                        out.push_str(prefix);
                        out.push_str("=\"");
                    }
                    out.push_str(&escape(uri.as_str()));
                    out.push('"');
                }
                for attr in attributes {
                    out.push(' ');
                    out.push_str(&attr.name.to_lexical());
                    out.push_str("=\"");
                    out.push_str(&escape(attr.value.as_str()));
                    out.push('"');
                }

                if let Some(end @ XmlEvent::EndElement { .. }) = iter.peek() {
                    out.push_str("/>");
                    previous = Some(end);
                    iter.next();
                    continue;
                }
                out.push('>');
                depth += 1;
            }
            XmlEvent::EndElement { name } => {
                depth = depth.saturating_sub(1);
                if let Some(width) = indent {
                    if matches!(previous, Some(XmlEvent::EndElement { .. })) {
                        newline(&mut out, width, depth);
                    }
                }
                out.push_str("</");
                out.push_str(&name.to_lexical());
                out.push('>');
            }
            XmlEvent::Characters(text) => out.push_str(&escape(text.as_str())),
            XmlEvent::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
        previous = Some(event);
    }

    out
}

fn newline(out: &mut String, width: usize, depth: usize) {
    out.push('\n');
    out.extend(std::iter::repeat_n(' ', width * depth));
}
