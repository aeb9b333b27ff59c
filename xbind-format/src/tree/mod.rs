//! A retained, mutable XML document.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. Detached nodes stay in the arena so identities handed out
//! earlier never dangle.

mod binder;
mod cursor;

pub use binder::Binder;
pub use cursor::NodeCursor;

use crate::namespace::{NamespaceContext, PrefixScope};
use crate::qname::{XML_NS, XSI_NS};
use crate::stream::{self, Attribute, XmlEvent};
use crate::{Error, QName, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: QName,
    attributes: Vec<Attribute>,
    namespaces: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Node {
        Node {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    pub fn new() -> Document {
        Document {
            nodes: vec![Node::new(NodeKind::Document)],
        }
    }

    pub fn parse(xml: &str) -> Result<Document> {
        let mut doc = Document::new();
        let mut open = vec![doc.root()];

        for event in stream::parse_events(xml)? {
            let parent = *open.last().ok_or_else(|| Error::Xml("unbalanced document".into()))?;
            match event {
                XmlEvent::StartElement {
                    name,
                    attributes,
                    namespaces,
                } => {
                    let node = doc.push(NodeKind::Element(Element {
                        name,
                        attributes,
                        namespaces,
                    }));
                    doc.link_last(parent, node);
                    open.push(node);
                }
                XmlEvent::EndElement { .. } => {
                    open.pop();
                }
                XmlEvent::Characters(text) => {
                    let node = doc.push(NodeKind::Text(text));
                    doc.link_last(parent, node);
                }
                XmlEvent::Comment(text) => {
                    let node = doc.push(NodeKind::Comment(text));
                    doc.link_last(parent, node);
                }
            }
        }

        Ok(doc)
    }

    #[inline(always)]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The single top-level element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root()).find(|&n| self.is_element(n))
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(kind));
        NodeId(self.nodes.len() - 1)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id).kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element(element) => Ok(element),
            _ => Err(Error::UnexpectedEvent {
                expected: "element node",
                found: "non-element node".to_string(),
            }),
        }
    }

    #[inline(always)]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    #[inline(always)]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn name(&self, id: NodeId) -> Option<&QName> {
        self.element(id).map(|e| &e.name)
    }

    #[inline(always)]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[inline(always)]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    #[inline(always)]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.first_child(id), move |&n| self.next_sibling(n))
    }

    /// Child elements of `id`, in document order.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(move |&n| self.is_element(n))
    }

    // ========================================================================
    // STRUCTURE
    // ========================================================================

    pub fn create_element(&mut self, name: QName) -> NodeId {
        self.push(NodeKind::Element(Element {
            name,
            attributes: Vec::new(),
            namespaces: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    fn link_last(&mut self, parent: NodeId, child: NodeId) {
        let last = self.node(parent).last_child;
        {
            let node = self.node_mut(child);
            node.parent = Some(parent);
            node.prev_sibling = last;
            node.next_sibling = None;
        }
        match last {
            Some(last) => self.node_mut(last).next_sibling = Some(child),
            None => self.node_mut(parent).first_child = Some(child),
        }
        self.node_mut(parent).last_child = Some(child);
    }

    fn unlink(&mut self, child: NodeId) {
        let Node {
            parent,
            prev_sibling,
            next_sibling,
            ..
        } = *self.node(child);
        let Some(parent) = parent else {
            return;
        };

        match prev_sibling {
            Some(prev) => self.node_mut(prev).next_sibling = next_sibling,
            None => self.node_mut(parent).first_child = next_sibling,
        }
        match next_sibling {
            Some(next) => self.node_mut(next).prev_sibling = prev_sibling,
            None => self.node_mut(parent).last_child = prev_sibling,
        }

        let node = self.node_mut(child);
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut ancestor = Some(parent);
        while let Some(a) = ancestor {
            if a == child {
                return Err(Error::Definition(
                    "a node cannot be inserted below itself".into(),
                ));
            }
            ancestor = self.parent(a);
        }
        if child == self.root() {
            return Err(Error::Definition("the document node cannot be moved".into()));
        }
        Ok(())
    }

    /// Append `child` to `parent`, detaching it from wherever it was first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insert(parent, child)?;
        self.unlink(child);
        self.link_last(parent, child);
        Ok(())
    }

    /// Put `new` where `old` is. `old` ends up detached.
    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> Result<()> {
        if self.parent(old) != Some(parent) {
            return Err(Error::Definition("replaced node is not a child of parent".into()));
        }
        if new == old {
            return Ok(());
        }
        self.check_insert(parent, new)?;
        self.unlink(new);

        let Node {
            prev_sibling,
            next_sibling,
            ..
        } = *self.node(old);
        {
            let node = self.node_mut(new);
            node.parent = Some(parent);
            node.prev_sibling = prev_sibling;
            node.next_sibling = next_sibling;
        }
        match prev_sibling {
            Some(prev) => self.node_mut(prev).next_sibling = Some(new),
            None => self.node_mut(parent).first_child = Some(new),
        }
        match next_sibling {
            Some(next) => self.node_mut(next).prev_sibling = Some(new),
            None => self.node_mut(parent).last_child = Some(new),
        }

        let node = self.node_mut(old);
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(Error::Definition("removed node is not a child of parent".into()));
        }
        self.unlink(child);
        Ok(())
    }

    // ========================================================================
    // CONTENT
    // ========================================================================

    /// Concatenated character data of `id` and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(_) => {}
            _ => {
                for child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Replace the content of `id` with `text`. Leaves the node alone when the
    /// content already matches, and edits a lone text child in place.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if self.text_content(id) == text && self.child_elements(id).next().is_none() {
            return;
        }

        let children: Vec<_> = self.children(id).collect();
        if let [only] = children[..] {
            if let NodeKind::Text(existing) = &mut self.node_mut(only).kind {
                if text.is_empty() {
                    self.unlink(only);
                } else {
                    *existing = text.to_string();
                }
                return;
            }
        }

        for child in children {
            self.unlink(child);
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.link_last(id, node);
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map(|e| e.attributes.as_slice()).unwrap_or_default()
    }

    pub fn attribute(&self, id: NodeId, name: &QName) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Whether the element carries `xsi:nil="true"`.
    pub fn is_nil(&self, id: NodeId) -> bool {
        matches!(
            self.attribute(id, &QName::xsi("nil")).map(str::trim),
            Some("true") | Some("1")
        )
    }

    /// Set an attribute, declaring a prefix for its namespace if needed.
    pub fn set_attribute(&mut self, id: NodeId, name: &QName, value: &str) -> Result<()> {
        let written = if name.namespace().is_empty() {
            QName::local(name.local_part())
        } else {
            let namespace = name.namespace();
            let bound = self
                .lookup_prefix(id, namespace)
                .filter(|p| !p.is_empty())
                .map(str::to_string);
            let prefix = match bound {
                Some(prefix) => prefix,
                None => {
                    let prefix = match name.prefix() {
                        Some(p) if self.lookup_namespace_uri(id, p).is_none() => p.to_string(),
                        _ => (1..)
                            .map(|n| format!("ns{}", n))
                            .find(|p| self.lookup_namespace_uri(id, p).is_none())
                            .unwrap_or_else(|| "ns".to_string()),
                    };
                    self.declare_namespace(id, &prefix, namespace)?;
                    prefix
                }
            };
            QName::with_prefix(namespace, name.local_part(), prefix)
        };

        let element = self.element_mut(id)?;
        match element.attributes.iter_mut().find(|a| a.name == written) {
            Some(attr) if attr.value == value => {}
            Some(attr) => attr.value = value.to_string(),
            None => element.attributes.push(Attribute::new(written, value)),
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &QName) -> bool {
        match self.element_mut(id) {
            Ok(element) => {
                let before = element.attributes.len();
                element.attributes.retain(|a| &a.name != name);
                element.attributes.len() != before
            }
            Err(_) => false,
        }
    }

    // ========================================================================
    // NAMESPACES
    // ========================================================================

    pub fn namespaces(&self, id: NodeId) -> &[(String, String)] {
        self.element(id).map(|e| e.namespaces.as_slice()).unwrap_or_default()
    }

    pub fn declare_namespace(&mut self, id: NodeId, prefix: &str, namespace: &str) -> Result<()> {
        let element = self.element_mut(id)?;
        match element.namespaces.iter().find(|(p, _)| p == prefix) {
            Some((_, uri)) if uri == namespace => {}
            Some((_, uri)) => return Err(Error::prefix_conflict(prefix, uri, namespace)),
            None => element
                .namespaces
                .push((prefix.to_string(), namespace.to_string())),
        }
        Ok(())
    }

    /// The namespace bound to `prefix` at `id`.
    pub fn lookup_namespace_uri(&self, id: NodeId, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        let mut node = Some(id);
        while let Some(n) = node {
            if let Some((_, uri)) = self.namespaces(n).iter().find(|(p, _)| p == prefix) {
                return Some(uri);
            }
            node = self.parent(n);
        }
        None
    }

    /// A prefix bound to `namespace` at `id` that is not shadowed.
    pub fn lookup_prefix(&self, id: NodeId, namespace: &str) -> Option<&str> {
        let mut node = Some(id);
        while let Some(n) = node {
            for (prefix, uri) in self.namespaces(n) {
                if uri == namespace && self.lookup_namespace_uri(id, prefix) == Some(namespace) {
                    return Some(prefix);
                }
            }
            node = self.parent(n);
        }
        None
    }

    /// Declare whatever the element's own tag needs after it was moved or
    /// created under a new parent.
    pub fn ensure_namespaces(&mut self, id: NodeId) -> Result<()> {
        let Some(name) = self.name(id).cloned() else {
            return Ok(());
        };
        let prefix = name.prefix().unwrap_or_default();
        let bound = self.lookup_namespace_uri(id, prefix).unwrap_or_default();
        if bound != name.namespace() {
            self.declare_namespace(id, prefix, name.namespace())?;
        }
        Ok(())
    }

    // ========================================================================
    // SERIALIZATION
    // ========================================================================

    pub fn to_events(&self, id: NodeId) -> Vec<XmlEvent> {
        let mut events = Vec::new();
        self.collect_events(id, &mut events);
        events
    }

    fn collect_events(&self, id: NodeId, events: &mut Vec<XmlEvent>) {
        match &self.node(id).kind {
            NodeKind::Document => {
                for child in self.children(id) {
                    self.collect_events(child, events);
                }
            }
            NodeKind::Element(element) => {
                events.push(XmlEvent::StartElement {
                    name: element.name.clone(),
                    attributes: element.attributes.clone(),
                    namespaces: element.namespaces.clone(),
                });
                for child in self.children(id) {
                    self.collect_events(child, events);
                }
                events.push(XmlEvent::end(element.name.clone()));
            }
            NodeKind::Text(text) => events.push(XmlEvent::text(text.clone())),
            NodeKind::Comment(text) => events.push(XmlEvent::Comment(text.clone())),
        }
    }

    /// Serialize the whole document.
    pub fn to_xml(&self) -> String {
        stream::render(&self.to_events(self.root()), None)
    }
}

/// Namespace resolution at a node, for decoding.
pub(crate) struct NodeNamespaces<'a> {
    doc: &'a Document,
    node: NodeId,
}

impl<'a> NodeNamespaces<'a> {
    pub(crate) fn new(doc: &'a Document, node: NodeId) -> Self {
        NodeNamespaces { doc, node }
    }
}

impl NamespaceContext for NodeNamespaces<'_> {
    fn namespace_uri(&self, prefix: &str) -> Option<String> {
        self.doc
            .lookup_namespace_uri(self.node, prefix)
            .map(str::to_string)
    }
}

/// Prefix lookup and declaration at a node, for encoding.
pub(crate) struct NodeScope<'a> {
    doc: &'a mut Document,
    node: NodeId,
}

impl<'a> NodeScope<'a> {
    pub(crate) fn new(doc: &'a mut Document, node: NodeId) -> Self {
        NodeScope { doc, node }
    }
}

impl PrefixScope for NodeScope<'_> {
    fn bound_prefix(&self, namespace: &str) -> Option<String> {
        self.doc
            .lookup_prefix(self.node, namespace)
            .map(str::to_string)
    }

    fn bound_namespace(&self, prefix: &str) -> Option<String> {
        self.doc
            .lookup_namespace_uri(self.node, prefix)
            .map(str::to_string)
    }

    fn enclosing_prefix(&self) -> Option<String> {
        self.doc
            .name(self.node)
            .and_then(QName::prefix)
            .map(str::to_string)
    }

    fn declare(&mut self, prefix: &str, namespace: &str) -> Result<()> {
        self.doc.declare_namespace(self.node, prefix, namespace)
    }
}

/// Whether an attribute belongs to the instance namespace (`xsi:nil`,
/// `xsi:type`) rather than to the bound type.
pub(crate) fn is_instance_attribute(name: &QName) -> bool {
    name.namespace() == XSI_NS
}
