use super::{Document, NodeId, NodeKind};
use crate::{Error, Result};

/// A position among the children of one element, used to walk siblings in
/// lockstep with a value being bound.
///
/// Whitespace-only text and comments are never stopped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeCursor {
    parent: NodeId,
    current: Option<NodeId>,
}

impl NodeCursor {
    /// A cursor on the first significant child of `parent`.
    pub fn children(doc: &Document, parent: NodeId) -> NodeCursor {
        NodeCursor {
            parent,
            current: skip_ignorable(doc, doc.first_child(parent)),
        }
    }

    /// A cursor on `node` itself.
    pub fn at(doc: &Document, node: NodeId) -> Result<NodeCursor> {
        let parent = doc.parent(node).ok_or_else(|| {
            Error::Definition("cannot bind to a node that has no parent".into())
        })?;
        Ok(NodeCursor {
            parent,
            current: Some(node),
        })
    }

    /// A cursor past the last child of `parent`, where every write appends.
    pub fn end(parent: NodeId) -> NodeCursor {
        NodeCursor {
            parent,
            current: None,
        }
    }

    #[inline(always)]
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    #[inline(always)]
    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// The element under the cursor, or an error naming what is there instead.
    pub fn element(&self, doc: &Document) -> Result<NodeId> {
        match self.current {
            Some(node) if doc.is_element(node) => Ok(node),
            Some(_) => Err(Error::UnexpectedEvent {
                expected: "element",
                found: "character data".to_string(),
            }),
            None => Err(Error::UnexpectedEvent {
                expected: "element",
                found: "end of content".to_string(),
            }),
        }
    }

    pub fn advance(&mut self, doc: &Document) {
        self.current = self
            .current
            .and_then(|node| skip_ignorable(doc, doc.next_sibling(node)));
    }

    pub(crate) fn set_current(&mut self, node: Option<NodeId>) {
        self.current = node;
    }
}

fn skip_ignorable(doc: &Document, mut node: Option<NodeId>) -> Option<NodeId> {
    while let Some(n) = node {
        match doc.kind(n) {
            NodeKind::Comment(_) => {}
            NodeKind::Text(text) if text.trim().is_empty() => {}
            _ => return Some(n),
        }
        node = doc.next_sibling(n);
    }
    None
}
