use super::{Document, NodeCursor, NodeId, NodeScope};
use crate::codec::{Codec, Context};
use crate::namespace::qname_to_text;
use crate::{QName, Result, Value};

/// Binding state for one pass over a retained document.
///
/// Nodes that a pass had to replace are recorded as invalidated. They are
/// detached but still readable, so callers holding on to them can notice.
pub struct Binder<'a> {
    cx: Context<'a>,
    doc: &'a mut Document,
    invalidated: Vec<NodeId>,
}

impl<'a> Binder<'a> {
    pub fn new(cx: Context<'a>, doc: &'a mut Document) -> Binder<'a> {
        Binder {
            cx,
            doc,
            invalidated: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn context(&self) -> Context<'a> {
        self.cx
    }

    #[inline(always)]
    pub fn document(&self) -> &Document {
        &*self.doc
    }

    #[inline(always)]
    pub fn document_mut(&mut self) -> &mut Document {
        &mut *self.doc
    }

    pub fn invalidated(&self) -> &[NodeId] {
        &self.invalidated
    }

    pub(crate) fn invalidate(&mut self, node: NodeId) {
        self.invalidated.push(node);
    }

    /// Find or make the element for a value tagged `name` at `cursor`, then
    /// move the cursor past it.
    ///
    /// A node with the same tag is reused as is. Any other node is replaced in
    /// place by a fresh element and invalidated. Past the last child, a fresh
    /// element is appended.
    pub fn claim(&mut self, cursor: &mut NodeCursor, name: &QName) -> Result<NodeId> {
        let parent = cursor.parent();

        let node = match cursor.current() {
            Some(existing) if self.doc.name(existing) == Some(name) => existing,
            Some(existing) => {
                let node = self.doc.create_element(name.clone());
                self.doc.replace_child(parent, node, existing)?;
                self.doc.ensure_namespaces(node)?;
                self.invalidate(existing);
                tracing::debug!(?existing, ?node, %name, "replaced node");
                cursor.set_current(Some(node));
                node
            }
            None => {
                let node = self.doc.create_element(name.clone());
                self.doc.append_child(parent, node)?;
                self.doc.ensure_namespaces(node)?;
                tracing::trace!(?node, %name, "appended node");
                cursor.set_current(Some(node));
                node
            }
        };

        cursor.advance(&*self.doc);
        Ok(node)
    }

    /// Write `xsi:type` naming `type_name` on `node`.
    pub(crate) fn set_type_attribute(&mut self, node: NodeId, type_name: &QName) -> Result<()> {
        let text = qname_to_text(type_name, &mut NodeScope::new(&mut *self.doc, node))?;
        self.doc.set_attribute(node, &QName::xsi("type"), &text)
    }

    /// Read the value held by the element `node`.
    pub fn read(&mut self, codec: &Codec, node: NodeId) -> Result<Value> {
        let mut cursor = NodeCursor::at(&*self.doc, node)?;
        codec.bind_from(self, &mut cursor, Value::Null)
    }

    /// Update the element `node` from `value`, returning the element that
    /// holds it afterwards. That is `node` itself unless the tag changed.
    pub fn update(
        &mut self,
        codec: &Codec,
        node: NodeId,
        value: &Value,
        name: &QName,
    ) -> Result<Option<NodeId>> {
        let mut cursor = NodeCursor::at(&*self.doc, node)?;
        codec.bind_to(self, &mut cursor, value, name)
    }

    /// Append `value` as new content at the end of `parent`.
    pub fn append(
        &mut self,
        codec: &Codec,
        parent: NodeId,
        value: &Value,
        name: &QName,
    ) -> Result<Option<NodeId>> {
        let mut cursor = NodeCursor::end(parent);
        codec.bind_to(self, &mut cursor, value, name)
    }
}
