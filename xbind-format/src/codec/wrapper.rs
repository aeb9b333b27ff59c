use std::sync::Arc;

use super::{Codec, Context};
use crate::stream::{self, EventKind, XmlReader, XmlWriter};
use crate::tree::{Binder, NodeCursor, NodeId};
use crate::{Error, QName, Result, Value};

/// An extra element around a repeated property, e.g.
/// `<items><item/><item/></items>`.
#[derive(Debug)]
pub struct WrapperCodec {
    inner_name: QName,
    child: Arc<Codec>,
    nillable: bool,
}

impl WrapperCodec {
    /// Wrap `child`, whose items are tagged `inner_name`.
    pub fn new(inner_name: QName, child: Arc<Codec>) -> WrapperCodec {
        WrapperCodec {
            inner_name,
            child,
            nillable: false,
        }
    }

    /// A null value is written as a wrapper marked `xsi:nil`.
    pub fn nillable(mut self, nillable: bool) -> Self {
        self.nillable = nillable;
        self
    }

    #[inline(always)]
    pub fn child(&self) -> &Arc<Codec> {
        &self.child
    }

    #[inline(always)]
    pub fn inner_name(&self) -> &QName {
        &self.inner_name
    }

    pub fn decode(&self, cx: &Context<'_>, r: &mut dyn XmlReader, previous: Value) -> Result<Value> {
        stream::expect_start(r)?;
        if self.nillable && stream::is_nil(r) {
            stream::skip_element(r)?;
            return Ok(Value::Null);
        }

        let mut value = previous;
        let mut kind = stream::skip_to_tag(r)?;
        while kind == EventKind::StartElement {
            let accepted = r
                .name()
                .is_some_and(|tag| self.child.accepts(tag, &self.inner_name));
            if !accepted {
                break;
            }
            value = self.child.decode(cx, r, value)?;
            kind = r.event();
        }
        stream::finish_element(r)?;

        if value.is_null() {
            value = self.child.empty_value();
        }
        Ok(value)
    }

    /// Write the wrapper and delegate its content to the child, which writes
    /// nothing for a null value.
    pub fn encode(
        &self,
        cx: &Context<'_>,
        w: &mut dyn XmlWriter,
        value: &Value,
        name: &QName,
    ) -> Result<()> {
        if value.is_null() && !self.nillable {
            return Ok(());
        }

        w.write_start_element(name)?;
        if value.is_null() {
            w.write_attribute(&QName::xsi("nil"), "true")?;
        }
        self.child.encode(cx, w, value, &self.inner_name)?;
        w.write_end_element()
    }

    pub fn bind_from(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        previous: Value,
    ) -> Result<Value> {
        let node = cursor.element(b.document())?;
        if self.nillable && b.document().is_nil(node) {
            cursor.advance(b.document());
            return Ok(Value::Null);
        }

        let mut inner = NodeCursor::children(b.document(), node);
        let mut value = previous;
        while let Some(child) = inner.current() {
            let tag = b
                .document()
                .name(child)
                .cloned()
                .ok_or_else(|| Error::UnexpectedEvent {
                    expected: "element",
                    found: "character data".to_string(),
                })?;
            if !self.child.accepts(&tag, &self.inner_name) {
                return Err(Error::UnexpectedElement(tag));
            }
            value = self.child.bind_from(b, &mut inner, value)?;
        }
        cursor.advance(b.document());

        if value.is_null() {
            value = self.child.empty_value();
        }
        Ok(value)
    }

    pub fn bind_to(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        value: &Value,
        name: &QName,
    ) -> Result<Option<NodeId>> {
        if value.is_null() && !self.nillable {
            return Ok(None);
        }

        let node = b.claim(cursor, name)?;
        let nil = QName::xsi("nil");
        if value.is_null() {
            b.document_mut().set_attribute(node, &nil, "true")?;
        } else {
            b.document_mut().remove_attribute(node, &nil);
        }

        let mut inner = NodeCursor::children(b.document(), node);
        self.child.bind_to(b, &mut inner, value, &self.inner_name)?;
        Ok(Some(node))
    }
}
