use std::sync::Arc;

use super::Context;
use crate::namespace::{ReaderScope, text_to_qname};
use crate::skeleton::TypeCodec;
use crate::stream::{self, XmlReader, XmlWriter};
use crate::tree::{Binder, NodeCursor, NodeId, NodeNamespaces};
use crate::{Error, QName, Result, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A structured type looked up by name when first used, which lets types
    /// refer to themselves.
    Named(String),
    /// Any registered type. Reading picks it from `xsi:type` or the element
    /// name; writing picks it from the value and records `xsi:type`.
    Open,
}

/// Hands a value over to the codec of a structured type.
#[derive(Debug)]
pub struct RecursiveCodec {
    target: Target,
    schema_type: QName,
}

impl RecursiveCodec {
    pub fn named(type_name: impl Into<String>, schema_type: QName) -> RecursiveCodec {
        RecursiveCodec {
            target: Target::Named(type_name.into()),
            schema_type,
        }
    }

    pub fn open() -> RecursiveCodec {
        RecursiveCodec {
            target: Target::Open,
            schema_type: QName::xs("anyType"),
        }
    }

    #[inline(always)]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[inline(always)]
    pub fn schema_type(&self) -> &QName {
        &self.schema_type
    }

    fn named_codec(&self, cx: &Context<'_>, type_name: &str) -> Result<Arc<dyn TypeCodec>> {
        cx.resolver()
            .by_name(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))
    }

    /// Codec for a tag, given the `xsi:type` it carries if any.
    fn decoding_codec(
        &self,
        cx: &Context<'_>,
        tag: &QName,
        xsi_type: Option<QName>,
    ) -> Result<Arc<dyn TypeCodec>> {
        match (&self.target, xsi_type) {
            (Target::Named(type_name), _) => self.named_codec(cx, type_name),
            (Target::Open, Some(schema_type)) => cx
                .resolver()
                .by_schema_type(&schema_type)
                .ok_or_else(|| Error::UnknownType(schema_type.to_string())),
            (Target::Open, None) => cx
                .resolver()
                .by_element(tag)
                .ok_or_else(|| Error::UnexpectedElement(tag.clone())),
        }
    }

    /// Codec for a value, and the type to record on the element.
    fn encoding_codec(
        &self,
        cx: &Context<'_>,
        value: &Value,
    ) -> Result<(Arc<dyn TypeCodec>, bool)> {
        match &self.target {
            Target::Named(type_name) => Ok((self.named_codec(cx, type_name)?, false)),
            Target::Open => {
                let codec = cx
                    .resolver()
                    .by_name(value.type_name())
                    .ok_or_else(|| Error::UnexpectedValue(value.type_name().to_string()))?;
                Ok((codec, true))
            }
        }
    }

    pub fn decode(&self, cx: &Context<'_>, r: &mut dyn XmlReader, previous: Value) -> Result<Value> {
        let tag = stream::expect_start(r)?.clone();
        let xsi_type = match (&self.target, stream::attribute(r, &QName::xsi("type"))) {
            (Target::Open, Some(text)) => Some(text_to_qname(text, &ReaderScope(&*r))?),
            _ => None,
        };
        let codec = self.decoding_codec(cx, &tag, xsi_type)?;
        codec.read(cx, r, previous)
    }

    pub fn encode(
        &self,
        cx: &Context<'_>,
        w: &mut dyn XmlWriter,
        value: &Value,
        name: &QName,
    ) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let (codec, typed) = self.encoding_codec(cx, value)?;
        let xsi_type = typed.then(|| codec.schema_type().clone());
        codec.write(cx, w, value, name, xsi_type.as_ref())
    }

    pub fn bind_from(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        previous: Value,
    ) -> Result<Value> {
        let cx = b.context();
        let doc = b.document();
        let node = cursor.element(doc)?;
        let tag = doc.name(node).cloned().unwrap_or_else(|| QName::local(""));
        let xsi_type = match (&self.target, doc.attribute(node, &QName::xsi("type"))) {
            (Target::Open, Some(text)) => Some(text_to_qname(text, &NodeNamespaces::new(doc, node))?),
            _ => None,
        };
        let codec = self.decoding_codec(&cx, &tag, xsi_type)?;
        codec.bind_from(b, cursor, previous)
    }

    pub fn bind_to(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        value: &Value,
        name: &QName,
    ) -> Result<Option<NodeId>> {
        if value.is_null() {
            return Ok(None);
        }
        let cx = b.context();
        let (codec, typed) = self.encoding_codec(&cx, value)?;
        let xsi_type = typed.then(|| codec.schema_type().clone());
        codec.bind_to(b, cursor, value, name, xsi_type.as_ref())
    }
}
