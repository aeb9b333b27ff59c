use std::collections::HashMap;
use std::sync::Arc;

use super::{Codec, Context};
use crate::stream::{self, XmlReader, XmlWriter};
use crate::tree::{Binder, NodeCursor, NodeId};
use crate::{Error, QName, Result, Value};

/// A property that holds one of several alternatives, told apart by tag when
/// reading and by runtime type when writing.
///
/// Both lookups are exact. A value whose type only derives from a registered
/// alternative is not matched.
#[derive(Debug)]
pub struct UnionCodec {
    by_tag: HashMap<QName, Arc<Codec>>,
    by_type: HashMap<String, (QName, Arc<Codec>)>,
    schema_type: QName,
}

#[derive(Debug, Default)]
pub struct UnionBuilder {
    by_tag: HashMap<QName, Arc<Codec>>,
    by_type: HashMap<String, (QName, Arc<Codec>)>,
}

impl UnionBuilder {
    /// Add an alternative written as `tag` for values of runtime type
    /// `type_name`.
    pub fn variant(mut self, tag: QName, type_name: impl Into<String>, codec: Arc<Codec>) -> Self {
        self.by_tag.insert(tag.clone(), codec.clone());
        self.by_type.insert(type_name.into(), (tag, codec));
        self
    }

    pub fn build(self) -> UnionCodec {
        UnionCodec {
            by_tag: self.by_tag,
            by_type: self.by_type,
            schema_type: QName::xs("anyType"),
        }
    }
}

impl UnionCodec {
    pub fn builder() -> UnionBuilder {
        UnionBuilder::default()
    }

    #[inline(always)]
    pub fn schema_type(&self) -> &QName {
        &self.schema_type
    }

    pub fn accepts(&self, tag: &QName) -> bool {
        self.by_tag.contains_key(tag)
    }

    fn for_tag(&self, tag: &QName) -> Result<&Arc<Codec>> {
        self.by_tag
            .get(tag)
            .ok_or_else(|| Error::UnexpectedElement(tag.clone()))
    }

    fn for_value(&self, value: &Value) -> Result<&(QName, Arc<Codec>)> {
        self.by_type
            .get(value.type_name())
            .ok_or_else(|| Error::UnexpectedValue(value.type_name().to_string()))
    }

    pub fn decode(&self, cx: &Context<'_>, r: &mut dyn XmlReader, previous: Value) -> Result<Value> {
        let tag = stream::expect_start(r)?.clone();
        let codec = self.for_tag(&tag)?;
        tracing::trace!(%tag, "decoding union alternative");
        codec.decode(cx, r, previous)
    }

    pub fn encode(&self, cx: &Context<'_>, w: &mut dyn XmlWriter, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let (tag, codec) = self.for_value(value)?;
        codec.encode(cx, w, value, tag)
    }

    pub fn bind_from(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        previous: Value,
    ) -> Result<Value> {
        let doc = b.document();
        let node = cursor.element(doc)?;
        let tag = doc.name(node).cloned().unwrap_or_else(|| QName::local(""));
        let codec = self.for_tag(&tag)?;
        codec.bind_from(b, cursor, previous)
    }

    pub fn bind_to(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        value: &Value,
    ) -> Result<Option<NodeId>> {
        if value.is_null() {
            return Ok(None);
        }
        let (tag, codec) = self.for_value(value)?;
        codec.bind_to(b, cursor, value, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LeafCodec, LeafKind};
    use crate::skeleton::Registry;
    use crate::stream::{EventReader, EventWriter};

    fn number_or_text() -> UnionCodec {
        UnionCodec::builder()
            .variant(
                QName::local("n"),
                "int",
                Arc::new(Codec::Leaf(LeafCodec::new(LeafKind::Int))),
            )
            .variant(
                QName::local("s"),
                "string",
                Arc::new(Codec::Leaf(LeafCodec::new(LeafKind::String))),
            )
            .build()
    }

    #[test]
    fn test_dispatch_by_tag() {
        let registry = Registry::new();
        let cx = Context::new(&registry);
        let codec = number_or_text();

        let mut r = EventReader::from_str("<s>x</s>").unwrap();
        assert_eq!(codec.decode(&cx, &mut r, Value::Null).unwrap(), Value::from("x"));

        let mut r = EventReader::from_str("<c/>").unwrap();
        let err = codec.decode(&cx, &mut r, Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected element <c>");
    }

    #[test]
    fn test_dispatch_by_type() {
        let registry = Registry::new();
        let cx = Context::new(&registry);
        let codec = number_or_text();

        let mut w = EventWriter::new();
        codec.encode(&cx, &mut w, &Value::Int(3)).unwrap();
        codec.encode(&cx, &mut w, &Value::Null).unwrap();
        assert_eq!(w.to_xml(None).unwrap(), "<n>3</n>");

        let mut w = EventWriter::new();
        assert!(matches!(
            codec.encode(&cx, &mut w, &Value::Long(3)),
            Err(Error::UnexpectedValue(t)) if t == "long"
        ));
    }
}
