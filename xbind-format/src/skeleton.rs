//! Structured types and the registry that resolves them by name.
//!
//! A [`Skeleton`] maps the fields of one named type onto attributes, child
//! elements or simple content. The codec tree refers to skeletons by name
//! through a [`TypeResolver`], so types can refer to themselves.

use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::{Codec, Context, LeafCodec, LeafKind};
use crate::namespace::{ReaderScope, WriterScope, write_type_attribute};
use crate::qname::XMLNS_NS;
use crate::stream::{self, EventKind, XmlReader, XmlWriter};
use crate::tree::{Binder, NodeCursor, NodeId, NodeNamespaces, NodeScope, is_instance_attribute};
use crate::value::Object;
use crate::{Error, QName, Result, Value};

/// The codec of a whole named type.
pub trait TypeCodec: Send + Sync + std::fmt::Debug {
    /// The schema type, as written in `xsi:type`.
    fn schema_type(&self) -> &QName;

    /// Read the element the reader is on.
    fn read(&self, cx: &Context<'_>, r: &mut dyn XmlReader, previous: Value) -> Result<Value>;

    /// Write `value` as an element tagged `name`.
    fn write(
        &self,
        cx: &Context<'_>,
        w: &mut dyn XmlWriter,
        value: &Value,
        name: &QName,
        xsi_type: Option<&QName>,
    ) -> Result<()>;

    fn bind_from(&self, b: &mut Binder<'_>, cursor: &mut NodeCursor, previous: Value)
    -> Result<Value>;

    fn bind_to(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        value: &Value,
        name: &QName,
        xsi_type: Option<&QName>,
    ) -> Result<Option<NodeId>>;
}

/// Looks up type codecs while a codec tree runs.
pub trait TypeResolver: Send + Sync {
    /// By runtime type name, e.g. `"Order"` or `"int"`.
    fn by_name(&self, type_name: &str) -> Option<Arc<dyn TypeCodec>>;

    /// By schema type, as found in `xsi:type`.
    fn by_schema_type(&self, schema_type: &QName) -> Option<Arc<dyn TypeCodec>>;

    /// By the global element a type is bound to.
    fn by_element(&self, element: &QName) -> Option<Arc<dyn TypeCodec>>;
}

#[derive(Debug, Clone)]
pub struct AttributeMapping {
    pub field: String,
    pub name: QName,
    pub leaf: LeafCodec,
}

#[derive(Debug, Clone)]
pub struct ElementMapping {
    pub field: String,
    pub name: QName,
    pub codec: Arc<Codec>,
}

#[derive(Debug, Clone)]
pub struct TextMapping {
    pub field: String,
    pub leaf: LeafCodec,
}

/// Field mappings of one structured type.
#[derive(Debug)]
pub struct Skeleton {
    type_name: String,
    schema_type: QName,
    element_name: Option<QName>,
    attributes: Vec<AttributeMapping>,
    elements: Vec<ElementMapping>,
    text: Option<TextMapping>,
}

pub struct SkeletonBuilder {
    skeleton: Skeleton,
}

impl SkeletonBuilder {
    /// Bind the type to a global element.
    pub fn element_name(mut self, name: QName) -> Self {
        self.skeleton.element_name = Some(name);
        self
    }

    pub fn attribute(mut self, field: impl Into<String>, name: QName, leaf: LeafCodec) -> Self {
        self.skeleton.attributes.push(AttributeMapping {
            field: field.into(),
            name,
            leaf,
        });
        self
    }

    pub fn element(mut self, field: impl Into<String>, name: QName, codec: Arc<Codec>) -> Self {
        self.skeleton.elements.push(ElementMapping {
            field: field.into(),
            name,
            codec,
        });
        self
    }

    /// Map a field onto the character content of the element.
    pub fn text(mut self, field: impl Into<String>, leaf: LeafCodec) -> Self {
        self.skeleton.text = Some(TextMapping {
            field: field.into(),
            leaf,
        });
        self
    }

    pub fn build(self) -> Result<Skeleton> {
        let skeleton = self.skeleton;
        if skeleton.text.is_some() && !skeleton.elements.is_empty() {
            return Err(Error::Definition(format!(
                "{} maps both character content and child elements",
                skeleton.type_name
            )));
        }
        for (i, a) in skeleton.attributes.iter().enumerate() {
            if skeleton.attributes[..i].iter().any(|b| b.name == a.name) {
                return Err(Error::Definition(format!(
                    "attribute {} is mapped twice in {}",
                    a.name, skeleton.type_name
                )));
            }
        }
        Ok(skeleton)
    }
}

impl Skeleton {
    pub fn builder(type_name: impl Into<String>, schema_type: QName) -> SkeletonBuilder {
        SkeletonBuilder {
            skeleton: Skeleton {
                type_name: type_name.into(),
                schema_type,
                element_name: None,
                attributes: Vec::new(),
                elements: Vec::new(),
                text: None,
            },
        }
    }

    #[inline(always)]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline(always)]
    pub fn element_name(&self) -> Option<&QName> {
        self.element_name.as_ref()
    }

    pub fn attributes(&self) -> &[AttributeMapping] {
        &self.attributes
    }

    pub fn elements(&self) -> &[ElementMapping] {
        &self.elements
    }

    fn element_mapping(&self, tag: &QName) -> Result<&ElementMapping> {
        self.elements
            .iter()
            .find(|m| m.codec.accepts(tag, &m.name))
            .ok_or_else(|| Error::UnknownChild {
                name: tag.clone(),
                type_name: self.type_name.clone(),
            })
    }

    fn attribute_mapping(&self, name: &QName) -> Result<&AttributeMapping> {
        self.attributes
            .iter()
            .find(|m| &m.name == name)
            .ok_or_else(|| Error::UnknownAttribute {
                name: name.clone(),
                type_name: self.type_name.clone(),
            })
    }

    fn start_object(&self, previous: Value) -> Object {
        match previous {
            Value::Object(obj) if obj.type_name() == self.type_name => obj,
            _ => Object::new(&self.type_name),
        }
    }

    fn object<'v>(&self, value: &'v Value) -> Result<&'v Object> {
        match value {
            Value::Object(obj) if obj.type_name() == self.type_name => Ok(obj),
            other => Err(Error::UnexpectedValue(other.type_name().to_string())),
        }
    }
}

fn is_bookkeeping(name: &QName) -> bool {
    is_instance_attribute(name) || name.namespace() == XMLNS_NS
}

impl TypeCodec for Skeleton {
    fn schema_type(&self) -> &QName {
        &self.schema_type
    }

    fn read(&self, cx: &Context<'_>, r: &mut dyn XmlReader, previous: Value) -> Result<Value> {
        let tag = stream::expect_start(r)?.clone();
        if stream::is_nil(r) {
            stream::skip_element(r)?;
            return Ok(Value::Null);
        }

        let mut obj = self.start_object(previous);
        for i in 0..r.attribute_count() {
            let (Some(name), Some(text)) = (r.attribute_name(i), r.attribute_value(i)) else {
                continue;
            };
            if is_bookkeeping(name) {
                continue;
            }
            let mapping = self.attribute_mapping(name)?;
            let value = mapping.leaf.decode_text(text, &ReaderScope(&*r))?;
            obj.set(&mapping.field, value);
        }

        if let Some(mapping) = &self.text {
            let text = stream::element_text(r)?;
            let value = mapping.leaf.decode_text(&text, &ReaderScope(&*r))?;
            obj.set(&mapping.field, value);
            stream::skip_to_tag(r)?;
            return Ok(Value::Object(obj));
        }

        let mut kind = stream::skip_to_tag(r)?;
        while kind == EventKind::StartElement {
            let child = r.name().cloned().unwrap_or_else(|| QName::local(""));
            let mapping = self.element_mapping(&child)?;
            let previous = obj.take(&mapping.field);
            let value = mapping.codec.decode(cx, r, previous)?;
            obj.set(&mapping.field, value);
            kind = r.event();
        }
        stream::finish_element(r)?;

        tracing::trace!(type_name = %self.type_name, %tag, "read object");
        Ok(Value::Object(obj))
    }

    fn write(
        &self,
        cx: &Context<'_>,
        w: &mut dyn XmlWriter,
        value: &Value,
        name: &QName,
        xsi_type: Option<&QName>,
    ) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let obj = self.object(value)?;

        w.write_start_element(name)?;
        if let Some(t) = xsi_type {
            write_type_attribute(w, t)?;
        }

        for mapping in &self.attributes {
            let value = obj.get(&mapping.field);
            if value.is_null() {
                continue;
            }
            let text = mapping.leaf.encode_text(value, &mut WriterScope(&mut *w))?;
            w.write_attribute(&mapping.name, &text)?;
        }

        if let Some(mapping) = &self.text {
            let value = obj.get(&mapping.field);
            if !value.is_null() {
                let text = mapping.leaf.encode_text(value, &mut WriterScope(&mut *w))?;
                w.write_characters(&text)?;
            }
        } else {
            for mapping in &self.elements {
                mapping
                    .codec
                    .encode(cx, w, obj.get(&mapping.field), &mapping.name)?;
            }
        }

        w.write_end_element()
    }

    fn bind_from(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        previous: Value,
    ) -> Result<Value> {
        let doc = b.document();
        let node = cursor.element(doc)?;
        if doc.is_nil(node) {
            cursor.advance(doc);
            return Ok(Value::Null);
        }

        let mut obj = self.start_object(previous);
        for attr in doc.attributes(node) {
            if is_bookkeeping(&attr.name) {
                continue;
            }
            let mapping = self.attribute_mapping(&attr.name)?;
            let value = mapping
                .leaf
                .decode_text(&attr.value, &NodeNamespaces::new(doc, node))?;
            obj.set(&mapping.field, value);
        }

        if let Some(mapping) = &self.text {
            let text = doc.text_content(node);
            let value = mapping
                .leaf
                .decode_text(&text, &NodeNamespaces::new(doc, node))?;
            obj.set(&mapping.field, value);
            cursor.advance(doc);
            return Ok(Value::Object(obj));
        }

        let mut inner = NodeCursor::children(doc, node);
        while let Some(child) = inner.current() {
            let tag = b
                .document()
                .name(child)
                .cloned()
                .ok_or_else(|| Error::UnexpectedEvent {
                    expected: "element",
                    found: "character data".to_string(),
                })?;
            let mapping = self.element_mapping(&tag)?;
            let previous = obj.take(&mapping.field);
            let value = mapping.codec.bind_from(b, &mut inner, previous)?;
            obj.set(&mapping.field, value);
        }
        cursor.advance(b.document());

        Ok(Value::Object(obj))
    }

    fn bind_to(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        value: &Value,
        name: &QName,
        xsi_type: Option<&QName>,
    ) -> Result<Option<NodeId>> {
        if value.is_null() {
            return Ok(None);
        }
        let obj = self.object(value)?;

        let node = b.claim(cursor, name)?;
        if let Some(t) = xsi_type {
            b.set_type_attribute(node, t)?;
        }
        b.document_mut().remove_attribute(node, &QName::xsi("nil"));

        for mapping in &self.attributes {
            let value = obj.get(&mapping.field);
            let doc = b.document_mut();
            if value.is_null() {
                doc.remove_attribute(node, &mapping.name);
                continue;
            }
            let text = mapping.leaf.encode_text(value, &mut NodeScope::new(doc, node))?;
            doc.set_attribute(node, &mapping.name, &text)?;
        }

        if let Some(mapping) = &self.text {
            let value = obj.get(&mapping.field);
            let doc = b.document_mut();
            let text = if value.is_null() {
                String::new()
            } else {
                mapping.leaf.encode_text(value, &mut NodeScope::new(doc, node))?
            };
            doc.set_text_content(node, &text);
            return Ok(Some(node));
        }

        let mut inner = NodeCursor::children(b.document(), node);
        for mapping in &self.elements {
            mapping
                .codec
                .bind_to(b, &mut inner, obj.get(&mapping.field), &mapping.name)?;

            // Surplus nodes of this field stay where they are.
            let doc = b.document();
            while let Some(tag) = inner.current().and_then(|n| doc.name(n)) {
                if !mapping.codec.accepts(tag, &mapping.name) {
                    break;
                }
                inner.advance(doc);
            }
        }
        Ok(Some(node))
    }
}

/// A leaf datatype registered as a type of its own, so open content can
/// carry scalars as `xsi:type="xs:int"`.
#[derive(Debug)]
pub struct LeafType {
    codec: LeafCodec,
}

impl LeafType {
    pub fn new(codec: LeafCodec) -> LeafType {
        LeafType { codec }
    }
}

impl TypeCodec for LeafType {
    fn schema_type(&self) -> &QName {
        self.codec.schema_type()
    }

    fn read(&self, _cx: &Context<'_>, r: &mut dyn XmlReader, _previous: Value) -> Result<Value> {
        self.codec.read(r)
    }

    fn write(
        &self,
        _cx: &Context<'_>,
        w: &mut dyn XmlWriter,
        value: &Value,
        name: &QName,
        xsi_type: Option<&QName>,
    ) -> Result<()> {
        self.codec.write(w, value, name, xsi_type)
    }

    fn bind_from(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        _previous: Value,
    ) -> Result<Value> {
        self.codec.bind_from(b, cursor)
    }

    fn bind_to(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        value: &Value,
        name: &QName,
        xsi_type: Option<&QName>,
    ) -> Result<Option<NodeId>> {
        self.codec.bind_to(b, cursor, value, name, xsi_type)
    }
}

/// Type codecs by runtime name, schema type and global element.
#[derive(Debug, Default)]
pub struct Registry {
    types: HashMap<String, Arc<dyn TypeCodec>>,
    schema_types: HashMap<QName, String>,
    elements: HashMap<QName, String>,
}

impl Registry {
    /// A registry holding every built in leaf datatype.
    pub fn new() -> Registry {
        let mut registry = Registry::empty();
        for (name, kind) in LeafKind::builtins() {
            let codec: Arc<dyn TypeCodec> = Arc::new(LeafType::new(LeafCodec::new(kind)));
            registry
                .schema_types
                .entry(codec.schema_type().clone())
                .or_insert_with(|| name.to_string());
            registry.types.insert(name.to_string(), codec);
        }
        registry
    }

    pub fn empty() -> Registry {
        Registry::default()
    }

    /// Register `codec` under `type_name`, replacing any earlier registration.
    pub fn register(&mut self, type_name: impl Into<String>, codec: Arc<dyn TypeCodec>) -> &mut Self {
        let type_name = type_name.into();
        tracing::debug!(%type_name, schema_type = %codec.schema_type(), "registered type");
        self.schema_types
            .insert(codec.schema_type().clone(), type_name.clone());
        self.types.insert(type_name, codec);
        self
    }

    /// Register a structured type, and its global element if it has one.
    pub fn register_skeleton(&mut self, skeleton: Skeleton) -> &mut Self {
        let type_name = skeleton.type_name().to_string();
        if let Some(element) = skeleton.element_name() {
            self.elements.insert(element.clone(), type_name.clone());
        }
        self.register(type_name, Arc::new(skeleton))
    }

    /// Bind a global element to an already registered type.
    pub fn register_element(&mut self, element: QName, type_name: impl Into<String>) -> &mut Self {
        self.elements.insert(element, type_name.into());
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&Arc<dyn TypeCodec>> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// The type bound to a global element.
    pub fn element_type(&self, element: &QName) -> Option<&str> {
        self.elements.get(element).map(String::as_str)
    }

    /// Global elements, with the type each is bound to.
    pub fn elements(&self) -> impl Iterator<Item = (&QName, &str)> {
        self.elements.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn context(&self) -> Context<'_> {
        Context::new(self)
    }
}

impl TypeResolver for Registry {
    fn by_name(&self, type_name: &str) -> Option<Arc<dyn TypeCodec>> {
        self.types.get(type_name).cloned()
    }

    fn by_schema_type(&self, schema_type: &QName) -> Option<Arc<dyn TypeCodec>> {
        self.schema_types
            .get(schema_type)
            .and_then(|name| self.by_name(name))
    }

    fn by_element(&self, element: &QName) -> Option<Arc<dyn TypeCodec>> {
        self.elements
            .get(element)
            .and_then(|name| self.by_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::shared;
    use crate::stream::{EventReader, EventWriter};

    fn point() -> Skeleton {
        Skeleton::builder("Point", QName::new("urn:geo", "point"))
            .element_name(QName::new("urn:geo", "point"))
            .attribute("label", QName::local("label"), LeafCodec::new(LeafKind::String))
            .element("x", QName::new("urn:geo", "x"), shared(LeafCodec::new(LeafKind::Int).required()))
            .element("y", QName::new("urn:geo", "y"), shared(LeafCodec::new(LeafKind::Int).required()))
            .build()
            .unwrap()
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_skeleton(point());
        registry
    }

    fn read(xml: &str) -> Result<Value> {
        let registry = registry();
        let codec = registry.get("Point").unwrap().clone();
        let mut r = EventReader::from_str(xml)?;
        codec.read(&registry.context(), &mut r, Value::Null)
    }

    #[test]
    fn test_read_and_write() {
        let value = read(r#"<point xmlns="urn:geo" label="origin"><x>0</x><y>-1</y></point>"#).unwrap();
        let expected = Object::new("Point")
            .with("label", "origin")
            .with("x", 0)
            .with("y", -1);
        assert_eq!(value, Value::Object(expected));

        let registry = registry();
        let codec = registry.get("Point").unwrap().clone();
        let mut w = EventWriter::new();
        codec
            .write(&registry.context(), &mut w, &value, &QName::new("urn:geo", "point"), None)
            .unwrap();
        assert_eq!(
            w.to_xml(None).unwrap(),
            r#"<point xmlns="urn:geo" label="origin"><x>0</x><y>-1</y></point>"#
        );
    }

    #[test]
    fn test_child_order_is_not_checked() {
        let value = read(r#"<point xmlns="urn:geo"><y>2</y><x>1</x></point>"#).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("x"), &Value::Int(1));
        assert_eq!(obj.get("y"), &Value::Int(2));
    }

    #[test]
    fn test_unknown_attribute_and_child() {
        let err = read(r#"<point xmlns="urn:geo" color="red"/>"#).unwrap_err();
        assert_eq!(err.to_string(), "Attribute color not found in Point");

        let err = read(r#"<point xmlns="urn:geo"><z>1</z></point>"#).unwrap_err();
        assert_eq!(err.to_string(), "Child <{urn:geo}z> not found in Point");
    }

    #[test]
    fn test_instance_attributes_are_skipped() {
        let xml = r#"<point xmlns="urn:geo" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="point"><x>1</x><y>1</y></point>"#;
        assert!(read(xml).is_ok());
    }

    #[test]
    fn test_text_and_elements_conflict() {
        let result = Skeleton::builder("Bad", QName::local("bad"))
            .text("value", LeafCodec::new(LeafKind::String))
            .element("x", QName::local("x"), shared(LeafCodec::new(LeafKind::Int)))
            .build();
        assert!(matches!(result, Err(Error::Definition(_))));
    }

    #[test]
    fn test_registry_lookups() {
        let registry = registry();
        assert!(registry.by_name("int").is_some());
        assert!(registry.by_schema_type(&QName::xs("int")).is_some());
        assert_eq!(
            registry
                .by_schema_type(&QName::xs("base64Binary"))
                .map(|c| c.schema_type().clone()),
            Some(QName::xs("base64Binary"))
        );
        assert!(registry.by_element(&QName::new("urn:geo", "point")).is_some());
        assert!(registry.by_element(&QName::local("point")).is_none());
    }
}
