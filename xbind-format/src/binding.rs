//! Codec trees described in JSON.
//!
//! ```json
//! {
//!   "namespace": "urn:shop",
//!   "enums": { "Status": { "values": ["OPEN", "CLOSED"] } },
//!   "types": {
//!     "Order": {
//!       "element": "order",
//!       "attributes": [{ "field": "id", "type": "long", "required": true }],
//!       "elements": [
//!         { "field": "status", "type": "Status" },
//!         { "field": "lines", "name": "line", "type": "Line", "repeated": "list", "wrapper": "lines" }
//!       ]
//!     },
//!     "Line": { "elements": [{ "field": "sku", "type": "string" }] }
//!   }
//! }
//! ```
//!
//! Every element and type name is qualified with `namespace`. Attributes are
//! unqualified.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::attachment::image_codec;
use crate::codec::{
    AggregateCodec, Codec, CollectionKind, Container, EnumType, LeafCodec, LeafKind, MapPairCodec,
    RecursiveCodec, UnionCodec, WrapperCodec, shared,
};
use crate::skeleton::{LeafType, Registry, Skeleton};
use crate::{Error, QName, Result};

/// Type name that maps a property onto any registered type.
pub const ANY_TYPE: &str = "any";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Binding {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub enums: BTreeMap<String, EnumBinding>,
    #[serde(default)]
    pub types: BTreeMap<String, TypeBinding>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EnumBinding {
    pub values: Vec<String>,
    /// Lexical forms differing from the constant name.
    #[serde(default)]
    pub lexical: BTreeMap<String, String>,
    #[serde(default)]
    pub schema_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TypeBinding {
    /// Global element the type is bound to.
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub schema_type: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeBinding>,
    #[serde(default)]
    pub elements: Vec<ElementBinding>,
    /// Field holding the character content, for simple content types.
    #[serde(default)]
    pub text: Option<TextBinding>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AttributeBinding {
    pub field: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextBinding {
    pub field: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ElementBinding {
    pub field: String,
    /// Element tag, the field name when absent.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub nillable: bool,
    /// `array` or a collection type such as `list` or `set`.
    #[serde(default)]
    pub repeated: Option<String>,
    /// Write repeated values as a token list inside one element.
    #[serde(default)]
    pub tokens: bool,
    #[serde(default)]
    pub wrapper: Option<String>,
    #[serde(default)]
    pub wrapper_nillable: bool,
    #[serde(default)]
    pub choice: Vec<ChoiceBinding>,
    #[serde(default)]
    pub map: Option<MapBinding>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChoiceBinding {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MapBinding {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub key_name: Option<String>,
    #[serde(default)]
    pub value_name: Option<String>,
}

impl Binding {
    pub fn from_json(text: &str) -> Result<Binding> {
        serde_json::from_str(text).map_err(|e| Error::Definition(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Binding> {
        let text = std::fs::read_to_string(path)?;
        Binding::from_json(&text)
    }

    fn qname(&self, local: &str) -> QName {
        QName::new(&self.namespace, local)
    }

    pub fn schema_type(&self, type_name: &str) -> QName {
        let local = self
            .types
            .get(type_name)
            .and_then(|t| t.schema_type.as_deref())
            .unwrap_or(type_name);
        self.qname(local)
    }

    /// Global element of a structured type.
    pub fn root_element(&self, type_name: &str) -> Option<QName> {
        self.types
            .get(type_name)
            .and_then(|t| t.element.as_deref())
            .map(|el| self.qname(el))
    }

    /// The codec for a whole document: a named type, or whichever type is
    /// bound to the document's root element.
    pub fn root_codec(&self, root: Option<&str>) -> Result<Codec> {
        match root {
            Some(type_name) if self.types.contains_key(type_name) => Ok(Codec::Recursive(
                RecursiveCodec::named(type_name, self.schema_type(type_name)),
            )),
            Some(other) => Err(Error::Definition(format!("unknown type `{}`", other))),
            None => Ok(Codec::Recursive(RecursiveCodec::open())),
        }
    }

    fn enum_type(&self, name: &str, binding: &EnumBinding) -> EnumType {
        let schema = self.qname(binding.schema_type.as_deref().unwrap_or(name));
        binding
            .values
            .iter()
            .fold(EnumType::new(name, schema), |e, value| {
                let lexical = binding.lexical.get(value).unwrap_or(value);
                e.constant(value, lexical)
            })
    }

    fn leaf(&self, type_name: &str) -> Result<Option<LeafCodec>> {
        if let Some(binding) = self.enums.get(type_name) {
            let kind = LeafKind::Enum(self.enum_type(type_name, binding));
            return Ok(Some(LeafCodec::new(kind)));
        }
        if let Some(kind) = LeafKind::from_name(type_name) {
            return Ok(Some(LeafCodec::new(kind)));
        }
        if type_name.starts_with("image/") {
            return Ok(Some(image_codec(type_name)?.as_ref().clone()));
        }
        Ok(None)
    }

    fn simple_leaf(&self, owner: &str, field: &str, type_name: &str) -> Result<LeafCodec> {
        self.leaf(type_name)?.ok_or_else(|| {
            Error::Definition(format!(
                "{}.{} needs a simple type, found `{}`",
                owner, field, type_name
            ))
        })
    }

    fn value_codec(&self, type_name: &str, required: bool, nillable: bool) -> Result<Arc<Codec>> {
        if type_name == ANY_TYPE {
            return Ok(shared(RecursiveCodec::open()));
        }
        if let Some(mut leaf) = self.leaf(type_name)? {
            if required {
                leaf = leaf.required();
            }
            if nillable {
                leaf = leaf.nillable();
            }
            return Ok(shared(leaf));
        }
        if self.types.contains_key(type_name) {
            return Ok(shared(RecursiveCodec::named(
                type_name,
                self.schema_type(type_name),
            )));
        }
        Err(Error::Definition(format!("unknown type `{}`", type_name)))
    }

    fn runtime_type(&self, type_name: &str) -> Result<String> {
        if let Some(leaf) = self.leaf(type_name)? {
            return Ok(leaf.kind().runtime_type().to_string());
        }
        if self.types.contains_key(type_name) {
            return Ok(type_name.to_string());
        }
        Err(Error::Definition(format!(
            "choice alternatives need a concrete type, found `{}`",
            type_name
        )))
    }

    fn element_codec(&self, owner: &str, e: &ElementBinding) -> Result<(QName, Arc<Codec>)> {
        let name = self.qname(e.name.as_deref().unwrap_or(&e.field));

        let base = if !e.choice.is_empty() {
            let mut union = UnionCodec::builder();
            for choice in &e.choice {
                union = union.variant(
                    self.qname(&choice.name),
                    self.runtime_type(&choice.type_name)?,
                    self.value_codec(&choice.type_name, false, false)?,
                );
            }
            shared(union.build())
        } else if let Some(map) = &e.map {
            shared(MapPairCodec::with_names(
                self.qname(map.key_name.as_deref().unwrap_or("key")),
                self.value_codec(&map.key, false, false)?,
                self.qname(map.value_name.as_deref().unwrap_or("value")),
                self.value_codec(&map.value, false, false)?,
            ))
        } else {
            let type_name = e.type_name.as_deref().ok_or_else(|| {
                Error::Definition(format!("{}.{} has no type", owner, e.field))
            })?;
            self.value_codec(type_name, e.required, e.nillable)?
        };

        let codec = match e.repeated.as_deref() {
            None => base,
            Some(declared) => {
                let container = match declared {
                    "array" => Container::Array,
                    other => Container::Collection(CollectionKind::infer(other)?),
                };
                if e.tokens {
                    shared(AggregateCodec::tokens(base, container)?)
                } else {
                    shared(AggregateCodec::new(base, container))
                }
            }
        };

        match &e.wrapper {
            None => Ok((name, codec)),
            Some(wrapper) => Ok((
                self.qname(wrapper),
                shared(WrapperCodec::new(name, codec).nillable(e.wrapper_nillable)),
            )),
        }
    }

    /// Build every type and enumeration into a registry, on top of the built
    /// in datatypes. Fails on the first type that refers to something unknown.
    pub fn build(&self) -> Result<Registry> {
        let mut registry = Registry::new();

        for (name, binding) in &self.enums {
            let leaf = LeafCodec::new(LeafKind::Enum(self.enum_type(name, binding)));
            registry.register(name, Arc::new(LeafType::new(leaf)));
        }

        for (type_name, t) in &self.types {
            let mut builder = Skeleton::builder(type_name, self.schema_type(type_name));
            if let Some(element) = &t.element {
                builder = builder.element_name(self.qname(element));
            }

            for a in &t.attributes {
                let mut leaf = self.simple_leaf(type_name, &a.field, &a.type_name)?;
                if a.required {
                    leaf = leaf.required();
                }
                let name = QName::local(a.name.as_deref().unwrap_or(&a.field));
                builder = builder.attribute(&a.field, name, leaf);
            }

            if let Some(text) = &t.text {
                let leaf = self.simple_leaf(type_name, &text.field, &text.type_name)?;
                builder = builder.text(&text.field, leaf);
            }

            for e in &t.elements {
                let (name, codec) = self.element_codec(type_name, e)?;
                builder = builder.element(&e.field, name, codec);
            }

            registry.register_skeleton(builder.build()?);
        }

        tracing::debug!(
            types = self.types.len(),
            enums = self.enums.len(),
            "built binding"
        );
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = Binding::from_json(r#"{ "types": { "A": { "elemnts": [] } } }"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
    }

    #[test]
    fn test_unknown_type_reference() {
        let binding = Binding::from_json(
            r#"{ "types": { "A": { "elements": [{ "field": "b", "type": "B" }] } } }"#,
        )
        .unwrap();
        assert!(matches!(binding.build(), Err(Error::Definition(_))));
    }

    #[test]
    fn test_abstract_collection() {
        let binding = Binding::from_json(
            r#"{ "types": { "A": { "elements": [{ "field": "b", "type": "int", "repeated": "sorted-map" }] } } }"#,
        )
        .unwrap();
        assert!(matches!(binding.build(), Err(Error::AbstractCollection(_))));
    }

    #[test]
    fn test_unknown_image_type() {
        let binding = Binding::from_json(
            r#"{ "types": { "A": { "elements": [{ "field": "b", "type": "image/x-nope" }] } } }"#,
        )
        .unwrap();
        assert!(matches!(binding.build(), Err(Error::UnknownMimeType(_))));
    }

    #[test]
    fn test_attribute_needs_simple_type() {
        let binding = Binding::from_json(
            r#"{ "types": {
                "A": { "attributes": [{ "field": "b", "type": "B" }] },
                "B": {}
            } }"#,
        )
        .unwrap();
        assert!(matches!(binding.build(), Err(Error::Definition(_))));
    }

    #[test]
    fn test_build_registers_elements_and_enums() {
        let binding = Binding::from_json(
            r#"{
                "namespace": "urn:t",
                "enums": { "Color": { "values": ["RED"], "lexical": { "RED": "red" } } },
                "types": { "Box": { "element": "box", "elements": [{ "field": "color", "type": "Color" }] } }
            }"#,
        )
        .unwrap();
        let registry = binding.build().unwrap();
        assert!(registry.contains("Color"));
        assert_eq!(registry.element_type(&QName::new("urn:t", "box")), Some("Box"));
        assert_eq!(binding.root_element("Box"), Some(QName::new("urn:t", "box")));
    }
}
