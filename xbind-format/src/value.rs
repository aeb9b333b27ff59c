//! The dynamic object model codecs translate to and from.

use std::collections::BTreeMap;

use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat};

use crate::QName;
use crate::attachment::Attachment;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// The absent value.
    #[default]
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    /// Arbitrary precision integers, bounded to 128 bits.
    Integer(i128),
    /// Arbitrary precision decimal in canonical lexical form.
    Decimal(String),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Time(NaiveTime),
    Uri(String),
    QName(QName),
    Enum(EnumConstant),
    Image(Attachment),
    Data(Attachment),
    /// A transformable XML source, held as its serialized text.
    Source(String),
    /// A fixed size array. Grows by copy-and-extend, one slot at a time.
    Array(Box<[Value]>),
    List(Vec<Value>),
    Map(Map),
    Object(Object),
}

static NULL: Value = Value::Null;

impl Value {
    #[inline(always)]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The runtime type of this value, used for dispatch by type.
    pub fn type_name(&self) -> &str {
        use Value::*;

        match self {
            Null => "null",
            Bool(_) => "boolean",
            Byte(_) => "byte",
            Short(_) => "short",
            Int(_) => "int",
            Long(_) => "long",
            Float(_) => "float",
            Double(_) => "double",
            Char(_) => "char",
            Integer(_) => "integer",
            Decimal(_) => "decimal",
            String(_) => "string",
            Bytes(_) => "bytes",
            Date(_) => "date",
            DateTime(_) => "dateTime",
            Time(_) => "time",
            Uri(_) => "uri",
            QName(_) => "qname",
            Enum(e) => &e.type_name,
            Image(_) => "image",
            Data(_) => "dataHandler",
            Source(_) => "source",
            Array(_) => "array",
            List(_) => "list",
            Map(_) => "map",
            Object(o) => &o.type_name,
        }
    }

    /// Elements of an array or list, `None` for anything else.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Uri(s) | Value::Decimal(s) | Value::Source(s) => Some(s),
            _ => None,
        }
    }

    /// A JSON rendering, lossy for binary payloads.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        use serde_json::json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(v) => Json::Bool(*v),
            Value::Byte(v) => json!(v),
            Value::Short(v) => json!(v),
            Value::Int(v) => json!(v),
            Value::Long(v) => json!(v),
            Value::Float(v) => float_json(*v as f64),
            Value::Double(v) => float_json(*v),
            Value::Char(c) => Json::String(c.to_string()),
            Value::Integer(v) => match i64::try_from(*v) {
                Ok(small) => json!(small),
                Err(_) => Json::String(v.to_string()),
            },
            Value::Decimal(s) | Value::String(s) | Value::Uri(s) | Value::Source(s) => {
                Json::String(s.clone())
            }
            Value::Bytes(bytes) => {
                Json::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Time(t) => Json::String(t.format("%H:%M:%S%.f").to_string()),
            Value::QName(q) => Json::String(q.to_string()),
            Value::Enum(e) => Json::String(e.constant.clone()),
            Value::Image(a) | Value::Data(a) => json!({
                "contentType": a.content_type(),
                "length": a.data().len(),
            }),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Array(
                map.iter()
                    .map(|(k, v)| json!({ "key": k.to_json(), "value": v.to_json() }))
                    .collect(),
            ),
            Value::Object(obj) => {
                let mut out = serde_json::Map::new();
                out.insert("$type".into(), Json::String(obj.type_name.clone()));
                for (field, value) in obj.fields.iter() {
                    out.insert(field.clone(), value.to_json());
                }
                Json::Object(out)
            }
        }
    }
}

fn float_json(v: f64) -> serde_json::Value {
    match serde_json::Number::from_f64(v) {
        Some(n) => serde_json::Value::Number(n),
        None => serde_json::Value::String(v.to_string()),
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

/// A constant of a named enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    pub type_name: String,
    pub constant: String,
}

impl EnumConstant {
    pub fn new(type_name: impl Into<String>, constant: impl Into<String>) -> EnumConstant {
        EnumConstant {
            type_name: type_name.into(),
            constant: constant.into(),
        }
    }
}

/// An associative container that keeps insertion order.
///
/// Inserting a key that is already present replaces its value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Map {
    entries: Vec<(Value, Value)>,
}

impl Map {
    pub fn new() -> Map {
        Map::default()
    }

    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Value, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = Map::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// An instance of a named structured type.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Object {
        Object {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    #[inline(always)]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The field value, `Value::Null` when unset.
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        let field = field.into();
        if value.is_null() {
            self.fields.remove(&field);
        } else {
            self.fields.insert(field, value);
        }
    }

    pub fn take(&mut self, field: &str) -> Value {
        self.fields.remove(field).unwrap_or_default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Object {
        self.set(field, value.into());
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}
