use std::sync::Arc;

use super::{Codec, Context};
use crate::stream::{self, EventKind, XmlReader, XmlWriter};
use crate::value::Map;
use crate::{Error, QName, Result, Value};

/// An associative property written as alternating key and value elements
/// inside one element:
///
/// ```xml
/// <prices><key>apple</key><value>3</value><key>pear</key><value>5</value></prices>
/// ```
///
/// Retained documents are not supported.
#[derive(Debug)]
pub struct MapPairCodec {
    key_name: QName,
    key: Arc<Codec>,
    value_name: QName,
    value: Arc<Codec>,
    schema_type: QName,
}

impl MapPairCodec {
    pub fn new(key: Arc<Codec>, value: Arc<Codec>) -> MapPairCodec {
        MapPairCodec::with_names(QName::local("key"), key, QName::local("value"), value)
    }

    pub fn with_names(
        key_name: QName,
        key: Arc<Codec>,
        value_name: QName,
        value: Arc<Codec>,
    ) -> MapPairCodec {
        MapPairCodec {
            key_name,
            key,
            value_name,
            value,
            schema_type: QName::xs("anyType"),
        }
    }

    #[inline(always)]
    pub fn schema_type(&self) -> &QName {
        &self.schema_type
    }

    pub(crate) fn unsupported(operation: &'static str) -> Error {
        Error::Unsupported {
            codec: "map",
            operation,
        }
    }

    /// Read the map element the reader is on, pairing each key with the value
    /// element that follows it. Pairs go into `previous` when it is a map.
    ///
    /// Pairing stops at the first tag that is not a key. Whatever follows it
    /// inside the map element is skipped.
    pub fn decode(&self, cx: &Context<'_>, r: &mut dyn XmlReader, previous: Value) -> Result<Value> {
        stream::expect_start(r)?;
        let mut map = match previous {
            Value::Map(map) => map,
            _ => Map::new(),
        };

        let mut kind = stream::skip_to_tag(r)?;
        while kind == EventKind::StartElement {
            if r.name() != Some(&self.key_name) {
                break;
            }
            let key = self.key.decode(cx, r, Value::Null)?;

            let has_value = r.event() == EventKind::StartElement
                && r.name() == Some(&self.value_name);
            if !has_value {
                return Err(Error::KeyWithoutValue(self.key_name.clone()));
            }
            let value = self.value.decode(cx, r, Value::Null)?;

            map.insert(key, value);
            kind = r.event();
        }

        while kind == EventKind::StartElement {
            tracing::debug!(tag = ?r.name(), "skipping map content after last pair");
            stream::skip_element(r)?;
            kind = r.event();
        }
        stream::finish_element(r)?;

        Ok(Value::Map(map))
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
        let map = value
            .as_map()
            .ok_or_else(|| Error::UnexpectedValue(value.type_name().to_string()))?;

        w.write_start_element(name)?;
        for (k, v) in map.iter() {
            self.key.encode(cx, w, k, &self.key_name)?;
            self.value.encode(cx, w, v, &self.value_name)?;
        }
        w.write_end_element()
    }
}
