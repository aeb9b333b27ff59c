//! The codec tree.
//!
//! Every node knows how to move one value between the object model and its
//! XML representation, over a token stream and over a retained document. The
//! variants form a closed set; composite ones hold their children behind
//! [`Arc`] so subtrees are shared freely.

mod aggregate;
mod leaf;
mod map;
mod recursive;
mod union;
mod wrapper;

use std::sync::Arc;

pub use aggregate::{AggregateCodec, CollectionKind, Container};
pub use leaf::{EnumType, LeafCodec, LeafKind};
pub use map::MapPairCodec;
pub use recursive::{RecursiveCodec, Target};
pub use union::{UnionBuilder, UnionCodec};
pub use wrapper::WrapperCodec;

use crate::skeleton::TypeResolver;
use crate::stream::{self, XmlReader, XmlWriter};
use crate::tree::{Binder, NodeCursor, NodeId};
use crate::{QName, Result, Value};

/// Shared state for one marshal or unmarshal call.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    resolver: &'a dyn TypeResolver,
}

impl<'a> Context<'a> {
    pub fn new(resolver: &'a dyn TypeResolver) -> Context<'a> {
        Context { resolver }
    }

    #[inline(always)]
    pub fn resolver(&self) -> &'a dyn TypeResolver {
        self.resolver
    }
}

/// How many values of a property can appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Optional,
    Many,
}

#[derive(Debug)]
pub enum Codec {
    Leaf(LeafCodec),
    Aggregate(AggregateCodec),
    Union(UnionCodec),
    Wrapper(WrapperCodec),
    Recursive(RecursiveCodec),
    MapPair(MapPairCodec),
}

impl Codec {
    /// Decode one value. The reader is on the value's start tag and is left on
    /// the next significant token after it.
    ///
    /// `previous` is what was decoded for the same property so far. Aggregates
    /// and maps extend it.
    pub fn decode(
        &self,
        cx: &Context<'_>,
        r: &mut dyn XmlReader,
        previous: Value,
    ) -> Result<Value> {
        match self {
            Codec::Leaf(c) => c.read(r),
            Codec::Aggregate(c) => c.decode(cx, r, previous),
            Codec::Union(c) => c.decode(cx, r, previous),
            Codec::Wrapper(c) => c.decode(cx, r, previous),
            Codec::Recursive(c) => c.decode(cx, r, previous),
            Codec::MapPair(c) => c.decode(cx, r, previous),
        }
    }

    /// Encode `value` under the tag `name`. A null value writes nothing unless
    /// the codec is nillable.
    pub fn encode(
        &self,
        cx: &Context<'_>,
        w: &mut dyn XmlWriter,
        value: &Value,
        name: &QName,
    ) -> Result<()> {
        match self {
            Codec::Leaf(c) => c.write(w, value, name, None),
            Codec::Aggregate(c) => c.encode(cx, w, value, name),
            Codec::Union(c) => c.encode(cx, w, value),
            Codec::Wrapper(c) => c.encode(cx, w, value, name),
            Codec::Recursive(c) => c.encode(cx, w, value, name),
            Codec::MapPair(c) => c.encode(cx, w, value, name),
        }
    }

    /// Read the value at `cursor` from a retained document and advance the
    /// cursor past it.
    pub fn bind_from(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        previous: Value,
    ) -> Result<Value> {
        match self {
            Codec::Leaf(c) => c.bind_from(b, cursor),
            Codec::Aggregate(c) => c.bind_from(b, cursor, previous),
            Codec::Union(c) => c.bind_from(b, cursor, previous),
            Codec::Wrapper(c) => c.bind_from(b, cursor, previous),
            Codec::Recursive(c) => c.bind_from(b, cursor, previous),
            Codec::MapPair(_) => Err(MapPairCodec::unsupported("bind_from")),
        }
    }

    /// Write `value` into a retained document at `cursor`, reusing the node
    /// there when its tag matches. Returns the last node written.
    pub fn bind_to(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        value: &Value,
        name: &QName,
    ) -> Result<Option<NodeId>> {
        match self {
            Codec::Leaf(c) => c.bind_to(b, cursor, value, name, None),
            Codec::Aggregate(c) => c.bind_to(b, cursor, value, name),
            Codec::Union(c) => c.bind_to(b, cursor, value),
            Codec::Wrapper(c) => c.bind_to(b, cursor, value, name),
            Codec::Recursive(c) => c.bind_to(b, cursor, value, name),
            Codec::MapPair(_) => Err(MapPairCodec::unsupported("bind_to")),
        }
    }

    /// The schema type name this codec produces.
    pub fn schema_type(&self) -> &QName {
        match self {
            Codec::Leaf(c) => c.schema_type(),
            Codec::Aggregate(c) => c.element().schema_type(),
            Codec::Union(c) => c.schema_type(),
            Codec::Wrapper(c) => c.child().schema_type(),
            Codec::Recursive(c) => c.schema_type(),
            Codec::MapPair(c) => c.schema_type(),
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Codec::Leaf(c) => c.is_nullable(),
            _ => true,
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            Codec::Aggregate(_) | Codec::MapPair(_) => Cardinality::Many,
            Codec::Wrapper(c) => c.child().cardinality(),
            Codec::Leaf(c) if !c.is_nullable() => Cardinality::One,
            _ => Cardinality::Optional,
        }
    }

    /// Whether a child tagged `tag` belongs to a property that maps this codec
    /// to `name`.
    pub fn accepts(&self, tag: &QName, name: &QName) -> bool {
        match self {
            Codec::Union(c) => c.accepts(tag),
            Codec::Aggregate(c) if c.is_element_form() => c.element().accepts(tag, name),
            _ => tag == name,
        }
    }

    /// The value of an aggregate with no elements, `Null` for anything else.
    pub fn empty_value(&self) -> Value {
        match self {
            Codec::Aggregate(c) => c.empty(),
            _ => Value::Null,
        }
    }

    /// Decode a whole document, skipping anything before its first start tag.
    pub fn decode_document(&self, cx: &Context<'_>, r: &mut dyn XmlReader) -> Result<Value> {
        stream::skip_to_start(r)?;
        self.decode(cx, r, Value::Null)
    }
}

impl From<LeafCodec> for Codec {
    fn from(codec: LeafCodec) -> Self {
        Codec::Leaf(codec)
    }
}

impl From<AggregateCodec> for Codec {
    fn from(codec: AggregateCodec) -> Self {
        Codec::Aggregate(codec)
    }
}

impl From<UnionCodec> for Codec {
    fn from(codec: UnionCodec) -> Self {
        Codec::Union(codec)
    }
}

impl From<WrapperCodec> for Codec {
    fn from(codec: WrapperCodec) -> Self {
        Codec::Wrapper(codec)
    }
}

impl From<RecursiveCodec> for Codec {
    fn from(codec: RecursiveCodec) -> Self {
        Codec::Recursive(codec)
    }
}

impl From<MapPairCodec> for Codec {
    fn from(codec: MapPairCodec) -> Self {
        Codec::MapPair(codec)
    }
}

pub(crate) fn shared(codec: impl Into<Codec>) -> Arc<Codec> {
    Arc::new(codec.into())
}
