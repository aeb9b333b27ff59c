use std::sync::Arc;

use super::{Codec, Context, LeafCodec};
use crate::namespace::{ReaderScope, WriterScope};
use crate::stream::{self, XmlReader, XmlWriter};
use crate::tree::{Binder, NodeCursor, NodeId, NodeNamespaces, NodeScope};
use crate::{Error, QName, Result, Value};

/// Concrete collection behind a declared collection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// Keeps every element in document order.
    List,
    /// Keeps the first of equal elements, in document order. A decode step
    /// that reads a duplicate returns the set unchanged, so it does not grow
    /// by one element per call the way lists and arrays do.
    Set,
}

impl CollectionKind {
    /// Pick the implementation for a declared collection type. Abstract
    /// declarations map to a list or an insertion ordered set.
    pub fn infer(declared: &str) -> Result<CollectionKind> {
        match declared {
            "list" | "collection" | "iterable" | "vec" | "array-list" | "linked-list"
            | "queue" | "deque" => Ok(CollectionKind::List),
            "set" | "hash-set" | "linked-hash-set" => Ok(CollectionKind::Set),
            other => Err(Error::AbstractCollection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// A fixed size array.
    Array,
    Collection(CollectionKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    /// One element per item.
    Elements,
    /// One element holding all items as whitespace separated tokens.
    Tokens,
}

/// A repeated property, held as an array or a collection.
#[derive(Debug)]
pub struct AggregateCodec {
    element: Arc<Codec>,
    container: Container,
    form: Form,
}

impl AggregateCodec {
    pub fn new(element: Arc<Codec>, container: Container) -> AggregateCodec {
        AggregateCodec {
            element,
            container,
            form: Form::Elements,
        }
    }

    pub fn array(element: Arc<Codec>) -> AggregateCodec {
        AggregateCodec::new(element, Container::Array)
    }

    pub fn list(element: Arc<Codec>) -> AggregateCodec {
        AggregateCodec::new(element, Container::Collection(CollectionKind::List))
    }

    /// Items written as a list of tokens inside a single element. Only leaf
    /// items can be written this way.
    pub fn tokens(element: Arc<Codec>, container: Container) -> Result<AggregateCodec> {
        if !matches!(*element, Codec::Leaf(_)) {
            return Err(Error::Definition(
                "token lists can only hold leaf values".into(),
            ));
        }
        Ok(AggregateCodec {
            element,
            container,
            form: Form::Tokens,
        })
    }

    #[inline(always)]
    pub fn element(&self) -> &Arc<Codec> {
        &self.element
    }

    #[inline(always)]
    pub fn container(&self) -> Container {
        self.container
    }

    pub(crate) fn is_element_form(&self) -> bool {
        self.form == Form::Elements
    }

    fn token_leaf(&self) -> Result<&LeafCodec> {
        match self.element.as_ref() {
            Codec::Leaf(leaf) => Ok(leaf),
            _ => Err(Error::Definition("token lists can only hold leaf values".into())),
        }
    }

    /// An aggregate with no items.
    pub fn empty(&self) -> Value {
        match self.container {
            Container::Array => Value::Array(Box::new([])),
            Container::Collection(_) => Value::List(Vec::new()),
        }
    }

    /// Add `item` to what was decoded so far.
    ///
    /// Arrays grow by exactly one slot per item, copying the old contents.
    /// Collections are appended to in place. A set skips an item equal to
    /// one it already holds.
    pub fn accumulate(&self, previous: Value, item: Value) -> Result<Value> {
        match (self.container, previous) {
            (Container::Array, Value::Null) => Ok(Value::Array(Box::new([item]))),
            (Container::Array, Value::Array(items)) => {
                let mut grown = Vec::with_capacity(items.len() + 1);
                grown.extend(items.into_vec());
                grown.push(item);
                tracing::debug!(len = grown.len(), "grew array");
                Ok(Value::Array(grown.into_boxed_slice()))
            }
            (Container::Collection(kind), Value::Null) => {
                let mut items = Vec::new();
                push(kind, &mut items, item);
                Ok(Value::List(items))
            }
            (Container::Collection(kind), Value::List(mut items)) => {
                push(kind, &mut items, item);
                Ok(Value::List(items))
            }
            (_, other) => Err(Error::UnexpectedValue(other.type_name().to_string())),
        }
    }

    pub fn decode(&self, cx: &Context<'_>, r: &mut dyn XmlReader, previous: Value) -> Result<Value> {
        match self.form {
            Form::Elements => {
                let item = self.element.decode(cx, r, Value::Null)?;
                self.accumulate(previous, item)
            }
            Form::Tokens => {
                let leaf = self.token_leaf()?;
                if stream::is_nil(r) {
                    stream::skip_element(r)?;
                    return Ok(previous);
                }

                let text = stream::element_text(r)?;
                let mut value = if previous.is_null() { self.empty() } else { previous };
                for token in text.split_ascii_whitespace() {
                    let item = leaf.decode_text(token, &ReaderScope(&*r))?;
                    value = self.accumulate(value, item)?;
                }
                stream::skip_to_tag(r)?;
                Ok(value)
            }
        }
    }

    fn items<'v>(&self, value: &'v Value) -> Result<&'v [Value]> {
        value
            .as_slice()
            .ok_or_else(|| Error::UnexpectedValue(value.type_name().to_string()))
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
        let items = self.items(value)?;

        match self.form {
            Form::Elements => {
                for item in items {
                    self.element.encode(cx, w, item, name)?;
                }
                Ok(())
            }
            Form::Tokens => {
                let leaf = self.token_leaf()?;
                w.write_start_element(name)?;
                let mut tokens = Vec::with_capacity(items.len());
                for item in items {
                    tokens.push(leaf.encode_text(item, &mut WriterScope(&mut *w))?);
                }
                w.write_characters(&tokens.join(" "))?;
                w.write_end_element()
            }
        }
    }

    pub fn bind_from(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        previous: Value,
    ) -> Result<Value> {
        match self.form {
            Form::Elements => {
                let item = self.element.bind_from(b, cursor, Value::Null)?;
                self.accumulate(previous, item)
            }
            Form::Tokens => {
                let leaf = self.token_leaf()?;
                let doc = b.document();
                let node = cursor.element(doc)?;
                if doc.is_nil(node) {
                    cursor.advance(doc);
                    return Ok(previous);
                }

                let text = doc.text_content(node);
                let mut value = if previous.is_null() { self.empty() } else { previous };
                for token in text.split_ascii_whitespace() {
                    let item = leaf.decode_text(token, &NodeNamespaces::new(doc, node))?;
                    value = self.accumulate(value, item)?;
                }
                cursor.advance(doc);
                Ok(value)
            }
        }
    }

    /// Write each item over successive sibling nodes. Nodes past the last item
    /// are left alone.
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
        let items = self.items(value)?;

        match self.form {
            Form::Elements => {
                let mut last = None;
                for item in items {
                    if let Some(node) = self.element.bind_to(b, cursor, item, name)? {
                        last = Some(node);
                    }
                }
                Ok(last)
            }
            Form::Tokens => {
                let leaf = self.token_leaf()?;
                let node = b.claim(cursor, name)?;
                let doc = b.document_mut();
                let mut tokens = Vec::with_capacity(items.len());
                for item in items {
                    tokens.push(leaf.encode_text(item, &mut NodeScope::new(doc, node))?);
                }
                doc.set_text_content(node, &tokens.join(" "));
                Ok(Some(node))
            }
        }
    }
}

fn push(kind: CollectionKind, items: &mut Vec<Value>, item: Value) {
    if kind == CollectionKind::Set && items.contains(&item) {
        return;
    }
    items.push(item);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::LeafKind;
    use crate::skeleton::Registry;
    use crate::stream::{EventReader, EventWriter, XmlReader};

    fn int_leaf() -> Arc<Codec> {
        Arc::new(Codec::Leaf(LeafCodec::new(LeafKind::Int)))
    }

    fn decode_all(codec: &AggregateCodec, xml: &str) -> Result<Value> {
        let registry = Registry::new();
        let cx = Context::new(&registry);
        let mut r = EventReader::from_str(xml)?;
        stream::skip_to_tag(&mut r)?;

        let mut value = Value::Null;
        while r.event() == stream::EventKind::StartElement {
            value = codec.decode(&cx, &mut r, value)?;
        }
        Ok(value)
    }

    #[test]
    fn test_array_grows_one_slot_at_a_time() {
        let codec = AggregateCodec::array(int_leaf());
        let one = codec.accumulate(Value::Null, Value::Int(1)).unwrap();
        let two = codec.accumulate(one, Value::Int(2)).unwrap();
        match &two {
            Value::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_elements() {
        let codec = AggregateCodec::list(int_leaf());
        let value = decode_all(&codec, "<r><i>1</i><i>2</i><i>3</i></r>").unwrap();
        assert_eq!(
            value,
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_set_drops_duplicates() {
        let codec = AggregateCodec::new(int_leaf(), Container::Collection(CollectionKind::Set));
        let value = decode_all(&codec, "<r><i>1</i><i>2</i><i>1</i></r>").unwrap();
        assert_eq!(value, Value::List(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_set_step_with_duplicate_keeps_length() {
        let codec = AggregateCodec::new(int_leaf(), Container::Collection(CollectionKind::Set));
        let list = AggregateCodec::list(int_leaf());
        let previous = Value::List(vec![Value::Int(1)]);

        let value = codec.accumulate(previous.clone(), Value::Int(1)).unwrap();
        assert_eq!(value, previous);

        let value = list.accumulate(previous, Value::Int(1)).unwrap();
        assert_eq!(value.as_slice().map(<[Value]>::len), Some(2));
    }

    #[test]
    fn test_tokens_round_trip() {
        let codec = AggregateCodec::tokens(int_leaf(), Container::Array).unwrap();
        let registry = Registry::new();
        let cx = Context::new(&registry);

        let value = Value::Array(vec![Value::Int(1), Value::Int(2)].into_boxed_slice());
        let mut w = EventWriter::new();
        codec.encode(&cx, &mut w, &value, &QName::local("ids")).unwrap();
        let xml = w.to_xml(None).unwrap();
        assert_eq!(xml, "<ids>1 2</ids>");

        let mut r = EventReader::from_str(" <ids> 1\n 2 </ids>").unwrap();
        stream::skip_to_start(&mut r).unwrap();
        assert_eq!(codec.decode(&cx, &mut r, Value::Null).unwrap(), value);
    }

    #[test]
    fn test_tokens_require_leaf() {
        let inner = Arc::new(Codec::Aggregate(AggregateCodec::list(int_leaf())));
        assert!(matches!(
            AggregateCodec::tokens(inner, Container::Array),
            Err(Error::Definition(_))
        ));
    }

    #[test]
    fn test_infer_collection() {
        assert_eq!(CollectionKind::infer("list").unwrap(), CollectionKind::List);
        assert_eq!(CollectionKind::infer("hash-set").unwrap(), CollectionKind::Set);
        assert!(matches!(
            CollectionKind::infer("sorted-map"),
            Err(Error::AbstractCollection(_))
        ));
    }

    #[test]
    fn test_encode_rejects_non_sequences() {
        let codec = AggregateCodec::list(int_leaf());
        let registry = Registry::new();
        let cx = Context::new(&registry);
        let mut w = EventWriter::new();
        assert!(matches!(
            codec.encode(&cx, &mut w, &Value::Int(1), &QName::local("i")),
            Err(Error::UnexpectedValue(_))
        ));
    }
}
