//! Typed codecs between a dynamic object model and XML, over event streams
//! and over retained document trees.

pub mod attachment;
pub mod binding;
pub mod codec;
mod error;
pub mod namespace;
mod qname;
pub mod skeleton;
pub mod stream;
pub mod tree;
mod value;

pub use attachment::{Attachment, AttachmentCodec, BinaryKind, ImageFormat, RawAttachment, image_codec};
pub use binding::Binding;
pub use codec::{Codec, Context};
pub use error::{Error, ErrorKind, Result};
pub use qname::{QName, XML_NS, XMLNS_NS, XS_NS, XSI_NS};
pub use skeleton::{Registry, Skeleton, TypeCodec, TypeResolver};
pub use stream::{EventReader, EventWriter, XmlReader, XmlWriter};
pub use tree::{Binder, Document, NodeCursor, NodeId};
pub use value::{EnumConstant, Map, Object, Value};

/// Decode the document in `xml` with `codec`.
pub fn from_str(codec: &Codec, cx: &Context<'_>, xml: &str) -> Result<Value> {
    let mut reader = EventReader::from_str(xml)?;
    codec.decode_document(cx, &mut reader)
}

/// Encode `value` as a document whose root element is `name`.
pub fn to_string(
    codec: &Codec,
    cx: &Context<'_>,
    value: &Value,
    name: &QName,
    indent: Option<usize>,
) -> Result<String> {
    let mut writer = EventWriter::new();
    codec.encode(cx, &mut writer, value, name)?;
    writer.to_xml(indent)
}
