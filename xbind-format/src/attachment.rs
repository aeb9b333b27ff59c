//! Binary payloads, inline as base64 or out of band as attachments.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::codec::{LeafCodec, LeafKind};
use crate::{Error, Result, Value};

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_XML: &str = "text/xml";

/// A binary payload tagged with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    content_type: String,
    data: Vec<u8>,
}

impl Attachment {
    pub fn new(content_type: impl Into<String>, data: Vec<u8>) -> Attachment {
        Attachment {
            content_type: content_type.into(),
            data,
        }
    }

    #[inline(always)]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[inline(always)]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// An attachment as received out of band: MIME headers plus body.
#[derive(Debug, Clone, Default)]
pub struct RawAttachment {
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl RawAttachment {
    pub fn new(body: Vec<u8>) -> RawAttachment {
        RawAttachment {
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Header lookup, ignoring ASCII case of the header name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline(always)]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Side-channel contract of binary leaf codecs.
pub trait AttachmentCodec {
    /// MIME type the value is sent with.
    fn mime_type(&self, value: &Value) -> Result<String>;

    /// Write the raw payload of `value`.
    fn write_attachment(&self, value: &Value, out: &mut dyn Write) -> Result<()>;

    /// Rebuild a value from a received attachment.
    fn read_attachment(&self, raw: &RawAttachment) -> Result<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Wbmp,
}

impl ImageFormat {
    pub fn from_mime(mime: &str) -> Option<ImageFormat> {
        match mime {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/gif" => Some(ImageFormat::Gif),
            "image/bmp" => Some(ImageFormat::Bmp),
            "image/vnd.wap.wbmp" => Some(ImageFormat::Wbmp),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Wbmp => "image/vnd.wap.wbmp",
        }
    }

    /// Whether `data` starts with this format's signature.
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            ImageFormat::Png => data.starts_with(b"\x89PNG\r\n\x1a\n"),
            ImageFormat::Jpeg => data.starts_with(&[0xff, 0xd8, 0xff]),
            ImageFormat::Gif => data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a"),
            ImageFormat::Bmp => data.starts_with(b"BM"),
            // Type 0 header, then fixed header byte.
            ImageFormat::Wbmp => data.len() >= 4 && data[0] == 0 && data[1] == 0,
        }
    }
}

/// Binary leaf kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    /// Plain bytes.
    Bytes,
    Image(ImageFormat),
    /// Opaque data with a caller supplied content type.
    DataHandler,
    /// An XML document held as text.
    Source,
}

impl BinaryKind {
    pub fn runtime_type(&self) -> &'static str {
        match self {
            BinaryKind::Bytes => "bytes",
            BinaryKind::Image(_) => "image",
            BinaryKind::DataHandler => "dataHandler",
            BinaryKind::Source => "source",
        }
    }

    pub(crate) fn decode_inline(&self, text: &str) -> Result<Value> {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let data = STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| Error::invalid_lexical("base64Binary", text))?;
        self.from_bytes(data, None)
    }

    pub(crate) fn encode_inline(&self, value: &Value) -> Result<String> {
        Ok(STANDARD.encode(self.payload(value)?))
    }

    fn payload<'v>(&self, value: &'v Value) -> Result<&'v [u8]> {
        match (self, value) {
            (BinaryKind::Bytes, Value::Bytes(data)) => Ok(data),
            (BinaryKind::Image(_), Value::Image(image)) => Ok(image.data()),
            (BinaryKind::DataHandler, Value::Data(data)) => Ok(data.data()),
            (BinaryKind::Source, Value::Source(text)) => Ok(text.as_bytes()),
            (_, other) => Err(Error::UnexpectedValue(other.type_name().to_string())),
        }
    }

    fn from_bytes(&self, data: Vec<u8>, content_type: Option<&str>) -> Result<Value> {
        match self {
            BinaryKind::Bytes => Ok(Value::Bytes(data)),
            BinaryKind::Image(format) => {
                if !format.matches(&data) {
                    return Err(Error::InvalidPayload {
                        mime: format.mime().to_string(),
                    });
                }
                Ok(Value::Image(Attachment::new(format.mime(), data)))
            }
            BinaryKind::DataHandler => Ok(Value::Data(Attachment::new(
                content_type.unwrap_or(OCTET_STREAM),
                data,
            ))),
            BinaryKind::Source => String::from_utf8(data)
                .map(Value::Source)
                .map_err(|_| Error::InvalidPayload {
                    mime: TEXT_XML.to_string(),
                }),
        }
    }
}

impl AttachmentCodec for BinaryKind {
    fn mime_type(&self, value: &Value) -> Result<String> {
        self.payload(value)?;
        Ok(match (self, value) {
            (BinaryKind::Image(format), _) => format.mime().to_string(),
            (BinaryKind::DataHandler, Value::Data(data)) => data.content_type().to_string(),
            (BinaryKind::Source, _) => TEXT_XML.to_string(),
            _ => OCTET_STREAM.to_string(),
        })
    }

    fn write_attachment(&self, value: &Value, out: &mut dyn Write) -> Result<()> {
        out.write_all(self.payload(value)?)?;
        Ok(())
    }

    fn read_attachment(&self, raw: &RawAttachment) -> Result<Value> {
        self.from_bytes(raw.body().to_vec(), raw.header("content-type"))
    }
}

static IMAGE_CODECS: OnceLock<RwLock<HashMap<String, Arc<LeafCodec>>>> = OnceLock::new();

/// The image codec for `mime`, created on first use and shared afterwards.
///
/// Two threads racing on the same type may both build a codec; either may end
/// up cached and both are interchangeable.
pub fn image_codec(mime: &str) -> Result<Arc<LeafCodec>> {
    let codecs = IMAGE_CODECS.get_or_init(Default::default);
    let key = mime.trim().to_ascii_lowercase();

    if let Some(codec) = codecs
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(codec.clone());
    }

    let format = ImageFormat::from_mime(&key).ok_or_else(|| Error::UnknownMimeType(mime.to_string()))?;
    let codec = Arc::new(LeafCodec::new(LeafKind::Binary(BinaryKind::Image(format))));
    tracing::debug!(mime = %key, "created image codec");

    codecs
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key, codec.clone());
    Ok(codec)
}
