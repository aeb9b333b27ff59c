use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};

use crate::attachment::{AttachmentCodec, BinaryKind};
use crate::namespace::{
    NamespaceContext, PrefixScope, ReaderScope, WriterScope, qname_to_text, text_to_qname,
    write_type_attribute,
};
use crate::stream::{self, XmlReader, XmlWriter};
use crate::tree::{Binder, NodeCursor, NodeId, NodeNamespaces, NodeScope};
use crate::value::EnumConstant;
use crate::{Error, QName, Result, Value};

/// A named enumeration and the lexical form of each constant.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    type_name: String,
    schema_type: QName,
    constants: Vec<(String, String)>,
}

impl EnumType {
    pub fn new(type_name: impl Into<String>, schema_type: QName) -> EnumType {
        EnumType {
            type_name: type_name.into(),
            schema_type,
            constants: Vec::new(),
        }
    }

    /// Add a constant written as `lexical`.
    pub fn constant(mut self, constant: impl Into<String>, lexical: impl Into<String>) -> Self {
        self.constants.push((constant.into(), lexical.into()));
        self
    }

    #[inline(always)]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    fn parse(&self, text: &str) -> Result<Value> {
        self.constants
            .iter()
            .find(|(_, lexical)| lexical == text)
            .map(|(constant, _)| Value::Enum(EnumConstant::new(&self.type_name, constant)))
            .ok_or_else(|| Error::invalid_lexical("enumeration", text))
    }

    fn lexical(&self, constant: &EnumConstant) -> Result<&str> {
        if constant.type_name != self.type_name {
            return Err(Error::UnexpectedValue(constant.type_name.clone()));
        }
        self.constants
            .iter()
            .find(|(c, _)| *c == constant.constant)
            .map(|(_, lexical)| lexical.as_str())
            .ok_or_else(|| Error::UnexpectedValue(format!("{}.{}", self.type_name, constant.constant)))
    }
}

/// The scalar datatypes a leaf can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    /// A UTF-16 code unit, written as its number.
    Char,
    Integer,
    Decimal,
    String,
    /// A calendar date. A timezone suffix is accepted on input and dropped,
    /// output never carries one.
    Date,
    /// An instant with its offset. No timezone on input reads as UTC.
    DateTime,
    /// A wall clock time. A timezone suffix is dropped, as for dates.
    Time,
    Uri,
    QName,
    Enum(EnumType),
    Binary(BinaryKind),
}

static BUILTINS: &[(&str, LeafKind)] = &[
    ("boolean", LeafKind::Boolean),
    ("byte", LeafKind::Byte),
    ("short", LeafKind::Short),
    ("int", LeafKind::Int),
    ("long", LeafKind::Long),
    ("float", LeafKind::Float),
    ("double", LeafKind::Double),
    ("char", LeafKind::Char),
    ("integer", LeafKind::Integer),
    ("decimal", LeafKind::Decimal),
    ("string", LeafKind::String),
    ("bytes", LeafKind::Binary(BinaryKind::Bytes)),
    ("date", LeafKind::Date),
    ("dateTime", LeafKind::DateTime),
    ("time", LeafKind::Time),
    ("uri", LeafKind::Uri),
    ("qname", LeafKind::QName),
    ("dataHandler", LeafKind::Binary(BinaryKind::DataHandler)),
    ("source", LeafKind::Binary(BinaryKind::Source)),
];

impl LeafKind {
    /// Every built in kind with the runtime type name of its values.
    pub fn builtins() -> impl Iterator<Item = (&'static str, LeafKind)> {
        BUILTINS.iter().map(|(name, kind)| (*name, kind.clone()))
    }

    pub fn from_name(name: &str) -> Option<LeafKind> {
        BUILTINS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| kind.clone())
    }

    /// Runtime type name of values of this kind, see [`Value::type_name`].
    pub fn runtime_type(&self) -> &str {
        match self {
            LeafKind::Enum(e) => e.type_name(),
            LeafKind::Binary(b) => b.runtime_type(),
            other => BUILTINS
                .iter()
                .find(|(_, kind)| kind == other)
                .map(|(name, _)| *name)
                .unwrap_or("unknown"),
        }
    }

    pub fn schema_type(&self) -> QName {
        match self {
            LeafKind::Boolean => QName::xs("boolean"),
            LeafKind::Byte => QName::xs("byte"),
            LeafKind::Short => QName::xs("short"),
            LeafKind::Int => QName::xs("int"),
            LeafKind::Long => QName::xs("long"),
            LeafKind::Float => QName::xs("float"),
            LeafKind::Double => QName::xs("double"),
            LeafKind::Char => QName::xs("unsignedShort"),
            LeafKind::Integer => QName::xs("integer"),
            LeafKind::Decimal => QName::xs("decimal"),
            LeafKind::String => QName::xs("string"),
            LeafKind::Date => QName::xs("date"),
            LeafKind::DateTime => QName::xs("dateTime"),
            LeafKind::Time => QName::xs("time"),
            LeafKind::Uri => QName::xs("anyURI"),
            LeafKind::QName => QName::xs("QName"),
            LeafKind::Enum(e) => e.schema_type.clone(),
            LeafKind::Binary(_) => QName::xs("base64Binary"),
        }
    }

    /// Empty character data is a value of these kinds, not an absence.
    fn accepts_empty(&self) -> bool {
        matches!(
            self,
            LeafKind::String
                | LeafKind::Uri
                | LeafKind::Binary(BinaryKind::Bytes)
                | LeafKind::Binary(BinaryKind::DataHandler)
                | LeafKind::Binary(BinaryKind::Source)
        )
    }

    /// Value produced for an element marked nil.
    fn nil_default(&self) -> Value {
        match self {
            LeafKind::Boolean => Value::Bool(false),
            LeafKind::Byte => Value::Byte(0),
            LeafKind::Short => Value::Short(0),
            LeafKind::Int => Value::Int(0),
            LeafKind::Long => Value::Long(0),
            LeafKind::Float => Value::Float(0.0),
            LeafKind::Double => Value::Double(0.0),
            LeafKind::Char => Value::Char('\0'),
            LeafKind::Integer => Value::Integer(0),
            LeafKind::Decimal => Value::Decimal("0".to_string()),
            _ => Value::Null,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LeafKind::Boolean => "boolean",
            LeafKind::Byte => "byte",
            LeafKind::Short => "short",
            LeafKind::Int => "int",
            LeafKind::Long => "long",
            LeafKind::Float => "float",
            LeafKind::Double => "double",
            LeafKind::Char => "char",
            LeafKind::Integer => "integer",
            LeafKind::Decimal => "decimal",
            LeafKind::String => "string",
            LeafKind::Date => "date",
            LeafKind::DateTime => "dateTime",
            LeafKind::Time => "time",
            LeafKind::Uri => "anyURI",
            LeafKind::QName => "QName",
            LeafKind::Enum(_) => "enumeration",
            LeafKind::Binary(BinaryKind::Image(_)) => "image",
            LeafKind::Binary(_) => "base64Binary",
        }
    }
}

/// A codec for a single scalar carried as character data.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafCodec {
    kind: LeafKind,
    schema_type: QName,
    nullable: bool,
    nillable: bool,
}

impl LeafCodec {
    /// A nullable, non-nillable leaf.
    pub fn new(kind: LeafKind) -> LeafCodec {
        LeafCodec {
            schema_type: kind.schema_type(),
            kind,
            nullable: true,
            nillable: false,
        }
    }

    /// Values may never be null, as for primitive fields.
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Null values are written as `xsi:nil="true"` instead of being omitted.
    pub fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }

    #[inline(always)]
    pub fn kind(&self) -> &LeafKind {
        &self.kind
    }

    #[inline(always)]
    pub fn schema_type(&self) -> &QName {
        &self.schema_type
    }

    #[inline(always)]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[inline(always)]
    pub fn is_nillable(&self) -> bool {
        self.nillable
    }

    /// The attachment side channel, for binary kinds only.
    pub fn attachment(&self) -> Option<&dyn AttachmentCodec> {
        match &self.kind {
            LeafKind::Binary(kind) => Some(kind),
            _ => None,
        }
    }

    /// Parse character data.
    pub fn decode_text(&self, text: &str, ns: &dyn NamespaceContext) -> Result<Value> {
        let trimmed = text.trim();
        if trimmed.is_empty() && !self.kind.accepts_empty() {
            return if self.nullable {
                Ok(Value::Null)
            } else {
                Err(Error::MayNotBeNull(self.kind.label()))
            };
        }

        let label = self.kind.label();
        let invalid = || Error::invalid_lexical(label, text);

        Ok(match &self.kind {
            LeafKind::Boolean => match trimmed {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => return Err(invalid()),
            },
            LeafKind::Byte => Value::Byte(parse_int(trimmed).ok_or_else(invalid)?),
            LeafKind::Short => Value::Short(parse_int(trimmed).ok_or_else(invalid)?),
            LeafKind::Int => Value::Int(parse_int(trimmed).ok_or_else(invalid)?),
            LeafKind::Long => Value::Long(parse_int(trimmed).ok_or_else(invalid)?),
            LeafKind::Integer => Value::Integer(parse_int(trimmed).ok_or_else(invalid)?),
            LeafKind::Float => Value::Float(parse_float(trimmed).ok_or_else(invalid)?),
            LeafKind::Double => Value::Double(parse_float(trimmed).ok_or_else(invalid)?),
            LeafKind::Char => {
                let code: u16 = parse_int(trimmed).ok_or_else(invalid)?;
                Value::Char(char::from_u32(code as u32).ok_or_else(invalid)?)
            }
            LeafKind::Decimal => Value::Decimal(canonical_decimal(trimmed).ok_or_else(invalid)?),
            LeafKind::String => Value::String(text.to_string()),
            LeafKind::Date => Value::Date(
                NaiveDate::parse_from_str(strip_timezone(trimmed), "%Y-%m-%d")
                    .map_err(|_| invalid())?,
            ),
            LeafKind::DateTime => Value::DateTime(parse_datetime(trimmed).ok_or_else(invalid)?),
            LeafKind::Time => Value::Time(
                NaiveTime::parse_from_str(strip_timezone(trimmed), "%H:%M:%S%.f")
                    .map_err(|_| invalid())?,
            ),
            LeafKind::Uri => {
                if trimmed.chars().any(char::is_whitespace) {
                    return Err(invalid());
                }
                Value::Uri(trimmed.to_string())
            }
            LeafKind::QName => Value::QName(text_to_qname(trimmed, ns)?),
            LeafKind::Enum(e) => e.parse(trimmed)?,
            LeafKind::Binary(kind) => kind.decode_inline(text)?,
        })
    }

    /// Check that `value` is something this leaf can write.
    fn check(&self, value: &Value) -> Result<()> {
        let ok = match (&self.kind, value) {
            (_, Value::Null) => return Ok(()),
            (LeafKind::Boolean, Value::Bool(_))
            | (LeafKind::Byte, Value::Byte(_))
            | (LeafKind::Short, Value::Short(_))
            | (LeafKind::Int, Value::Int(_))
            | (LeafKind::Long, Value::Long(_))
            | (LeafKind::Float, Value::Float(_))
            | (LeafKind::Double, Value::Double(_))
            | (LeafKind::Char, Value::Char(_))
            | (LeafKind::Integer, Value::Integer(_))
            | (LeafKind::Decimal, Value::Decimal(_))
            | (LeafKind::String, Value::String(_))
            | (LeafKind::Date, Value::Date(_))
            | (LeafKind::DateTime, Value::DateTime(_))
            | (LeafKind::Time, Value::Time(_))
            | (LeafKind::Uri, Value::Uri(_))
            | (LeafKind::QName, Value::QName(_))
            | (LeafKind::Binary(BinaryKind::Bytes), Value::Bytes(_))
            | (LeafKind::Binary(BinaryKind::Image(_)), Value::Image(_))
            | (LeafKind::Binary(BinaryKind::DataHandler), Value::Data(_))
            | (LeafKind::Binary(BinaryKind::Source), Value::Source(_)) => true,
            (LeafKind::Enum(e), Value::Enum(c)) => c.type_name == e.type_name(),
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::UnexpectedValue(value.type_name().to_string()))
        }
    }

    /// Render `value` as character data. Qualified names may declare a prefix
    /// through `scope`.
    pub fn encode_text(&self, value: &Value, scope: &mut dyn PrefixScope) -> Result<String> {
        self.check(value)?;

        Ok(match (&self.kind, value) {
            (_, Value::Null) => return Err(Error::MayNotBeNull(self.kind.label())),
            (_, Value::Bool(v)) => v.to_string(),
            (_, Value::Byte(v)) => v.to_string(),
            (_, Value::Short(v)) => v.to_string(),
            (_, Value::Int(v)) => v.to_string(),
            (_, Value::Long(v)) => v.to_string(),
            (_, Value::Integer(v)) => v.to_string(),
            (_, Value::Float(v)) => format_float(*v),
            (_, Value::Double(v)) => format_float(*v),
            (_, Value::Char(c)) => {
                let code = *c as u32;
                if code > u16::MAX as u32 {
                    return Err(Error::UnexpectedValue(format!("char U+{:X}", code)));
                }
                code.to_string()
            }
            (_, Value::Decimal(s)) => {
                canonical_decimal(s).ok_or_else(|| Error::invalid_lexical("decimal", s))?
            }
            (_, Value::String(s)) => s.clone(),
            (_, Value::Date(d)) => d.format("%Y-%m-%d").to_string(),
            (_, Value::DateTime(dt)) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            (_, Value::Time(t)) => t.format("%H:%M:%S%.f").to_string(),
            (_, Value::Uri(s)) => s.clone(),
            (_, Value::QName(q)) => qname_to_text(q, scope)?,
            (LeafKind::Enum(e), Value::Enum(c)) => e.lexical(c)?.to_string(),
            (LeafKind::Binary(kind), other) => kind.encode_inline(other)?,
            (_, other) => return Err(Error::UnexpectedValue(other.type_name().to_string())),
        })
    }

    /// Read the element the reader is on.
    pub fn read(&self, r: &mut dyn XmlReader) -> Result<Value> {
        let nil = stream::is_nil(r);
        let text = stream::element_text(r)?;
        let value = if nil {
            self.kind.nil_default()
        } else {
            self.decode_text(&text, &ReaderScope(&*r))?
        };
        stream::skip_to_tag(r)?;
        Ok(value)
    }

    /// Write `value` as an element. `xsi_type` is added when the element's
    /// declared type differs from the value's.
    pub fn write(
        &self,
        w: &mut dyn XmlWriter,
        value: &Value,
        name: &QName,
        xsi_type: Option<&QName>,
    ) -> Result<()> {
        self.check(value)?;

        if value.is_null() {
            if self.nillable {
                w.write_start_element(name)?;
                if let Some(t) = xsi_type {
                    write_type_attribute(w, t)?;
                }
                w.write_attribute(&QName::xsi("nil"), "true")?;
                return w.write_end_element();
            }
            if !self.nullable {
                return Err(Error::MayNotBeNull(self.kind.label()));
            }
            return Ok(());
        }

        w.write_start_element(name)?;
        if let Some(t) = xsi_type {
            write_type_attribute(w, t)?;
        }
        let text = self.encode_text(value, &mut WriterScope(&mut *w))?;
        w.write_characters(&text)?;
        w.write_end_element()
    }

    pub fn bind_from(&self, b: &mut Binder<'_>, cursor: &mut NodeCursor) -> Result<Value> {
        let node = cursor.element(b.document())?;
        let doc = b.document();

        let value = if doc.is_nil(node) {
            self.kind.nil_default()
        } else {
            let text = doc.text_content(node);
            self.decode_text(&text, &NodeNamespaces::new(doc, node))?
        };
        cursor.advance(b.document());
        Ok(value)
    }

    pub fn bind_to(
        &self,
        b: &mut Binder<'_>,
        cursor: &mut NodeCursor,
        value: &Value,
        name: &QName,
        xsi_type: Option<&QName>,
    ) -> Result<Option<NodeId>> {
        self.check(value)?;
        if value.is_null() && !self.nillable {
            if !self.nullable {
                return Err(Error::MayNotBeNull(self.kind.label()));
            }
            return Ok(None);
        }

        let node = b.claim(cursor, name)?;
        if let Some(t) = xsi_type {
            b.set_type_attribute(node, t)?;
        }

        let nil = QName::xsi("nil");
        if value.is_null() {
            let doc = b.document_mut();
            doc.set_text_content(node, "");
            doc.set_attribute(node, &nil, "true")?;
            return Ok(Some(node));
        }

        let doc = b.document_mut();
        doc.remove_attribute(node, &nil);
        let text = self.encode_text(value, &mut NodeScope::new(doc, node))?;
        doc.set_text_content(node, &text);
        Ok(Some(node))
    }
}

fn parse_int<T: std::str::FromStr>(text: &str) -> Option<T> {
    text.strip_prefix('+').unwrap_or(text).parse().ok()
}

fn parse_float<T: std::str::FromStr + From<f32>>(text: &str) -> Option<T> {
    match text {
        "INF" | "+INF" => Some(T::from(f32::INFINITY)),
        "-INF" => Some(T::from(f32::NEG_INFINITY)),
        "NaN" => Some(T::from(f32::NAN)),
        _ if text.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) => None,
        _ => text.parse().ok(),
    }
}

fn format_float<T: Into<f64> + std::fmt::Debug + Copy>(v: T) -> String {
    let wide: f64 = v.into();
    if wide.is_nan() {
        "NaN".to_string()
    } else if wide == f64::INFINITY {
        "INF".to_string()
    } else if wide == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format!("{:?}", v)
    }
}

/// Normalize an `xs:decimal` lexical form: no sign for positives, no leading
/// zeros, no trailing fractional zeros.
fn canonical_decimal(text: &str) -> Option<String> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let int_part = int_part.trim_start_matches('0');
    let frac_part = frac_part.trim_end_matches('0');
    let int_part = if int_part.is_empty() { "0" } else { int_part };
    let zero = int_part == "0" && frac_part.is_empty();

    let mut out = String::new();
    if negative && !zero {
        out.push('-');
    }
    out.push_str(int_part);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    Some(out)
}

fn strip_timezone(text: &str) -> &str {
    if let Some(stripped) = text.strip_suffix('Z') {
        return stripped;
    }
    let bytes = text.as_bytes();
    let n = bytes.len();
    if n > 6 && matches!(bytes[n - 6], b'+' | b'-') && bytes[n - 3] == b':' {
        return &text[..n - 6];
    }
    text
}

/// `xs:dateTime`, with a missing timezone read as UTC.
fn parse_datetime(text: &str) -> Option<DateTime<chrono::FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::{Attachment, OCTET_STREAM};
    use crate::stream::{EventReader, EventWriter};

    struct NoNamespaces;

    impl NamespaceContext for NoNamespaces {
        fn namespace_uri(&self, _prefix: &str) -> Option<String> {
            None
        }
    }

    fn decode(codec: &LeafCodec, text: &str) -> Result<Value> {
        codec.decode_text(text, &NoNamespaces)
    }

    fn read(codec: &LeafCodec, xml: &str) -> Result<Value> {
        let mut r = EventReader::from_str(xml).unwrap();
        codec.read(&mut r)
    }

    fn write(codec: &LeafCodec, value: &Value) -> Result<String> {
        let mut w = EventWriter::new();
        codec.write(&mut w, value, &QName::local("v"), None)?;
        w.to_xml(None)
    }

    #[test]
    fn test_numbers() {
        let int = LeafCodec::new(LeafKind::Int);
        assert_eq!(decode(&int, " +42 ").unwrap(), Value::Int(42));
        assert!(matches!(
            decode(&int, "4x"),
            Err(Error::InvalidLexical { kind: "int", .. })
        ));
        assert!(decode(&LeafCodec::new(LeafKind::Byte), "200").is_err());

        let double = LeafCodec::new(LeafKind::Double);
        assert_eq!(decode(&double, "INF").unwrap(), Value::Double(f64::INFINITY));
        assert_eq!(decode(&double, "1.5e3").unwrap(), Value::Double(1500.0));
        assert!(decode(&double, "inf").is_err());
        assert_eq!(write(&double, &Value::Double(f64::NEG_INFINITY)).unwrap(), "<v>-INF</v>");
        assert_eq!(write(&double, &Value::Double(2.0)).unwrap(), "<v>2.0</v>");

        match decode(&LeafCodec::new(LeafKind::Float), "NaN").unwrap() {
            Value::Float(v) => assert!(v.is_nan()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_boolean() {
        let codec = LeafCodec::new(LeafKind::Boolean);
        assert_eq!(decode(&codec, "1").unwrap(), Value::Bool(true));
        assert_eq!(decode(&codec, "false").unwrap(), Value::Bool(false));
        assert!(decode(&codec, "yes").is_err());
    }

    #[test]
    fn test_char_is_numeric() {
        let codec = LeafCodec::new(LeafKind::Char);
        assert_eq!(decode(&codec, "65").unwrap(), Value::Char('A'));
        assert_eq!(write(&codec, &Value::Char('A')).unwrap(), "<v>65</v>");
        assert!(write(&codec, &Value::Char('\u{1F600}')).is_err());
    }

    #[test]
    fn test_decimal_canonical() {
        assert_eq!(canonical_decimal("+001.500").as_deref(), Some("1.5"));
        assert_eq!(canonical_decimal("-0.0").as_deref(), Some("0"));
        assert_eq!(canonical_decimal(".5").as_deref(), Some("0.5"));
        assert_eq!(canonical_decimal("1e3"), None);
        assert_eq!(canonical_decimal("."), None);
    }

    #[test]
    fn test_dates() {
        let date = LeafCodec::new(LeafKind::Date);
        let value = decode(&date, "2024-02-29Z").unwrap();
        assert_eq!(write(&date, &value).unwrap(), "<v>2024-02-29</v>");

        let datetime = LeafCodec::new(LeafKind::DateTime);
        let value = decode(&datetime, "2024-02-29T10:20:30").unwrap();
        assert_eq!(
            write(&datetime, &value).unwrap(),
            "<v>2024-02-29T10:20:30Z</v>"
        );
        let value = decode(&datetime, "2024-02-29T10:20:30.5+02:00").unwrap();
        assert_eq!(
            write(&datetime, &value).unwrap(),
            "<v>2024-02-29T10:20:30.500+02:00</v>"
        );

        let time = LeafCodec::new(LeafKind::Time);
        let value = decode(&time, "08:00:00").unwrap();
        assert_eq!(write(&time, &value).unwrap(), "<v>08:00:00</v>");
    }

    #[test]
    fn test_date_and_time_drop_offsets() {
        let date = LeafCodec::new(LeafKind::Date);
        assert_eq!(
            decode(&date, "2024-02-29+05:00").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert_eq!(decode(&date, "2024-02-29-11:30").unwrap(), decode(&date, "2024-02-29").unwrap());

        let time = LeafCodec::new(LeafKind::Time);
        let value = decode(&time, "08:15:00Z").unwrap();
        assert_eq!(value, Value::Time(NaiveTime::from_hms_opt(8, 15, 0).unwrap()));
        assert_eq!(write(&time, &value).unwrap(), "<v>08:15:00</v>");
    }

    #[test]
    fn test_empty_text() {
        let int = LeafCodec::new(LeafKind::Int);
        assert_eq!(read(&int, "<v/>").unwrap(), Value::Null);

        let required = LeafCodec::new(LeafKind::Int).required();
        assert!(matches!(read(&required, "<v> </v>"), Err(Error::MayNotBeNull("int"))));

        let string = LeafCodec::new(LeafKind::String);
        assert_eq!(read(&string, "<v/>").unwrap(), Value::String(String::new()));
    }

    #[test]
    fn test_nil_yields_zero_default() {
        let xml = r#"<v xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:nil="true"/>"#;
        assert_eq!(read(&LeafCodec::new(LeafKind::Int), xml).unwrap(), Value::Int(0));
        assert_eq!(
            read(&LeafCodec::new(LeafKind::Boolean), xml).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(read(&LeafCodec::new(LeafKind::String), xml).unwrap(), Value::Null);
    }

    #[test]
    fn test_write_null() {
        assert_eq!(write(&LeafCodec::new(LeafKind::Int), &Value::Null).unwrap(), "");
        assert_eq!(
            write(&LeafCodec::new(LeafKind::Int).nillable(), &Value::Null).unwrap(),
            r#"<v xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:nil="true"/>"#
        );
        assert!(matches!(
            write(&LeafCodec::new(LeafKind::Int).required(), &Value::Null),
            Err(Error::MayNotBeNull(_))
        ));
    }

    #[test]
    fn test_type_mismatch() {
        assert!(matches!(
            write(&LeafCodec::new(LeafKind::Int), &Value::Long(1)),
            Err(Error::UnexpectedValue(t)) if t == "long"
        ));
    }

    #[test]
    fn test_enum() {
        let color = EnumType::new("Color", QName::new("urn:t", "color"))
            .constant("RED", "red")
            .constant("DARK_BLUE", "dark-blue");
        let codec = LeafCodec::new(LeafKind::Enum(color));
        let value = decode(&codec, "dark-blue").unwrap();
        assert_eq!(value, Value::Enum(EnumConstant::new("Color", "DARK_BLUE")));
        assert_eq!(write(&codec, &value).unwrap(), "<v>dark-blue</v>");
        assert!(decode(&codec, "green").is_err());
    }

    #[test]
    fn test_qname_content_declares_prefix() {
        let codec = LeafCodec::new(LeafKind::QName);
        let xml = write(&codec, &Value::QName(QName::new("urn:t", "Order"))).unwrap();
        assert_eq!(xml, r#"<v xmlns:n="urn:t">n:Order</v>"#);
        assert_eq!(
            read(&codec, &xml).unwrap(),
            Value::QName(QName::new("urn:t", "Order"))
        );
    }

    #[test]
    fn test_boundary_values_round_trip() {
        let at = |text: &str| DateTime::parse_from_rfc3339(text).unwrap();
        let color = EnumType::new("Color", QName::new("urn:t", "color")).constant("RED", "red");
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

        let cases: Vec<(LeafCodec, Vec<Value>)> = vec![
            (LeafCodec::new(LeafKind::Boolean), vec![Value::Bool(true), Value::Bool(false)]),
            (
                LeafCodec::new(LeafKind::Byte),
                vec![Value::Byte(0), Value::Byte(i8::MIN), Value::Byte(i8::MAX)],
            ),
            (
                LeafCodec::new(LeafKind::Short),
                vec![Value::Short(0), Value::Short(i16::MIN), Value::Short(i16::MAX)],
            ),
            (
                LeafCodec::new(LeafKind::Int),
                vec![Value::Int(0), Value::Int(i32::MIN), Value::Int(i32::MAX)],
            ),
            (
                LeafCodec::new(LeafKind::Long),
                vec![Value::Long(0), Value::Long(i64::MIN), Value::Long(i64::MAX)],
            ),
            (
                LeafCodec::new(LeafKind::Integer),
                vec![Value::Integer(0), Value::Integer(i128::MIN), Value::Integer(i128::MAX)],
            ),
            (
                LeafCodec::new(LeafKind::Float),
                vec![
                    Value::Float(0.0),
                    Value::Float(f32::MAX),
                    Value::Float(f32::MIN),
                    Value::Float(f32::MIN_POSITIVE),
                    Value::Float(f32::INFINITY),
                ],
            ),
            (
                LeafCodec::new(LeafKind::Double),
                vec![
                    Value::Double(0.0),
                    Value::Double(f64::MAX),
                    Value::Double(f64::MIN),
                    Value::Double(f64::MIN_POSITIVE),
                    Value::Double(f64::NEG_INFINITY),
                ],
            ),
            (
                LeafCodec::new(LeafKind::Char),
                vec![Value::Char('\0'), Value::Char('\u{FFFF}')],
            ),
            (
                LeafCodec::new(LeafKind::Decimal),
                vec![
                    Value::Decimal("0".into()),
                    Value::Decimal("-123456789012345678901234567890.000000000001".into()),
                ],
            ),
            (
                LeafCodec::new(LeafKind::String),
                vec![Value::from(""), Value::from("a < b & \"c\"")],
            ),
            (
                LeafCodec::new(LeafKind::Date),
                vec![
                    Value::Date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()),
                    Value::Date(NaiveDate::MAX),
                ],
            ),
            (
                LeafCodec::new(LeafKind::DateTime),
                vec![
                    Value::DateTime(at("0001-01-01T00:00:00Z")),
                    Value::DateTime(at("9999-12-31T23:59:59.999999999+14:00")),
                ],
            ),
            (
                LeafCodec::new(LeafKind::Time),
                vec![
                    Value::Time(NaiveTime::from_hms_opt(0, 0, 0).unwrap()),
                    Value::Time(NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap()),
                ],
            ),
            (
                LeafCodec::new(LeafKind::Uri),
                vec![Value::Uri(String::new()), Value::Uri("http://example.com/?a=1&b=2".into())],
            ),
            (
                LeafCodec::new(LeafKind::QName),
                vec![
                    Value::QName(QName::local("plain")),
                    Value::QName(QName::new("urn:t", "Order")),
                ],
            ),
            (
                LeafCodec::new(LeafKind::Enum(color)),
                vec![Value::Enum(EnumConstant::new("Color", "RED"))],
            ),
            (
                LeafCodec::new(LeafKind::Binary(BinaryKind::Bytes)),
                vec![Value::Bytes(Vec::new()), Value::Bytes(vec![0, 255, 128])],
            ),
            (
                crate::attachment::image_codec("image/png").unwrap().as_ref().clone(),
                vec![Value::Image(Attachment::new("image/png", png))],
            ),
            (
                LeafCodec::new(LeafKind::Binary(BinaryKind::DataHandler)),
                vec![Value::Data(Attachment::new(OCTET_STREAM, vec![1, 2, 3]))],
            ),
            (
                LeafCodec::new(LeafKind::Binary(BinaryKind::Source)),
                vec![Value::Source(String::new()), Value::Source("<a/>".into())],
            ),
        ];

        for (codec, values) in cases {
            for value in values {
                let xml = write(&codec, &value).unwrap();
                assert_eq!(read(&codec, &xml).unwrap(), value, "{:?} via {}", codec.kind(), xml);
            }
        }
    }

    #[test]
    fn test_negative_zero_keeps_sign() {
        let codec = LeafCodec::new(LeafKind::Double);
        let xml = write(&codec, &Value::Double(-0.0)).unwrap();
        assert_eq!(xml, "<v>-0.0</v>");
        match read(&codec, &xml).unwrap() {
            Value::Double(v) => assert!(v == 0.0 && v.is_sign_negative()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_attachment_capability() {
        assert!(LeafCodec::new(LeafKind::Int).attachment().is_none());
        assert!(
            LeafCodec::new(LeafKind::Binary(BinaryKind::Bytes))
                .attachment()
                .is_some()
        );
    }
}
