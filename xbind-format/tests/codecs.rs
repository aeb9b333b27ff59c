//! Leaf, open content and qualified name behaviour over the event stream.

use std::sync::Arc;

use xbind_format::codec::{LeafCodec, LeafKind, RecursiveCodec};
use xbind_format::{
    Attachment, Binding, Codec, Error, ErrorKind, Object, QName, Registry, Value, XSI_NS,
};

const PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn leaf(kind: LeafKind) -> LeafCodec {
    LeafCodec::new(kind)
}

fn encode(codec: &Codec, value: &Value, name: &QName) -> String {
    let registry = Registry::new();
    xbind_format::to_string(codec, &registry.context(), value, name, None).unwrap()
}

fn decode(codec: &Codec, xml: &str) -> xbind_format::Result<Value> {
    let registry = Registry::new();
    xbind_format::from_str(codec, &registry.context(), xml)
}

// ============================================================================
// NIL AND EMPTY
// ============================================================================

#[test]
fn test_nil_number_reads_as_zero() {
    let codec = Codec::Leaf(leaf(LeafKind::Int).nillable());
    let xml = encode(&codec, &Value::Null, &QName::local("n"));
    assert_eq!(xml, format!(r#"<n xmlns:xsi="{}" xsi:nil="true"/>"#, XSI_NS));

    // Writing null gives nil, reading nil gives the zero value.
    assert_eq!(decode(&codec, &xml).unwrap(), Value::Int(0));
}

#[test]
fn test_nil_string_reads_as_null() {
    let codec = Codec::Leaf(leaf(LeafKind::String).nillable());
    let xml = format!(r#"<s xmlns:xsi="{}" xsi:nil="true"/>"#, XSI_NS);
    assert_eq!(decode(&codec, &xml).unwrap(), Value::Null);
    assert_eq!(decode(&codec, "<s/>").unwrap(), Value::from(""));
}

#[test]
fn test_empty_number() {
    assert_eq!(decode(&Codec::Leaf(leaf(LeafKind::Int)), "<n/>").unwrap(), Value::Null);

    let err = decode(&Codec::Leaf(leaf(LeafKind::Int).required()), "<n> </n>").unwrap_err();
    assert!(matches!(err, Error::MayNotBeNull("int")));
}

#[test]
fn test_null_is_omitted() {
    let codec = Codec::Leaf(leaf(LeafKind::Int));
    assert_eq!(encode(&codec, &Value::Null, &QName::local("n")), "");
}

// ============================================================================
// QUALIFIED NAMES
// ============================================================================

#[test]
fn test_qname_prefix_n() {
    let codec = Codec::Leaf(leaf(LeafKind::QName));
    let value = Value::QName(QName::new("urn:other", "Thing"));

    let xml = encode(&codec, &value, &QName::local("ref"));
    assert_eq!(xml, r#"<ref xmlns:n="urn:other">n:Thing</ref>"#);
    assert_eq!(decode(&codec, &xml).unwrap(), value);
}

#[test]
fn test_qname_prefix_d_inside_n() {
    let codec = Codec::Leaf(leaf(LeafKind::QName));
    let value = Value::QName(QName::new("urn:other", "Thing"));

    let xml = encode(&codec, &value, &QName::with_prefix("urn:a", "ref", "n"));
    assert_eq!(
        xml,
        r#"<n:ref xmlns:n="urn:a" xmlns:d="urn:other">d:Thing</n:ref>"#
    );
    assert_eq!(decode(&codec, &xml).unwrap(), value);
}

#[test]
fn test_qname_unbound_prefix() {
    let codec = Codec::Leaf(leaf(LeafKind::QName));
    let err = decode(&codec, "<ref>q:Thing</ref>").unwrap_err();
    assert!(matches!(err, Error::UnboundPrefix(ref p) if p == "q"));
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

// ============================================================================
// OPEN CONTENT
// ============================================================================

#[test]
fn test_open_scalar_records_type() {
    let codec = Codec::Recursive(RecursiveCodec::open());

    let xml = encode(&codec, &Value::Int(5), &QName::local("value"));
    assert_eq!(
        xml,
        format!(
            r#"<value xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:xsi="{}" xsi:type="xs:int">5</value>"#,
            XSI_NS
        )
    );
    assert_eq!(decode(&codec, &xml).unwrap(), Value::Int(5));
}

#[test]
fn test_open_type_and_qname_text_use_distinct_prefixes() {
    let binding = Binding::from_json(
        r#"{
            "namespace": "urn:types",
            "types": { "Rec": { "text": { "field": "target", "type": "qname" } } }
        }"#,
    )
    .unwrap();
    let registry = binding.build().unwrap();
    let cx = registry.context();
    let codec = Codec::Recursive(RecursiveCodec::open());

    let value: Value = Object::new("Rec")
        .with("target", Value::QName(QName::new("urn:other", "x")))
        .into();
    let xml = xbind_format::to_string(&codec, &cx, &value, &QName::local("item"), None).unwrap();

    assert!(xml.contains(r#"xmlns:n="urn:types""#), "{}", xml);
    assert!(xml.contains(r#"xmlns:d="urn:other""#), "{}", xml);
    assert!(xml.contains(r#"xsi:type="n:Rec""#), "{}", xml);
    assert!(xml.ends_with(">d:x</item>"), "{}", xml);
    assert_eq!(xbind_format::from_str(&codec, &cx, &xml).unwrap(), value);
}

#[test]
fn test_open_content_errors() {
    let codec = Codec::Recursive(RecursiveCodec::open());
    let registry = Registry::new();

    let value: Value = Object::new("Unregistered").into();
    let err = xbind_format::to_string(
        &codec,
        &registry.context(),
        &value,
        &QName::local("value"),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnexpectedValue(t) if t == "Unregistered"));

    let err = decode(&codec, "<mystery/>").unwrap_err();
    assert_eq!(err.to_string(), "Unexpected element <mystery>");

    let xml = format!(r#"<value xmlns:xsi="{}" xsi:type="nowhere"/>"#, XSI_NS);
    assert!(matches!(decode(&codec, &xml), Err(Error::UnknownType(_))));
}

// ============================================================================
// ATTACHMENTS
// ============================================================================

#[test]
fn test_inline_image() {
    let image = xbind_format::image_codec("IMAGE/PNG").unwrap();
    assert!(Arc::ptr_eq(&image, &xbind_format::image_codec("image/png").unwrap()));

    let codec = Codec::Leaf(image.as_ref().clone());
    let value = Value::Image(Attachment::new("image/png", PNG.to_vec()));

    let xml = encode(&codec, &value, &QName::local("logo"));
    assert_eq!(xml, "<logo>iVBORw0KGgo=</logo>");
    assert_eq!(decode(&codec, "<logo>\n  iVBORw0K\n  Ggo=\n</logo>").unwrap(), value);

    let err = decode(&codec, "<logo>aGVsbG8=</logo>").unwrap_err();
    assert!(matches!(err, Error::InvalidPayload { .. }));
}

#[test]
fn test_unknown_image_type() {
    assert!(matches!(
        xbind_format::image_codec("image/tiff"),
        Err(Error::UnknownMimeType(m)) if m == "image/tiff"
    ));
}
