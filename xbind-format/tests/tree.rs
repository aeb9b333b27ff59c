//! Binding values onto retained documents.

use xbind_format::{Binder, Binding, Document, Object, QName, Registry, Value};

const BINDING: &str = r#"{
    "namespace": "urn:shop",
    "types": {
        "Order": {
            "element": "order",
            "attributes": [{ "field": "id", "type": "long" }],
            "elements": [
                { "field": "status", "type": "string" },
                { "field": "lines", "name": "line", "type": "Line", "repeated": "list", "wrapper": "lines" }
            ]
        },
        "Line": {
            "elements": [
                { "field": "sku", "type": "string" },
                { "field": "qty", "type": "int" }
            ]
        }
    }
}"#;

fn setup() -> (Binding, Registry) {
    let binding = Binding::from_json(BINDING).unwrap();
    let registry = binding.build().unwrap();
    (binding, registry)
}

fn line(sku: &str, qty: i32) -> Value {
    Object::new("Line").with("sku", sku).with("qty", qty).into()
}

fn with_lines(value: Value, lines: Vec<Value>) -> Value {
    let Value::Object(obj) = value else {
        panic!("expected an object");
    };
    obj.with("lines", Value::List(lines)).into()
}

fn order_name() -> QName {
    QName::new("urn:shop", "order")
}

const TWO_LINES: &str = concat!(
    r#"<order xmlns="urn:shop" id="7"><status>open</status><lines>"#,
    "<line><sku>A</sku><qty>1</qty></line>",
    "<line><sku>B</sku><qty>2</qty></line>",
    "</lines></order>"
);

#[test]
fn test_read_matches_stream_decode() {
    let (binding, registry) = setup();
    let codec = binding.root_codec(Some("Order")).unwrap();

    let streamed = xbind_format::from_str(&codec, &registry.context(), TWO_LINES).unwrap();

    let mut doc = Document::parse(TWO_LINES).unwrap();
    let root = doc.document_element().unwrap();
    let mut binder = Binder::new(registry.context(), &mut doc);
    let bound = binder.read(&codec, root).unwrap();

    assert_eq!(bound, streamed);
    assert_eq!(
        bound,
        Object::new("Order")
            .with("id", Value::Long(7))
            .with("status", "open")
            .with("lines", Value::List(vec![line("A", 1), line("B", 2)]))
            .into()
    );
}

#[test]
fn test_unchanged_value_leaves_document_alone() {
    let (binding, registry) = setup();
    let codec = binding.root_codec(Some("Order")).unwrap();

    let mut doc = Document::parse(TWO_LINES).unwrap();
    let root = doc.document_element().unwrap();
    let mut binder = Binder::new(registry.context(), &mut doc);
    let value = binder.read(&codec, root).unwrap();

    let updated = binder.update(&codec, root, &value, &order_name()).unwrap();
    assert_eq!(updated, Some(root));
    assert!(binder.invalidated().is_empty());
    assert_eq!(doc.to_xml(), TWO_LINES);
}

#[test]
fn test_extra_item_is_appended() {
    let (binding, registry) = setup();
    let codec = binding.root_codec(Some("Order")).unwrap();

    let mut doc = Document::parse(TWO_LINES).unwrap();
    let root = doc.document_element().unwrap();
    let lines = doc.child_elements(root).nth(1).unwrap();
    let before: Vec<_> = doc.child_elements(lines).collect();

    let mut binder = Binder::new(registry.context(), &mut doc);
    let value = binder.read(&codec, root).unwrap();
    let value = with_lines(value, vec![line("A", 1), line("B", 5), line("C", 3)]);
    binder.update(&codec, root, &value, &order_name()).unwrap();
    assert!(binder.invalidated().is_empty());

    let after: Vec<_> = doc.child_elements(lines).collect();
    assert_eq!(after.len(), 3);
    assert_eq!(&after[..2], &before[..]);
    assert_eq!(
        doc.to_xml(),
        concat!(
            r#"<order xmlns="urn:shop" id="7"><status>open</status><lines>"#,
            "<line><sku>A</sku><qty>1</qty></line>",
            "<line><sku>B</sku><qty>5</qty></line>",
            "<line><sku>C</sku><qty>3</qty></line>",
            "</lines></order>"
        )
    );
}

#[test]
fn test_surplus_nodes_are_kept() {
    let (binding, registry) = setup();
    let codec = binding.root_codec(Some("Order")).unwrap();

    let mut doc = Document::parse(TWO_LINES).unwrap();
    let root = doc.document_element().unwrap();

    let mut binder = Binder::new(registry.context(), &mut doc);
    let value = binder.read(&codec, root).unwrap();
    let value = with_lines(value, vec![line("Z", 9)]);
    binder.update(&codec, root, &value, &order_name()).unwrap();

    assert_eq!(
        doc.to_xml(),
        concat!(
            r#"<order xmlns="urn:shop" id="7"><status>open</status><lines>"#,
            "<line><sku>Z</sku><qty>9</qty></line>",
            "<line><sku>B</sku><qty>2</qty></line>",
            "</lines></order>"
        )
    );
}

#[test]
fn test_mismatched_node_is_replaced() {
    let (binding, registry) = setup();
    let codec = binding.root_codec(Some("Order")).unwrap();

    let mut doc = Document::parse(r#"<order xmlns="urn:shop" id="1"><lines/></order>"#).unwrap();
    let root = doc.document_element().unwrap();
    let old_lines = doc.first_child(root).unwrap();

    let value: Value = Object::new("Order")
        .with("id", Value::Long(1))
        .with("status", "open")
        .with("lines", Value::List(Vec::new()))
        .into();

    let mut binder = Binder::new(registry.context(), &mut doc);
    binder.update(&codec, root, &value, &order_name()).unwrap();
    assert_eq!(binder.invalidated(), &[old_lines]);

    assert_eq!(doc.parent(old_lines), None);
    assert_eq!(
        doc.to_xml(),
        r#"<order xmlns="urn:shop" id="1"><status>open</status><lines/></order>"#
    );
}

#[test]
fn test_append_to_empty_document_element() {
    let (binding, registry) = setup();
    let codec = binding.root_codec(Some("Line")).unwrap();

    let mut doc = Document::parse("<batch/>").unwrap();
    let root = doc.document_element().unwrap();

    let mut binder = Binder::new(registry.context(), &mut doc);
    let node = binder
        .append(&codec, root, &line("A", 1), &QName::new("urn:shop", "line"))
        .unwrap()
        .unwrap();

    assert_eq!(doc.name(node), Some(&QName::new("urn:shop", "line")));
    assert_eq!(
        doc.to_xml(),
        r#"<batch><line xmlns="urn:shop"><sku>A</sku><qty>1</qty></line></batch>"#
    );
}

#[test]
fn test_null_attribute_is_removed() {
    let (binding, registry) = setup();
    let codec = binding.root_codec(Some("Order")).unwrap();

    let mut doc = Document::parse(r#"<order xmlns="urn:shop" id="1"><status>x</status></order>"#).unwrap();
    let root = doc.document_element().unwrap();

    let value: Value = Object::new("Order").with("status", "x").into();
    let mut binder = Binder::new(registry.context(), &mut doc);
    binder.update(&codec, root, &value, &order_name()).unwrap();

    assert_eq!(doc.to_xml(), r#"<order xmlns="urn:shop"><status>x</status></order>"#);
}

#[test]
fn test_short_repeated_field_keeps_following_field_in_place() {
    let binding = Binding::from_json(
        r#"{
            "types": {
                "Order": {
                    "element": "order",
                    "elements": [
                        { "field": "items", "name": "item", "type": "int", "repeated": "list" },
                        { "field": "note", "type": "string" }
                    ]
                }
            }
        }"#,
    )
    .unwrap();
    let registry = binding.build().unwrap();
    let codec = binding.root_codec(Some("Order")).unwrap();

    let mut doc =
        Document::parse("<order><item>1</item><item>2</item><item>3</item><note>x</note></order>")
            .unwrap();
    let root = doc.document_element().unwrap();
    let note = doc.child_elements(root).nth(3).unwrap();

    let value: Value = Object::new("Order")
        .with("items", Value::List(vec![Value::Int(1), Value::Int(2)]))
        .with("note", "y")
        .into();

    let mut binder = Binder::new(registry.context(), &mut doc);
    binder
        .update(&codec, root, &value, &QName::local("order"))
        .unwrap();
    assert!(binder.invalidated().is_empty());

    assert_eq!(doc.child_elements(root).nth(3), Some(note));
    assert_eq!(
        doc.to_xml(),
        "<order><item>1</item><item>2</item><item>3</item><note>y</note></order>"
    );
}
