//! Shared and cyclic pointers resolve to arena slots.

mod common;

use std::sync::Arc;

use common::node_schema;
use oxroot_decoder::{ObjectDecoder, SchemaRegistry};
use oxroot_tests::BufferWriter;
use oxroot_types::{ClassSchema, DecodeWarning, FieldKind, FieldSchema, ObjectRef, Value};
use oxroot_wire::ByteCursor;
use oxroot_wire::codes::type_code;

fn decoder() -> ObjectDecoder {
    let registry = SchemaRegistry::new();
    registry.register(node_schema());
    ObjectDecoder::new(Arc::new(registry))
}

#[test]
fn cycle_through_pointers() {
    // root → a → b → a
    let mut w = BufferWriter::new();
    w.versioned(1, |w| {
        w.i32(0);
        let (a, mark) = w.begin_object("Node");
        w.versioned(1, |w| {
            w.i32(1);
            w.object("Node", |w| {
                w.versioned(1, |w| {
                    w.i32(2);
                    w.object_ref(a);
                });
            });
        });
        w.end_object(mark);
    });

    let obj = decoder()
        .decode_named(&mut ByteCursor::new(w.as_slice()), "Node")
        .unwrap();
    assert!(obj.is_clean(), "{:?}", obj.diagnostics);
    assert_eq!(obj.graph.len(), 2);

    let root = obj.root_record().unwrap();
    assert_eq!(root.get("fNext"), Some(&Value::Ref(ObjectRef(0))));

    let a = obj.graph.record(&Value::Ref(ObjectRef(0))).unwrap();
    assert_eq!(a.get_i64("fValue"), Some(1));
    assert_eq!(a.get("fNext"), Some(&Value::Ref(ObjectRef(1))));

    let b = obj.graph.record(&Value::Ref(ObjectRef(1))).unwrap();
    assert_eq!(b.get_i64("fValue"), Some(2));
    assert_eq!(b.get("fNext"), Some(&Value::Ref(ObjectRef(0))));
}

#[test]
fn node_pointing_at_itself() {
    let mut w = BufferWriter::new();
    let tag = w.object("Node", |w| {
        w.versioned(1, |w| {
            w.i32(9);
            // The tag of the enclosing object is the first word of its header.
            w.object_ref(2);
        });
    });
    assert_eq!(tag, 2);

    let obj = decoder().decode_next(&mut ByteCursor::new(w.as_slice())).unwrap();
    let slot = obj.root.as_object_ref().unwrap();
    let node = obj.graph.record(&obj.root).unwrap();
    assert_eq!(node.get("fNext"), Some(&Value::Ref(slot)));
}

#[test]
fn shared_objects_in_a_list() {
    // A TList holding the same TNamed twice: once inline, once by tag.
    let mut w = BufferWriter::new();
    w.versioned(5, |w| {
        w.tobject(0).tstring("");
        w.i32(3);
        let shared = w.object("TNamed", |w| {
            w.tnamed(0, "shared", "");
        });
        w.tstring("");
        w.object_ref(shared);
        w.tstring("");
        w.null();
        w.tstring("");
    });

    let obj = decoder()
        .decode_named(&mut ByteCursor::new(w.as_slice()), "TList")
        .unwrap();
    assert!(obj.is_clean(), "{:?}", obj.diagnostics);

    let items: Vec<&Value> = obj
        .root_record()
        .and_then(|r| r.get("arr"))
        .and_then(Value::as_list)
        .unwrap()
        .iter()
        .collect();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], items[1]);
    assert!(items[2].is_null());
    assert_eq!(obj.resolve(items[0]).as_record().unwrap().get_str("fName"), Some("shared"));
}

#[test]
fn dangling_tag_is_nulled() {
    let mut w = BufferWriter::new();
    w.versioned(1, |w| {
        w.i32(5);
        w.object_ref(4242);
    });

    let obj = decoder()
        .decode_named(&mut ByteCursor::new(w.as_slice()), "Node")
        .unwrap();
    let root = obj.root_record().unwrap();
    assert_eq!(root.get_i64("fValue"), Some(5));
    assert_eq!(root.get("fNext"), Some(&Value::Null));
    assert_eq!(obj.diagnostics, [DecodeWarning::UnknownObjectTag { tag: 4242 }]);
}

fn counted_loop(name: &str, type_name: &str) -> FieldSchema {
    FieldSchema::new(name, type_code::STREAM_LOOP, type_name).with_kind(FieldKind::Loop {
        count_name: "fN".into(),
        count_class: "Cluster".into(),
        count_version: 1,
    })
}

#[test]
fn loops_of_records_and_of_pointers() {
    let registry = SchemaRegistry::new();
    registry.register(node_schema());
    registry.register(
        ClassSchema::new("Cluster", 1)
            .with_field(FieldSchema::new("fN", type_code::INT, "Int_t"))
            .with_field(counted_loop("fInline", "Node*"))
            .with_field(counted_loop("fShared", "Node**")),
    );
    let decoder = ObjectDecoder::new(Arc::new(registry));

    let mut w = BufferWriter::new();
    w.versioned(1, |w| {
        w.i32(2);
        w.versioned(1, |w| {
            for value in [10, 11] {
                w.versioned(1, |w| {
                    w.i32(value).null();
                });
            }
        });
        w.versioned(1, |w| {
            let shared = w.object("Node", |w| {
                w.versioned(1, |w| {
                    w.i32(20).null();
                });
            });
            w.object_ref(shared);
        });
    });

    let obj = decoder
        .decode_named(&mut ByteCursor::new(w.as_slice()), "Cluster")
        .unwrap();
    assert!(obj.is_clean(), "{:?}", obj.diagnostics);
    let root = obj.root_record().unwrap();

    let inline: Vec<Option<i64>> = root
        .get("fInline")
        .and_then(Value::as_list)
        .unwrap()
        .iter()
        .map(|v| v.as_record().and_then(|r| r.get_i64("fValue")))
        .collect();
    assert_eq!(inline, [Some(10), Some(11)]);

    let shared = root.get("fShared").and_then(Value::as_list).unwrap();
    assert_eq!(shared, [Value::Ref(ObjectRef(0)), Value::Ref(ObjectRef(0))]);
    assert_eq!(obj.graph.len(), 1);
    assert_eq!(obj.graph.record(&shared[0]).unwrap().get_i64("fValue"), Some(20));
}
