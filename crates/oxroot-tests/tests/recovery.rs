//! Damaged objects are absorbed at their byte-count boundary.

mod common;

use std::sync::Arc;

use common::{Track, track_schema, write_track};
use oxroot_decoder::{
    CatalogConfig, CatalogError, ContainerCatalog, DecodeError, MemoryProvider, ObjectDecoder, SchemaRegistry,
};
use oxroot_tests::{BufferWriter, ContainerBuilder, Directory};
use oxroot_types::{ClassSchema, DecodeWarning, FieldSchema, Value};
use oxroot_wire::ByteCursor;
use oxroot_wire::codes::type_code;

fn decoder() -> ObjectDecoder {
    let registry = SchemaRegistry::new();
    registry.register(track_schema());
    ObjectDecoder::new(Arc::new(registry))
}

/// A `TList` of the given items, each followed by an empty option.
fn list(items: &[&dyn Fn(&mut BufferWriter)]) -> Vec<u8> {
    let mut w = BufferWriter::new();
    w.versioned(5, |w| {
        w.tobject(0).tstring("");
        w.i32(i32::try_from(items.len()).unwrap());
        for item in items {
            item(w);
            w.tstring("");
        }
    });
    w.into_inner()
}

fn named(name: &'static str) -> impl Fn(&mut BufferWriter) {
    move |w| {
        w.object("TNamed", |w| {
            w.tnamed(0, name, "");
        });
    }
}

fn items(obj: &oxroot_types::DecodedObject) -> Vec<&Value> {
    let arr = obj.root_record().and_then(|r| r.get("arr")).and_then(Value::as_list);
    arr.unwrap().iter().map(|v| obj.resolve(v)).collect()
}

#[test]
fn trailing_bytes_inside_a_body() {
    let padded = |w: &mut BufferWriter| {
        w.object("Track", |w| {
            w.versioned(3, |w| {
                write_track_fields(w, &Track::sample(1));
                w.u32(0xDEAD_BEEF);
            });
        });
    };
    let bytes = list(&[&padded, &named("after")]);
    let obj = decoder()
        .decode_named(&mut ByteCursor::new(&bytes), "TList")
        .unwrap();

    assert!(matches!(
        obj.diagnostics.as_slice(),
        [DecodeWarning::ByteCountMismatch { class, .. }] if class == "Track"
    ));
    let items = items(&obj);
    assert_eq!(items[0].as_record().unwrap().get_str("fLabel"), Some("trk1"));
    assert_eq!(items[1].as_record().unwrap().get_str("fName"), Some("after"));
}

#[test]
fn unknown_class_is_skipped() {
    let mystery = |w: &mut BufferWriter| {
        w.object("Mystery", |w| {
            w.versioned(4, |w| {
                w.bytes(&[7; 20]);
            });
        });
    };
    let bytes = list(&[&mystery, &named("after")]);
    let obj = decoder()
        .decode_named(&mut ByteCursor::new(&bytes), "TList")
        .unwrap();

    assert!(obj.diagnostics.contains(&DecodeWarning::SchemaNotFound {
        class: "Mystery".into(),
        version: 4,
    }));
    let items = items(&obj);
    assert_eq!(items[0].as_record().map(|r| r.fields.len()), Some(0));
    assert_eq!(items[1].as_record().unwrap().get_str("fName"), Some("after"));
}

#[test]
fn overlong_counter_nulls_the_body() {
    // fNhits claims 1000 hits; the window holds far fewer.
    let lying = |w: &mut BufferWriter| {
        w.object("Track", |w| {
            w.versioned(3, |w| {
                w.tobject(0);
                w.f32(1.5).i32(1000).u8(1);
                w.f64(0.25);
                w.tstring("lost").u32(0);
            });
        });
    };
    let bytes = list(&[&lying, &named("after")]);
    let obj = decoder()
        .decode_named(&mut ByteCursor::new(&bytes), "TList")
        .unwrap();

    assert!(
        obj.diagnostics
            .iter()
            .any(|w| matches!(w, DecodeWarning::FieldNulled { class, .. } if class == "Track")),
        "{:?}",
        obj.diagnostics
    );
    let items = items(&obj);
    let track = items[0].as_record().unwrap();
    assert_eq!(track.get_f64("fPx"), Some(1.5));
    assert!(track.get("fHits").is_none_or(Value::is_null));
    assert!(track.get("fLabel").is_none_or(Value::is_null));
    assert_eq!(items[1].as_record().unwrap().get_str("fName"), Some("after"));
}

#[test]
fn version_out_of_range() {
    let future = |w: &mut BufferWriter| {
        w.object("Track", |w| {
            w.versioned(2000, |w| {
                w.bytes(&[0; 12]);
            });
        });
    };
    let bytes = list(&[&future, &named("after")]);
    let obj = decoder()
        .decode_named(&mut ByteCursor::new(&bytes), "TList")
        .unwrap();

    assert!(obj.diagnostics.contains(&DecodeWarning::VersionOutOfRange {
        class: "Track".into(),
        version: 2000,
    }));
    assert_eq!(items(&obj)[1].as_record().unwrap().get_str("fName"), Some("after"));
}

#[test]
fn other_version_is_not_read_with_the_known_layout() {
    let registry = SchemaRegistry::new();
    registry.register(ClassSchema::new("Point", 5).with_field(FieldSchema::new("x", type_code::DOUBLE, "Double_t")));
    let decoder = ObjectDecoder::new(Arc::new(registry));

    let mut w = BufferWriter::new();
    w.versioned(2, |w| {
        w.i32(1).i32(2);
    });
    let bytes = w.into_inner();
    let mut cursor = ByteCursor::new(&bytes);
    let obj = decoder.decode_named(&mut cursor, "Point").unwrap();

    assert_eq!(
        obj.diagnostics,
        [DecodeWarning::SchemaNotFound {
            class: "Point".into(),
            version: 2,
        }]
    );
    assert_eq!(obj.root_record().map(|r| r.fields.len()), Some(0));
    assert_eq!(cursor.position(), bytes.len());

    // Inside a collection the next item is still read.
    let old_point = |w: &mut BufferWriter| {
        w.object("Point", |w| {
            w.versioned(2, |w| {
                w.i32(1).i32(2);
            });
        });
    };
    let bytes = list(&[&old_point, &named("after")]);
    let obj = decoder.decode_named(&mut ByteCursor::new(&bytes), "TList").unwrap();
    assert!(obj.diagnostics.contains(&DecodeWarning::SchemaNotFound {
        class: "Point".into(),
        version: 2,
    }));
    assert_eq!(items(&obj)[1].as_record().unwrap().get_str("fName"), Some("after"));
}

#[test]
fn truncated_buffer_without_window_is_an_error() {
    let mut w = BufferWriter::new();
    write_track(&mut w, &Track::sample(3));
    let bytes = w.into_inner();

    // Cut inside the version record: nothing says where the object ends.
    let err = decoder()
        .decode_named(&mut ByteCursor::new(&bytes[..3]), "Track")
        .unwrap_err();
    assert!(matches!(err, DecodeError::Wire(_)), "{err}");
}

#[tokio::test]
async fn damaged_entry_leaves_siblings_readable() {
    let mut broken = Vec::new();
    // A byte count larger than the payload itself.
    broken.extend_from_slice(&(0x4000_0000u32 | 500).to_be_bytes());
    broken.extend_from_slice(&3i16.to_be_bytes());
    broken.extend_from_slice(&[0; 6]);

    let top = Directory::new("damaged.root")
        .raw("broken", 1, "Track", broken)
        .object("good", 1, "Track", |w| write_track(w, &Track::sample(2)));
    let bytes = ContainerBuilder::new(top).schema(track_schema()).build();
    let catalog = ContainerCatalog::open(MemoryProvider::new(bytes), CatalogConfig::default())
        .await
        .unwrap();

    let err = catalog.read_object("broken").await.unwrap_err();
    assert!(matches!(err, CatalogError::Decode(_)), "{err}");

    let good = catalog.read_object("good").await.unwrap();
    assert!(good.is_clean(), "{:?}", good.diagnostics);
    assert_eq!(good.root_record().unwrap().get_str("fLabel"), Some("trk2"));
}

/// `Track` members without the version record.
fn write_track_fields(w: &mut BufferWriter, t: &Track) {
    w.tobject(0);
    w.f32(t.px);
    w.i32(i32::try_from(t.hits.len()).unwrap());
    w.u8(1);
    for h in &t.hits {
        w.f64(*h);
    }
    w.tstring(&t.label);
    w.u32(t.energy_raw);
}
