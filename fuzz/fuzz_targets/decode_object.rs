#![no_main]

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;
use oxroot_decoder::{ObjectDecoder, SchemaRegistry};
use oxroot_types::{ClassSchema, FieldKind, FieldSchema, FloatRange};
use oxroot_wire::codes::{stl, type_code};
use oxroot_wire::ByteCursor;

fn decoder() -> &'static ObjectDecoder {
    static DECODER: OnceLock<ObjectDecoder> = OnceLock::new();
    DECODER.get_or_init(|| {
        let registry = SchemaRegistry::new();
        registry.register(
            ClassSchema::new("Sample", 1)
                .with_field(FieldSchema::base("TNamed", 1))
                .with_field(FieldSchema::new("fN", type_code::INT, "Int_t"))
                .with_field(
                    FieldSchema::new("fValues", type_code::OFFSET_P + type_code::FLOAT, "Float_t*")
                        .with_kind(FieldKind::BasicPointer {
                            count_name: "fN".into(),
                            count_class: "Sample".into(),
                            count_version: 1,
                        }),
                )
                .with_field(
                    FieldSchema::new("fPacked", type_code::DOUBLE32, "Double32_t")
                        .with_range(FloatRange::scaled(0.0, 1.0, 12)),
                )
                .with_field(
                    FieldSchema::new("fChildren", type_code::STL, "vector<Sample*>").with_kind(FieldKind::Stl {
                        stl_type: stl::VECTOR,
                        ctype: type_code::OBJECT,
                    }),
                )
                .with_field(
                    FieldSchema::new("fIndex", type_code::STL, "map<string,int>").with_kind(FieldKind::Stl {
                        stl_type: stl::MAP,
                        ctype: type_code::OBJECT,
                    }),
                ),
        );
        ObjectDecoder::new(Arc::new(registry))
    })
}

// Fuzz target: object decoding over arbitrary buffers.
//
// Decodes the input as a polymorphic object, as a known class, and as a
// builtin collection. Catches bugs in:
// - Class header and tag bookkeeping
// - Byte-count windows and resynchronization
// - Counted arrays, reduced floats, containers and nested pointers
// - Element count ceilings
fuzz_target!(|data: &[u8]| {
    let decoder = decoder();
    let _ = decoder.decode_next(&mut ByteCursor::new(data));
    let _ = decoder.decode_named(&mut ByteCursor::new(data), "Sample");
    let _ = decoder.decode_named(&mut ByteCursor::new(data), "TList");
});
