//! Encode [`ClassSchema`]s as the `TStreamerInfo` records a container's
//! schema catalog holds.

use oxroot_types::{ClassSchema, FieldKind, FieldSchema};
use oxroot_wire::codes::{tag, type_code};

use crate::writer::BufferWriter;

/// The schema catalog payload: a `TList` of `TStreamerInfo`.
pub fn write_schema_catalog(w: &mut BufferWriter, schemas: &[ClassSchema]) {
    w.versioned(5, |w| {
        w.tobject(0).tstring("");
        w.i32(len_i32(schemas.len()));
        for schema in schemas {
            w.object("TStreamerInfo", |w| write_streamer_info(w, schema));
            w.tstring("");
        }
    });
}

/// Body of one `TStreamerInfo` (after its class header).
pub fn write_streamer_info(w: &mut BufferWriter, schema: &ClassSchema) {
    w.versioned(9, |w| {
        w.tnamed(0, &schema.class_name, "");
        w.u32(schema.checksum);
        w.i32(schema.version);
        w.object("TObjArray", |w| {
            w.versioned(3, |w| {
                w.tobject(0).tstring("");
                w.i32(len_i32(schema.fields.len()));
                w.i32(0);
                for field in &schema.fields {
                    w.object(element_class(field), |w| write_element(w, field));
                }
            });
        });
    });
}

/// Element record class for a field.
pub fn element_class(field: &FieldSchema) -> &'static str {
    match &field.kind {
        FieldKind::Base { .. } => "TStreamerBase",
        FieldKind::BasicPointer { .. } => "TStreamerBasicPointer",
        FieldKind::Loop { .. } => "TStreamerLoop",
        FieldKind::Stl { .. } => "TStreamerSTL",
        FieldKind::StlString => "TStreamerSTLstring",
        FieldKind::Plain => match field.type_code {
            type_code::BASE => "TStreamerBase",
            type_code::TSTRING => "TStreamerString",
            type_code::OBJECT_P | type_code::OBJECTP => "TStreamerObjectPointer",
            type_code::ANY => "TStreamerObjectAny",
            type_code::ANY_P | type_code::ANYP => "TStreamerObjectAnyPointer",
            type_code::OBJECT | type_code::TOBJECT | type_code::TNAMED => "TStreamerObject",
            _ => "TStreamerBasicType",
        },
    }
}

fn write_element(w: &mut BufferWriter, field: &FieldSchema) {
    match &field.kind {
        FieldKind::Base { base_version } => {
            w.versioned(3, |w| {
                element_body(w, field);
                w.i32(*base_version);
            });
        }
        FieldKind::BasicPointer {
            count_name,
            count_class,
            count_version,
        }
        | FieldKind::Loop {
            count_name,
            count_class,
            count_version,
        } => {
            w.versioned(2, |w| {
                element_body(w, field);
                w.i32(*count_version).tstring(count_name).tstring(count_class);
            });
        }
        FieldKind::Stl { stl_type, ctype } => {
            w.versioned(3, |w| {
                element_body(w, field);
                w.i32(*stl_type).i32(*ctype);
            });
        }
        FieldKind::StlString => {
            w.versioned(2, |w| {
                w.versioned(3, |w| {
                    element_body(w, field);
                    w.i32(oxroot_wire::codes::stl::STRING).i32(type_code::STL_STRING);
                });
            });
        }
        FieldKind::Plain => {
            w.versioned(2, |w| element_body(w, field));
        }
    }
}

/// Versioned `TStreamerElement` (v4). A title holding a `[min,max,bits]`
/// range gets the range bit so the reader parses it.
fn element_body(w: &mut BufferWriter, field: &FieldSchema) {
    let bits = if field.title.contains('[') { tag::HAS_RANGE } else { 0 };
    w.versioned(4, |w| {
        w.tnamed(bits, &field.name, &field.title);
        w.i32(field.type_code)
            .i32(field.size)
            .i32(field.array_length)
            .i32(field.array_dim);
        for d in field.max_index {
            w.i32(d);
        }
        w.tstring(&field.type_name);
    });
}

fn len_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
