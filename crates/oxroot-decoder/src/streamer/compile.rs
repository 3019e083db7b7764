use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use oxroot_types::typename::{is_string_class, normalize, strip_pointer};
use oxroot_types::{ClassSchema, DecodeWarning, FieldKind, FieldSchema};
use oxroot_wire::ArrayKind;
use oxroot_wire::codes::{stl, type_code};
use tracing::warn;

use super::basic::{Basic, CharStar, Counter, CounterArray, FixedArray, ReducedFloat, Shape, Text, Unsupported};
use super::object::{Base, Embedded, Loop, Pointer};
use super::stl::{Container, Stl};
use super::{CompiledStreamer, MemberOp};
use crate::registry::SchemaRegistry;

/// Compile `schema` into member operations.
///
/// ```text
/// ┌──────────────────────────────┬──────────────────────────────────────┐
/// │ Field                        │ Operation                            │
/// ├──────────────────────────────┼──────────────────────────────────────┤
/// │ base class                   │ Base (TArray bases → fArray)         │
/// │ scalar                       │ Basic, counters get a frame slot     │
/// │ Double32 / Float16           │ ReducedFloat                         │
/// │ OffsetL + scalar             │ FixedArray (reshaped by max_index)   │
/// │ OffsetP + scalar             │ CounterArray                         │
/// │ char*                        │ CharStar                             │
/// │ TString / std::string        │ Text                                 │
/// │ Object Any TObject TNamed    │ Embedded                             │
/// │ Objectp Anyp                 │ Embedded (never null, no class tag)  │
/// │ ObjectP AnyP AnyPnoVT        │ Pointer                              │
/// │ STL STLp Streamer            │ Stl                                  │
/// │ StreamLoop                   │ Loop (records, or pointers for **)   │
/// │ anything else                │ Unsupported + warning                │
/// └──────────────────────────────┴──────────────────────────────────────┘
/// ```
///
/// Counter members referenced by counted arrays are given frame slots
/// here, so the array finds its length without a name lookup. A counter
/// that lives in a base class is found by name in the record instead.
#[must_use]
pub fn compile(schema: &ClassSchema, registry: &SchemaRegistry) -> CompiledStreamer {
    let counted: HashSet<&str> = schema.fields.iter().filter_map(FieldSchema::count_name).collect();
    let mut slots = HashMap::new();
    for field in &schema.fields {
        if counted.contains(field.name.as_str()) && type_code::is_scalar(field.type_code) {
            let next = slots.len();
            slots.insert(field.name.clone(), next);
        }
    }

    let mut ops = Vec::with_capacity(schema.fields.len());
    let mut unsupported = Vec::new();
    for field in &schema.fields {
        if let Some(op) = compile_field(field, &slots, registry) {
            ops.push(op);
            continue;
        }
        warn!(
            class = %schema.class_name,
            field = %field.name,
            type_code = field.type_code,
            "member has no read operation"
        );
        unsupported.push(DecodeWarning::UnsupportedField {
            class: schema.class_name.clone(),
            field: field.name.clone(),
            type_code: field.type_code,
        });
        ops.push(Arc::new(Unsupported {
            name: field.name.clone(),
        }));
    }

    CompiledStreamer {
        class_name: schema.class_name.clone(),
        version: schema.version,
        checksum: schema.checksum,
        ops,
        slots: slots.len(),
        unsupported,
    }
}

fn compile_field(field: &FieldSchema, slots: &HashMap<String, usize>, registry: &SchemaRegistry) -> Option<MemberOp> {
    let name = field.name.clone();
    let array_length = usize::try_from(field.array_length).unwrap_or(0);

    match &field.kind {
        FieldKind::Base { base_version } => return Some(Arc::new(Base::new(&field.name, *base_version))),
        FieldKind::Loop { count_name, .. } => {
            let element = element_class(&field.type_name);
            // `Class**` holds pointers; `Class*` holds the records inline.
            let pointers = strip_pointer(&element).is_some();
            return Some(Arc::new(Loop {
                name,
                class: element_class(&element),
                pointers,
                counter: counter(count_name, slots),
            }));
        }
        FieldKind::StlString => return Some(Arc::new(Text { name, array_length })),
        _ => {}
    }
    if field.is_base() {
        return Some(Arc::new(Base::new(&field.name, -1)));
    }

    let code = field.type_code;
    let op: MemberOp = match code {
        type_code::DOUBLE32 | type_code::FLOAT16 => Arc::new(ReducedFloat {
            name,
            code,
            range: field.range,
            shape: Shape::Scalar,
        }),
        c if type_code::is_scalar(c) => Arc::new(Basic {
            name,
            code: c,
            slot: slots.get(&field.name).copied(),
        }),
        c if type_code::is_scalar(c - type_code::OFFSET_L) => {
            let base = c - type_code::OFFSET_L;
            let dims = dims(field);
            if matches!(base, type_code::DOUBLE32 | type_code::FLOAT16) {
                Arc::new(ReducedFloat {
                    name,
                    code: base,
                    range: field.range,
                    shape: Shape::Fixed {
                        len: array_length,
                        dims,
                    },
                })
            } else {
                Arc::new(FixedArray {
                    name,
                    kind: ArrayKind::from_type_code(base).ok()?,
                    len: array_length,
                    dims,
                })
            }
        }
        c if type_code::is_scalar(c - type_code::OFFSET_P) => {
            let base = c - type_code::OFFSET_P;
            let counter = counter(field.count_name()?, slots);
            if matches!(base, type_code::DOUBLE32 | type_code::FLOAT16) {
                Arc::new(ReducedFloat {
                    name,
                    code: base,
                    range: field.range,
                    shape: Shape::Counted(counter),
                })
            } else {
                Arc::new(CounterArray {
                    name,
                    kind: ArrayKind::from_type_code(base).ok()?,
                    counter,
                })
            }
        }
        type_code::CHAR_STAR => Arc::new(CharStar { name }),
        type_code::TSTRING | type_code::STL_STRING => Arc::new(Text { name, array_length }),
        c if matches!(
            object_code(c),
            type_code::OBJECT
                | type_code::ANY
                | type_code::TOBJECT
                | type_code::TNAMED
                | type_code::OBJECTP
                | type_code::ANYP
        ) =>
        {
            Arc::new(Embedded {
                name,
                class: element_class(&field.type_name),
                array_length,
            })
        }
        c if matches!(
            object_code(c),
            type_code::OBJECT_P | type_code::ANY_P | type_code::ANY_P_NO_VT
        ) =>
        {
            Arc::new(Pointer { name, array_length })
        }
        c if matches!(object_code(c), type_code::STL | type_code::STLP | type_code::STREAMER) => {
            stl_member(field, registry)?
        }
        _ => return None,
    };
    Some(op)
}

/// Strip an inline-array offset from an object type code.
fn object_code(code: i32) -> i32 {
    if (type_code::OFFSET_L + type_code::OBJECT..=type_code::OFFSET_L + type_code::STLP).contains(&code)
        || (type_code::OFFSET_L + type_code::STL..=type_code::OFFSET_L + type_code::STL_STRING).contains(&code)
    {
        code - type_code::OFFSET_L
    } else {
        code
    }
}

fn stl_member(field: &FieldSchema, registry: &SchemaRegistry) -> Option<MemberOp> {
    let is_string = matches!(field.kind, FieldKind::Stl { stl_type: stl::STRING, .. })
        || is_string_class(&normalize(&field.type_name));
    if is_string {
        return Some(Arc::new(Text {
            name: field.name.clone(),
            array_length: 0,
        }));
    }
    let container = Container::for_field(field, registry)?;
    Some(Arc::new(Stl {
        name: field.name.clone(),
        container,
    }))
}

fn counter(name: &str, slots: &HashMap<String, usize>) -> Counter {
    match slots.get(name) {
        Some(&slot) => Counter::Slot {
            slot,
            name: name.to_string(),
        },
        None => Counter::Named(name.to_string()),
    }
}

fn dims(field: &FieldSchema) -> Vec<i32> {
    let n = usize::try_from(field.array_dim).unwrap_or(0).min(5);
    field.max_index[..n].to_vec()
}

fn element_class(type_name: &str) -> String {
    let name = type_name.trim();
    strip_pointer(name).unwrap_or(name).to_string()
}
