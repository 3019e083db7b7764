//! Classes whose layout is fixed by the format and never described by a
//! stored schema: the object and collection bases, and the schema
//! records themselves (which must be readable before any schema is).

use std::sync::Arc;

use oxroot_types::{Record, Value};
use oxroot_wire::{ArrayKind, VersionToken};
use oxroot_wire::codes::{tag, type_code};

use crate::context::DecodeContext;
use crate::error::DecodeError;
use crate::streamer::MemberOp;
use crate::streamer::basic::{Basic, Text};

/// `TObject` bit marking a clones array written member-wise.
const BYPASS_STREAMER: u64 = 1 << 12;

/// ```text
/// ┌─────────────────────┬──────────────────────────────────────────────┐
/// │ Class               │ Layout after the version record              │
/// ├─────────────────────┼──────────────────────────────────────────────┤
/// │ TObject             │ fUniqueID u32, fBits u32, [pid u16]          │
/// │ TNamed              │ TObject, fName, fTitle                       │
/// │ TObjString          │ TObject, fString                             │
/// │ TList, THashList    │ TObject, fName, n, n × (object, option)      │
/// │ TObjArray           │ TObject, fName, n, lower bound, n × object   │
/// │ TClonesArray        │ TObject, fName, "class;ver", n, lower bound, │
/// │                     │ records member-wise or one by one            │
/// │ TStreamerInfo       │ TNamed, fCheckSum, fClassVersion, fElements  │
/// │ TStreamerElement    │ TNamed, type, size, dims, type name, [range] │
/// │ TStreamer* subtypes │ TStreamerElement plus their own extras       │
/// └─────────────────────┴──────────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    TObject,
    TNamed,
    TObjString,
    TList,
    TObjArray,
    TClonesArray,
    StreamerInfo,
    StreamerElement,
    StreamerBase,
    /// `TStreamerBasicPointer` and `TStreamerLoop`.
    StreamerCounted,
    StreamerStl,
    StreamerStlString,
    /// Element subtypes with no fields beyond `TStreamerElement`.
    StreamerOther,
}

impl Builtin {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let builtin = match name {
            "TObject" => Self::TObject,
            "TNamed" => Self::TNamed,
            "TObjString" => Self::TObjString,
            "TList" | "THashList" => Self::TList,
            "TObjArray" => Self::TObjArray,
            "TClonesArray" => Self::TClonesArray,
            "TStreamerInfo" => Self::StreamerInfo,
            "TStreamerElement" => Self::StreamerElement,
            "TStreamerBase" => Self::StreamerBase,
            "TStreamerBasicPointer" | "TStreamerLoop" => Self::StreamerCounted,
            "TStreamerSTL" => Self::StreamerStl,
            "TStreamerSTLstring" => Self::StreamerStlString,
            "TStreamerBasicType"
            | "TStreamerObject"
            | "TStreamerObjectPointer"
            | "TStreamerObjectAny"
            | "TStreamerObjectAnyPointer"
            | "TStreamerString"
            | "TStreamerArtificial" => Self::StreamerOther,
            _ => return None,
        };
        Some(builtin)
    }

    #[must_use]
    pub fn class_name(self) -> &'static str {
        match self {
            Self::TObject => "TObject",
            Self::TNamed => "TNamed",
            Self::TObjString => "TObjString",
            Self::TList => "TList",
            Self::TObjArray => "TObjArray",
            Self::TClonesArray => "TClonesArray",
            Self::StreamerInfo => "TStreamerInfo",
            Self::StreamerElement => "TStreamerElement",
            Self::StreamerBase => "TStreamerBase",
            Self::StreamerCounted => "TStreamerBasicPointer",
            Self::StreamerStl => "TStreamerSTL",
            Self::StreamerStlString => "TStreamerSTLstring",
            Self::StreamerOther => "TStreamerBasicType",
        }
    }

    /// Read the body that follows `token`.
    ///
    /// # Errors
    ///
    /// Cursor errors and errors from nested objects.
    pub fn read(
        self,
        ctx: &mut DecodeContext<'_, '_>,
        token: &VersionToken,
        rec: &mut Record,
    ) -> Result<(), DecodeError> {
        let v = token.class_version();
        match self {
            Self::TObject => read_tobject(ctx, rec),
            Self::TNamed => {
                ctx.stream_into("TObject", rec)?;
                read_text(ctx, rec, "fName")?;
                read_text(ctx, rec, "fTitle")
            }
            Self::TObjString => {
                ctx.stream_into("TObject", rec)?;
                read_text(ctx, rec, "fString")
            }
            Self::TList => read_list(ctx, v, rec),
            Self::TObjArray => read_obj_array(ctx, v, rec),
            Self::TClonesArray => read_clones(ctx, v, rec),
            Self::StreamerInfo => {
                ctx.stream_into("TNamed", rec)?;
                rec.set("fCheckSum", Value::UInt(u64::from(ctx.cursor.read_u32()?)));
                rec.set("fClassVersion", Value::Int(i64::from(ctx.cursor.read_i32()?)));
                let elements = ctx.read_object_any()?;
                rec.set("fElements", elements);
                Ok(())
            }
            Self::StreamerElement => read_element(ctx, v, rec),
            Self::StreamerBase => {
                ctx.stream_into("TStreamerElement", rec)?;
                if v > 2 {
                    read_int(ctx, rec, "fBaseVersion")?;
                }
                Ok(())
            }
            Self::StreamerCounted => {
                ctx.stream_into("TStreamerElement", rec)?;
                read_int(ctx, rec, "fCountVersion")?;
                read_text(ctx, rec, "fCountName")?;
                read_text(ctx, rec, "fCountClass")
            }
            Self::StreamerStl => {
                ctx.stream_into("TStreamerElement", rec)?;
                read_int(ctx, rec, "fSTLtype")?;
                read_int(ctx, rec, "fCtype")
            }
            Self::StreamerStlString => {
                if v > 1 {
                    ctx.stream_into("TStreamerSTL", rec)?;
                }
                Ok(())
            }
            Self::StreamerOther => ctx.stream_into("TStreamerElement", rec),
        }
    }

    /// Member operations for reading this class member-wise, where the
    /// layout is flat enough to have them.
    #[must_use]
    pub fn split_ops(self) -> Option<Vec<MemberOp>> {
        let basic = |name: &str| -> MemberOp {
            Arc::new(Basic {
                name: name.to_string(),
                code: type_code::UINT,
                slot: None,
            })
        };
        let text = |name: &str| -> MemberOp {
            Arc::new(Text {
                name: name.to_string(),
                array_length: 0,
            })
        };
        match self {
            Self::TObject => Some(vec![basic("fUniqueID"), basic("fBits")]),
            Self::TNamed => Some(vec![basic("fUniqueID"), basic("fBits"), text("fName"), text("fTitle")]),
            _ => None,
        }
    }
}

fn read_tobject(ctx: &mut DecodeContext<'_, '_>, rec: &mut Record) -> Result<(), DecodeError> {
    let unique_id = ctx.cursor.read_u32()?;
    let bits = ctx.cursor.read_u32()?;
    rec.set("fUniqueID", Value::UInt(u64::from(unique_id)));
    rec.set("fBits", Value::UInt(u64::from(bits)));
    if bits & tag::IS_REFERENCED != 0 {
        rec.set("fPidOffset", Value::UInt(u64::from(ctx.cursor.read_u16()?)));
    }
    Ok(())
}

fn read_text(ctx: &mut DecodeContext<'_, '_>, rec: &mut Record, field: &str) -> Result<(), DecodeError> {
    let s = ctx.cursor.read_tstring()?;
    rec.set(field, Value::Str(s));
    Ok(())
}

fn read_int(ctx: &mut DecodeContext<'_, '_>, rec: &mut Record, field: &str) -> Result<(), DecodeError> {
    let n = ctx.cursor.read_i32()?;
    rec.set(field, Value::Int(i64::from(n)));
    Ok(())
}

fn read_count(ctx: &mut DecodeContext<'_, '_>, field: &str) -> Result<usize, DecodeError> {
    let n = ctx.cursor.read_i32()?;
    ctx.check_count(field, u64::from(n.unsigned_abs()), false)
}

fn read_list(ctx: &mut DecodeContext<'_, '_>, v: i16, rec: &mut Record) -> Result<(), DecodeError> {
    if v > 3 {
        ctx.stream_into("TObject", rec)?;
        read_text(ctx, rec, "fName")?;
        let n = read_count(ctx, "arr")?;
        let mut items = Vec::with_capacity(n.min(ctx.cursor.remaining()));
        let mut options = Vec::with_capacity(items.capacity());
        for _ in 0..n {
            items.push(ctx.read_object_any()?);
            options.push(Value::Str(ctx.cursor.read_tstring()?));
        }
        rec.set("arr", Value::List(items));
        rec.set("opt", Value::List(options));
        return Ok(());
    }
    if v > 2 {
        ctx.stream_into("TObject", rec)?;
    }
    if v > 1 {
        read_text(ctx, rec, "fName")?;
    }
    let n = read_count(ctx, "arr")?;
    let items = read_objects(ctx, n)?;
    rec.set("arr", Value::List(items));
    Ok(())
}

fn read_obj_array(ctx: &mut DecodeContext<'_, '_>, v: i16, rec: &mut Record) -> Result<(), DecodeError> {
    if v > 2 {
        ctx.stream_into("TObject", rec)?;
    }
    if v > 1 {
        read_text(ctx, rec, "fName")?;
    }
    let n = read_count(ctx, "arr")?;
    read_int(ctx, rec, "fLowerBound")?;
    let items = read_objects(ctx, n)?;
    rec.set("arr", Value::List(items));
    Ok(())
}

fn read_objects(ctx: &mut DecodeContext<'_, '_>, n: usize) -> Result<Vec<Value>, DecodeError> {
    let mut items = Vec::with_capacity(n.min(ctx.cursor.remaining()));
    for _ in 0..n {
        items.push(ctx.read_object_any()?);
    }
    Ok(items)
}

fn read_clones(ctx: &mut DecodeContext<'_, '_>, v: i16, rec: &mut Record) -> Result<(), DecodeError> {
    if v > 2 {
        ctx.stream_into("TObject", rec)?;
    }
    if v > 1 {
        read_text(ctx, rec, "fName")?;
    }
    let spec = ctx.cursor.read_tstring()?;
    let (class, version) = match spec.split_once(';') {
        Some((class, version)) => (class.to_string(), version.trim().parse::<i16>().unwrap_or(-1)),
        None => (spec.clone(), -1),
    };
    rec.set("fClassName", Value::Str(spec));
    let n = ctx.cursor.read_i32()?;
    read_int(ctx, rec, "fLowerBound")?;

    let bits = rec.get("fBits").and_then(Value::as_u64).unwrap_or(0);
    let memberwise = v <= 2 || bits & BYPASS_STREAMER != 0;
    let n = ctx.check_count("arr", u64::from(n.unsigned_abs()), memberwise)?;
    let items = if memberwise {
        ctx.read_memberwise(&class, version, None, n)?
    } else {
        let mut items = Vec::with_capacity(n.min(ctx.cursor.remaining()));
        for _ in 0..n {
            if ctx.cursor.read_u8()? == 0 {
                items.push(Value::Null);
            } else {
                items.push(ctx.read_class(&class)?);
            }
        }
        items
    };
    rec.set("arr", Value::List(items));
    Ok(())
}

fn read_element(ctx: &mut DecodeContext<'_, '_>, v: i16, rec: &mut Record) -> Result<(), DecodeError> {
    ctx.stream_into("TNamed", rec)?;
    read_int(ctx, rec, "fType")?;
    read_int(ctx, rec, "fSize")?;
    read_int(ctx, rec, "fArrayLength")?;
    read_int(ctx, rec, "fArrayDim")?;
    let max_index = if v == 1 {
        let n = ctx.cursor.read_u32()? as usize;
        ctx.cursor.read_array(n, ArrayKind::I32)?
    } else {
        ctx.cursor.read_array(5, ArrayKind::I32)?
    };
    rec.set("fMaxIndex", Value::Array(max_index));
    read_text(ctx, rec, "fTypeName")?;
    if v == 3 {
        rec.set("fXmin", Value::Float(ctx.cursor.read_f64()?));
        rec.set("fXmax", Value::Float(ctx.cursor.read_f64()?));
        rec.set("fFactor", Value::Float(ctx.cursor.read_f64()?));
    }
    Ok(())
}
