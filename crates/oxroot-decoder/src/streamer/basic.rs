//! Members that read primitives: scalars, inline arrays, counted arrays,
//! strings and reduced-precision floats.

use oxroot_types::{FloatRange, Record, Value};
use oxroot_wire::codes::type_code;
use oxroot_wire::{ArrayKind, ByteCursor, TypedArray};

use super::{Frame, MemberStreamer};
use crate::context::DecodeContext;
use crate::error::DecodeError;

// ── Scalar reads ──────────────────────────────────────────────────────

/// Read one value of basic type `code`.
///
/// # Errors
///
/// Cursor errors, or [`DecodeError::Unsupported`] for a non-scalar code.
pub fn read_scalar(c: &mut ByteCursor<'_>, code: i32) -> Result<Value, DecodeError> {
    let value = match code {
        type_code::CHAR | type_code::LEGACY_CHAR => Value::Int(i64::from(c.read_i8()?)),
        type_code::SHORT => Value::Int(i64::from(c.read_i16()?)),
        type_code::INT | type_code::COUNTER => Value::Int(i64::from(c.read_i32()?)),
        type_code::LONG | type_code::LONG64 => Value::Int(c.read_i64()?),
        type_code::UCHAR => Value::UInt(u64::from(c.read_u8()?)),
        type_code::USHORT => Value::UInt(u64::from(c.read_u16()?)),
        type_code::UINT | type_code::BITS => Value::UInt(u64::from(c.read_u32()?)),
        type_code::ULONG | type_code::ULONG64 => Value::UInt(c.read_u64()?),
        type_code::FLOAT | type_code::DOUBLE32 => Value::Float(f64::from(c.read_f32()?)),
        type_code::DOUBLE => Value::Float(c.read_f64()?),
        type_code::BOOL => Value::Bool(c.read_bool()?),
        other => {
            return Err(DecodeError::Unsupported {
                what: format!("scalar type code {other}"),
            });
        }
    };
    Ok(value)
}

/// Read one element of `kind` as a standalone value.
///
/// # Errors
///
/// Cursor errors.
pub fn read_kind(c: &mut ByteCursor<'_>, kind: ArrayKind) -> Result<Value, DecodeError> {
    let value = match kind {
        ArrayKind::I8 => Value::Int(i64::from(c.read_i8()?)),
        ArrayKind::U8 => Value::UInt(u64::from(c.read_u8()?)),
        ArrayKind::I16 => Value::Int(i64::from(c.read_i16()?)),
        ArrayKind::U16 => Value::UInt(u64::from(c.read_u16()?)),
        ArrayKind::I32 => Value::Int(i64::from(c.read_i32()?)),
        ArrayKind::U32 => Value::UInt(u64::from(c.read_u32()?)),
        ArrayKind::I64 => Value::Int(c.read_i64()?),
        ArrayKind::U64 => Value::UInt(c.read_u64()?),
        ArrayKind::F32 => Value::Float(f64::from(c.read_f32()?)),
        ArrayKind::F64 => Value::Float(c.read_f64()?),
        ArrayKind::Bool => Value::Bool(c.read_bool()?),
        ArrayKind::Str => Value::Str(c.read_tstring()?),
    };
    Ok(value)
}

/// Read one reduced-precision float.
///
/// ```text
///   factor != 0           u32 raw        → raw / factor + xmin
///   Double32, no bits     f32            → as is
///   otherwise             u8 exp, u16 m  → float rebuilt from nbits of mantissa
/// ```
///
/// # Errors
///
/// Cursor errors.
pub fn read_reduced(c: &mut ByteCursor<'_>, code: i32, range: Option<&FloatRange>) -> Result<f64, DecodeError> {
    if let Some(r) = range.filter(|r| r.factor != 0.0) {
        let raw = c.read_u32()?;
        return Ok(f64::from(raw) / r.factor + r.xmin);
    }
    let declared_bits = range.map_or(0.0, |r| r.xmin.round());
    if code == type_code::DOUBLE32 && declared_bits == 0.0 {
        return Ok(f64::from(c.read_f32()?));
    }
    let nbits = range.map_or(12, FloatRange::mantissa_bits);
    let exponent = u32::from(c.read_u8()?);
    let mantissa = u32::from(c.read_u16()?);
    let bits = (exponent << 23) | ((mantissa & ((1 << (nbits + 1)) - 1)) << (23 - nbits));
    let value = f32::from_bits(bits);
    let negative = mantissa & (1 << (nbits + 1)) != 0;
    Ok(f64::from(if negative { -value } else { value }))
}

fn read_reduced_array(
    c: &mut ByteCursor<'_>,
    code: i32,
    range: Option<&FloatRange>,
    n: usize,
) -> Result<TypedArray, DecodeError> {
    if n.saturating_mul(3) > c.remaining() {
        return Err(DecodeError::Wire(oxroot_wire::WireError::OutOfBounds {
            offset: c.position(),
            needed: n.saturating_mul(3),
            limit: c.limit(),
        }));
    }
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        values.push(read_reduced(c, code, range)?);
    }
    #[allow(clippy::cast_possible_truncation)]
    let array = if code == type_code::FLOAT16 {
        TypedArray::F32(values.into_iter().map(|v| v as f32).collect())
    } else {
        TypedArray::F64(values)
    };
    Ok(array)
}

/// Nest a flat array by `dims`, outermost first. One dimension or fewer
/// leaves the array flat.
#[must_use]
pub fn reshape(array: TypedArray, dims: &[i32]) -> Value {
    if dims.len() <= 1 {
        return Value::Array(array);
    }
    let width = |d: i32| usize::try_from(d).unwrap_or(1).max(1);
    let inner = width(dims[dims.len() - 1]);
    let mut level: Vec<Value> = array.chunks(inner).into_iter().map(Value::Array).collect();
    for &d in dims[1..dims.len() - 1].iter().rev() {
        let d = width(d);
        let mut grouped = Vec::with_capacity(level.len() / d + 1);
        let mut items = level.into_iter();
        loop {
            let group: Vec<Value> = items.by_ref().take(d).collect();
            if group.is_empty() {
                break;
            }
            grouped.push(Value::List(group));
        }
        level = grouped;
    }
    Value::List(level)
}

// ── Counters ──────────────────────────────────────────────────────────

/// Where a counted array finds its length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Counter {
    /// A sibling counter member with a frame slot; `name` is the fallback.
    Slot { slot: usize, name: String },
    /// A counter streamed by a base class, found in the record.
    Named(String),
}

impl Counter {
    pub(crate) fn resolve(&self, frame: &Frame, rec: &Record, field: &str) -> Result<usize, DecodeError> {
        let n = match self {
            Self::Slot { slot, name } => frame.counter(*slot).or_else(|| rec.get_i64(name)),
            Self::Named(name) => rec.get_i64(name),
        };
        let n = n.ok_or_else(|| DecodeError::corrupt(field, "counter member not read"))?;
        usize::try_from(n).map_err(|_| DecodeError::corrupt(field, format!("negative count {n}")))
    }
}

// ── Member operations ─────────────────────────────────────────────────

/// One primitive. Counter members also record their value in the frame.
#[derive(Debug)]
pub struct Basic {
    pub name: String,
    pub code: i32,
    pub slot: Option<usize>,
}

impl MemberStreamer for Basic {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, ctx: &mut DecodeContext<'_, '_>, frame: &mut Frame, rec: &mut Record) -> Result<(), DecodeError> {
        let value = read_scalar(ctx.cursor, self.code)?;
        if let Some(slot) = self.slot {
            let count = value
                .as_i64()
                .or_else(|| value.as_u64().and_then(|v| i64::try_from(v).ok()))
                .unwrap_or(-1);
            frame.set_counter(slot, count);
        }
        rec.set(&self.name, value);
        Ok(())
    }
}

/// Shape of a reduced-precision float member.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Scalar,
    Fixed { len: usize, dims: Vec<i32> },
    Counted(Counter),
}

/// `Double32_t` / `Float16_t` members.
#[derive(Debug)]
pub struct ReducedFloat {
    pub name: String,
    pub code: i32,
    pub range: Option<FloatRange>,
    pub shape: Shape,
}

impl MemberStreamer for ReducedFloat {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, ctx: &mut DecodeContext<'_, '_>, frame: &mut Frame, rec: &mut Record) -> Result<(), DecodeError> {
        let range = self.range.as_ref();
        let value = match &self.shape {
            Shape::Scalar => Value::Float(read_reduced(ctx.cursor, self.code, range)?),
            Shape::Fixed { len, dims } => {
                reshape(read_reduced_array(ctx.cursor, self.code, range, *len)?, dims)
            }
            Shape::Counted(counter) => {
                if ctx.cursor.read_u8()? == 0 {
                    Value::Null
                } else {
                    let n = counter.resolve(frame, rec, &self.name)?;
                    Value::Array(read_reduced_array(ctx.cursor, self.code, range, n)?)
                }
            }
        };
        rec.set(&self.name, value);
        Ok(())
    }
}

/// Inline array of `len` primitives, nested by `dims` when multi-dimensional.
#[derive(Debug)]
pub struct FixedArray {
    pub name: String,
    pub kind: ArrayKind,
    pub len: usize,
    pub dims: Vec<i32>,
}

impl MemberStreamer for FixedArray {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, ctx: &mut DecodeContext<'_, '_>, _: &mut Frame, rec: &mut Record) -> Result<(), DecodeError> {
        let array = ctx.cursor.read_array(self.len, self.kind)?;
        rec.set(&self.name, reshape(array, &self.dims));
        Ok(())
    }
}

/// Array sized by a counter member, behind a one-byte presence flag.
#[derive(Debug)]
pub struct CounterArray {
    pub name: String,
    pub kind: ArrayKind,
    pub counter: Counter,
}

impl MemberStreamer for CounterArray {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, ctx: &mut DecodeContext<'_, '_>, frame: &mut Frame, rec: &mut Record) -> Result<(), DecodeError> {
        if ctx.cursor.read_u8()? == 0 {
            rec.set(&self.name, Value::Null);
            return Ok(());
        }
        let n = self.counter.resolve(frame, rec, &self.name)?;
        let array = ctx.cursor.read_array(n, self.kind)?;
        rec.set(&self.name, Value::Array(array));
        Ok(())
    }
}

/// `char*`: i32 length then the bytes.
#[derive(Debug)]
pub struct CharStar {
    pub name: String,
}

impl MemberStreamer for CharStar {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, ctx: &mut DecodeContext<'_, '_>, _: &mut Frame, rec: &mut Record) -> Result<(), DecodeError> {
        let n = ctx.cursor.read_i32()?;
        if n < 0 {
            return Err(DecodeError::corrupt(&self.name, format!("negative length {n}")));
        }
        let text = ctx.cursor.read_fast_string(n)?;
        rec.set(&self.name, Value::Str(text));
        Ok(())
    }
}

/// `TString` and `std::string` members, or inline arrays of them.
#[derive(Debug)]
pub struct Text {
    pub name: String,
    pub array_length: usize,
}

impl MemberStreamer for Text {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, ctx: &mut DecodeContext<'_, '_>, _: &mut Frame, rec: &mut Record) -> Result<(), DecodeError> {
        let value = if self.array_length > 0 {
            Value::Array(ctx.cursor.read_array(self.array_length, ArrayKind::Str)?)
        } else {
            Value::Str(ctx.cursor.read_tstring()?)
        };
        rec.set(&self.name, value);
        Ok(())
    }
}

/// A member the compiler had no read for. Consumes nothing; the byte
/// count check of the enclosing object puts the cursor back in step.
#[derive(Debug)]
pub struct Unsupported {
    pub name: String,
}

impl MemberStreamer for Unsupported {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, _: &mut DecodeContext<'_, '_>, _: &mut Frame, rec: &mut Record) -> Result<(), DecodeError> {
        rec.set(&self.name, Value::Null);
        Ok(())
    }
}
