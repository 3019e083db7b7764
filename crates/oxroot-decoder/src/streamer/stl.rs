//! STL-style containers.
//!
//! A container member is versioned like an object. Bit 14 of its version
//! says the elements were written member-wise: every element's first
//! member, then every element's second member, and so on.
//!
//! ```text
//!   sequence   [u32 n] elem elem elem …
//!   pairs      [u32 n] key value key value …
//!   bitset     [u32 n] bool bool bool …
//!
//!   member-wise sequence  [i16 class version (+u32 checksum)] [u32 n] member runs …
//!   member-wise pairs     [i16 class version (+u32 checksum)] [u32 n]
//!                         [0x4000 + u32]? keys …  [0x4000 + u32]? values …
//! ```
//!
//! Nested containers carry no version of their own.

use oxroot_types::typename::{
    is_string_class, normalize, ordered_stl_kind, stl_kind, strip_pointer, template_arguments,
    type_code_from_name,
};
use oxroot_types::{FieldKind, FieldSchema, Record, Value};
use oxroot_wire::codes::{stl, tag, type_code};
use oxroot_wire::{ArrayKind, TypedArray};

use super::basic::{read_kind, read_reduced};
use super::{Frame, MemberStreamer};
use crate::context::DecodeContext;
use crate::error::DecodeError;
use crate::registry::SchemaRegistry;

/// How one container element is read.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Scalar(ArrayKind),
    /// `Float16_t` elements: truncated floats with 12 mantissa bits.
    Float16,
    Str,
    /// A record read with its own version header.
    Record(String),
    /// A polymorphic pointer.
    Pointer,
    Nested(Box<Container>),
}

impl Element {
    /// Element reader for a C++ type name.
    #[must_use]
    pub fn from_type_name(name: &str, registry: &SchemaRegistry) -> Self {
        let name = normalize(name);
        if strip_pointer(&name).is_some() {
            return Self::Pointer;
        }
        if is_string_class(&name) {
            return Self::Str;
        }
        if let Some(code) = type_code_from_name(&name) {
            return Self::from_code(code).unwrap_or(Self::Record(name));
        }
        if let Some(container) = Container::from_type_name(&name, registry) {
            return Self::Nested(Box::new(container));
        }
        Self::Record(name)
    }

    fn from_code(code: i32) -> Option<Self> {
        match code {
            type_code::FLOAT16 => Some(Self::Float16),
            type_code::DOUBLE32 => Some(Self::Scalar(ArrayKind::F32)),
            code => ArrayKind::from_type_code(code).ok().map(Self::Scalar),
        }
    }

    fn read_one(&self, ctx: &mut DecodeContext<'_, '_>, field: &str) -> Result<Value, DecodeError> {
        match self {
            Self::Scalar(kind) => read_kind(ctx.cursor, *kind),
            Self::Float16 => Ok(Value::Float(read_reduced(ctx.cursor, type_code::FLOAT16, None)?)),
            Self::Str => Ok(Value::Str(ctx.cursor.read_tstring()?)),
            Self::Record(class) => ctx.read_class(class),
            Self::Pointer => ctx.read_object_any(),
            Self::Nested(inner) => inner.read_body(ctx, field),
        }
    }

    /// Read `n` elements; scalars come back as one typed array.
    fn read_many(&self, ctx: &mut DecodeContext<'_, '_>, field: &str, n: usize) -> Result<Value, DecodeError> {
        match self {
            Self::Scalar(kind) => Ok(Value::Array(ctx.cursor.read_array(n, *kind)?)),
            Self::Str => Ok(Value::Array(ctx.cursor.read_array(n, ArrayKind::Str)?)),
            Self::Float16 => {
                let mut values = Vec::with_capacity(n.min(ctx.cursor.remaining()));
                for _ in 0..n {
                    #[allow(clippy::cast_possible_truncation)]
                    let v = read_reduced(ctx.cursor, type_code::FLOAT16, None)? as f32;
                    values.push(v);
                }
                Ok(Value::Array(TypedArray::F32(values)))
            }
            _ => {
                let mut items = Vec::with_capacity(n.min(ctx.cursor.remaining()));
                for _ in 0..n {
                    items.push(self.read_one(ctx, field)?);
                }
                Ok(Value::List(items))
            }
        }
    }
}

/// A resolved container layout.
#[derive(Clone, Debug, PartialEq)]
pub enum Container {
    /// vector, list, deque, set, multiset.
    Sequence { kind: i32, element: Element },
    /// map, multimap.
    Pairs { key: Element, value: Element },
    Bitset,
}

impl Container {
    /// Layout for a container type name such as `map<int,vector<double> >`.
    #[must_use]
    pub fn from_type_name(name: &str, registry: &SchemaRegistry) -> Option<Self> {
        let (base, args) = template_arguments(name)?;
        let kind = stl_kind(&base)?;
        Self::from_parts(kind, &args, registry)
    }

    fn from_parts(kind: i32, args: &[String], registry: &SchemaRegistry) -> Option<Self> {
        match ordered_stl_kind(kind) {
            stl::BITSET => Some(Self::Bitset),
            stl::MAP | stl::MULTIMAP => {
                let pair = format!("pair<{}>", args.join(","));
                let (key, value) = pair_elements(&pair, args, registry)?;
                Some(Self::Pairs { key, value })
            }
            kind => {
                let element = Element::from_type_name(args.first()?, registry);
                Some(Self::Sequence { kind, element })
            }
        }
    }

    /// Layout for a container member of a class schema.
    ///
    /// The type name is authoritative; when it cannot be parsed the
    /// recorded container kind and element type code are used instead.
    #[must_use]
    pub fn for_field(field: &FieldSchema, registry: &SchemaRegistry) -> Option<Self> {
        if let Some(found) = Self::from_type_name(&field.type_name, registry) {
            return Some(found);
        }
        let FieldKind::Stl { stl_type, ctype } = field.kind else {
            return None;
        };
        match ordered_stl_kind(stl_type) {
            stl::BITSET => Some(Self::Bitset),
            stl::NOT_STL | stl::MAP | stl::MULTIMAP => None,
            kind => Some(Self::Sequence {
                kind,
                element: Element::from_code(ctype)?,
            }),
        }
    }

    /// Unversioned body: count then elements.
    ///
    /// # Errors
    ///
    /// Cursor errors, or [`DecodeError::Corrupt`] for a count above the
    /// object-wise ceiling.
    pub fn read_body(&self, ctx: &mut DecodeContext<'_, '_>, field: &str) -> Result<Value, DecodeError> {
        let n = ctx.cursor.read_u32()?;
        let n = ctx.check_count(field, u64::from(n), false)?;
        match self {
            Self::Sequence { element, .. } => element.read_many(ctx, field, n),
            Self::Pairs { key, value } => {
                let mut pairs = Vec::with_capacity(n.min(ctx.cursor.remaining()));
                for _ in 0..n {
                    let k = key.read_one(ctx, field)?;
                    let v = value.read_one(ctx, field)?;
                    pairs.push((k, v));
                }
                Ok(Value::Map(pairs))
            }
            Self::Bitset => Ok(Value::Array(ctx.cursor.read_array(n, ArrayKind::Bool)?)),
        }
    }

    /// Body written member-wise.
    ///
    /// # Errors
    ///
    /// Cursor errors, ceiling violations, or a missing element schema.
    pub fn read_memberwise(&self, ctx: &mut DecodeContext<'_, '_>, field: &str) -> Result<Value, DecodeError> {
        let version = ctx.cursor.read_i16()?;
        let checksum = if version <= 0 { Some(ctx.cursor.read_u32()?) } else { None };
        let n = ctx.cursor.read_u32()?;
        let n = ctx.check_count(field, u64::from(n), true)?;
        match self {
            Self::Sequence {
                element: Element::Record(class),
                ..
            } => Ok(Value::List(ctx.read_memberwise(class, version, checksum, n)?)),
            Self::Sequence { element, .. } => element.read_many(ctx, field, n),
            Self::Pairs { key, value } => {
                skip_memberwise_marker(ctx)?;
                let keys = key.read_many(ctx, field, n)?;
                skip_memberwise_marker(ctx)?;
                let values = value.read_many(ctx, field, n)?;
                Ok(Value::Map(zip_runs(keys, values)))
            }
            Self::Bitset => Ok(Value::Array(ctx.cursor.read_array(n, ArrayKind::Bool)?)),
        }
    }
}

/// Key and value readers for `pair<K,V>`: from the pair's own schema when
/// the file carries one, otherwise from the template arguments.
fn pair_elements(pair: &str, args: &[String], registry: &SchemaRegistry) -> Option<(Element, Element)> {
    if let Some(schema) = registry.latest(pair) {
        if let (Some(first), Some(second)) = (schema.field("first"), schema.field("second")) {
            return Some((
                Element::from_type_name(&first.type_name, registry),
                Element::from_type_name(&second.type_name, registry),
            ));
        }
    }
    match args {
        [k, v] => Some((
            Element::from_type_name(k, registry),
            Element::from_type_name(v, registry),
        )),
        _ => None,
    }
}

fn skip_memberwise_marker(ctx: &mut DecodeContext<'_, '_>) -> Result<(), DecodeError> {
    if ctx.cursor.remaining() < 6 {
        return Ok(());
    }
    let start = ctx.cursor.position();
    if ctx.cursor.read_i16()? == tag::STREAMED_MEMBERWISE {
        ctx.cursor.skip(4)?;
    } else {
        ctx.cursor.seek(start)?;
    }
    Ok(())
}

/// Pair up two element runs of the same length.
fn zip_runs(keys: Value, values: Value) -> Vec<(Value, Value)> {
    let keys = explode(keys);
    let values = explode(values);
    keys.into_iter().zip(values).collect()
}

fn explode(run: Value) -> Vec<Value> {
    let Value::Array(array) = run else {
        return match run {
            Value::List(items) => items,
            other => vec![other],
        };
    };
    match array {
        TypedArray::I8(v) => v.into_iter().map(|x| Value::Int(x.into())).collect(),
        TypedArray::U8(v) => v.into_iter().map(|x| Value::UInt(x.into())).collect(),
        TypedArray::I16(v) => v.into_iter().map(|x| Value::Int(x.into())).collect(),
        TypedArray::U16(v) => v.into_iter().map(|x| Value::UInt(x.into())).collect(),
        TypedArray::I32(v) => v.into_iter().map(|x| Value::Int(x.into())).collect(),
        TypedArray::U32(v) => v.into_iter().map(|x| Value::UInt(x.into())).collect(),
        TypedArray::I64(v) => v.into_iter().map(Value::Int).collect(),
        TypedArray::U64(v) => v.into_iter().map(Value::UInt).collect(),
        TypedArray::F32(v) => v.into_iter().map(|x| Value::Float(x.into())).collect(),
        TypedArray::F64(v) => v.into_iter().map(Value::Float).collect(),
        TypedArray::Bool(v) => v.into_iter().map(Value::Bool).collect(),
        TypedArray::Str(v) => v.into_iter().map(Value::Str).collect(),
    }
}

// ── Member operation ──────────────────────────────────────────────────

/// A container member, versioned.
#[derive(Debug)]
pub struct Stl {
    pub name: String,
    pub container: Container,
}

impl MemberStreamer for Stl {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, ctx: &mut DecodeContext<'_, '_>, _: &mut Frame, rec: &mut Record) -> Result<(), DecodeError> {
        let token = ctx.cursor.read_version(|_| false)?;
        let value = ctx.versioned_body(&token, &self.name, |ctx| {
            if token.memberwise() {
                self.container.read_memberwise(ctx, &self.name)
            } else {
                self.container.read_body(ctx, &self.name)
            }
        })?;
        rec.set(&self.name, value);
        Ok(())
    }
}
