//! Members that hold other objects: base classes, embedded records,
//! pointers and counted loops.

use oxroot_types::typename::tarray_kind;
use oxroot_types::{Record, Value};
use oxroot_wire::ArrayKind;

use super::basic::Counter;
use super::{Frame, MemberStreamer};
use crate::context::DecodeContext;
use crate::error::DecodeError;

/// Ancestor class streamed into the same record.
///
/// `TArray*` ancestors carry no members of their own on the wire, just a
/// count and the data, which land in `fArray`.
#[derive(Debug)]
pub struct Base {
    class: String,
    version: i32,
    array: Option<ArrayKind>,
}

impl Base {
    #[must_use]
    pub fn new(class: impl Into<String>, version: i32) -> Self {
        let class = class.into();
        let array = tarray_kind(&class);
        Self { class, version, array }
    }
}

impl MemberStreamer for Base {
    fn name(&self) -> &str {
        if self.array.is_some() { "fArray" } else { &self.class }
    }

    fn read(&self, ctx: &mut DecodeContext<'_, '_>, _: &mut Frame, rec: &mut Record) -> Result<(), DecodeError> {
        match self.array {
            Some(kind) => {
                let data = ctx.read_tarray(kind)?;
                rec.set("fArray", data);
                Ok(())
            }
            None => ctx.stream_into(&self.class, rec),
        }
    }

    fn base_class(&self) -> Option<(&str, i32)> {
        match self.array {
            Some(_) => None,
            None => Some((&self.class, self.version)),
        }
    }
}

/// A record stored inline, or an inline array of them.
#[derive(Debug)]
pub struct Embedded {
    pub name: String,
    pub class: String,
    pub array_length: usize,
}

impl MemberStreamer for Embedded {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, ctx: &mut DecodeContext<'_, '_>, _: &mut Frame, rec: &mut Record) -> Result<(), DecodeError> {
        let value = if self.array_length > 0 {
            let mut items = Vec::with_capacity(self.array_length);
            for _ in 0..self.array_length {
                items.push(ctx.read_class(&self.class)?);
            }
            Value::List(items)
        } else {
            ctx.read_class(&self.class)?
        };
        rec.set(&self.name, value);
        Ok(())
    }
}

/// A polymorphic pointer (class tag, then the object or a back-reference).
#[derive(Debug)]
pub struct Pointer {
    pub name: String,
    pub array_length: usize,
}

impl MemberStreamer for Pointer {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, ctx: &mut DecodeContext<'_, '_>, _: &mut Frame, rec: &mut Record) -> Result<(), DecodeError> {
        let value = if self.array_length > 0 {
            let mut items = Vec::with_capacity(self.array_length);
            for _ in 0..self.array_length {
                items.push(ctx.read_object_any()?);
            }
            Value::List(items)
        } else {
            ctx.read_object_any()?
        };
        rec.set(&self.name, value);
        Ok(())
    }
}

/// Versioned run of `counter` records of `class`, or of `counter`
/// polymorphic pointers when `pointers` is set.
#[derive(Debug)]
pub struct Loop {
    pub name: String,
    pub class: String,
    pub pointers: bool,
    pub counter: Counter,
}

impl MemberStreamer for Loop {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, ctx: &mut DecodeContext<'_, '_>, frame: &mut Frame, rec: &mut Record) -> Result<(), DecodeError> {
        let token = ctx.cursor.read_version(|_| false)?;
        let value = ctx.versioned_body(&token, &self.name, |ctx| {
            let n = self.counter.resolve(frame, rec, &self.name)?;
            let n = ctx.check_count(&self.name, n as u64, false)?;
            let mut items = Vec::with_capacity(n.min(ctx.cursor.remaining()));
            for _ in 0..n {
                let item = if self.pointers {
                    ctx.read_object_any()?
                } else {
                    ctx.read_class(&self.class)?
                };
                items.push(item);
            }
            Ok(Value::List(items))
        })?;
        rec.set(&self.name, value);
        Ok(())
    }
}
