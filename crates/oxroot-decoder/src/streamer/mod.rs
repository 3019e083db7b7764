//! Compiled read plans for one class version.
//!
//! A [`ClassSchema`](oxroot_types::ClassSchema) lists a class's members in
//! wire order. [`compile`] turns each member into a [`MemberStreamer`], a
//! small object that knows how to read exactly that member, and collects
//! them into a [`CompiledStreamer`]. The registry memoizes compiled
//! streamers, so the per-schema work happens once.
//!
//! ```text
//!   ClassSchema ──compile──▶ CompiledStreamer [op, op, op, …]
//!                                  │
//!         DecodeContext ──read──▶ Record { field: Value, … }
//! ```

pub mod basic;
pub mod compile;
pub mod object;
pub mod stl;

use std::fmt;
use std::sync::Arc;

use oxroot_types::{DecodeWarning, Record, Value};
use oxroot_wire::VersionToken;

use crate::builtin::Builtin;
use crate::context::DecodeContext;
use crate::error::DecodeError;
use crate::registry::SchemaRegistry;

pub use compile::compile;

/// Reads one member of a class into the record being built.
pub trait MemberStreamer: fmt::Debug + Send + Sync {
    /// Field name the member is stored under.
    fn name(&self) -> &str;

    /// Read the member at the cursor and store it in `rec`.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`]; recoverable ones are absorbed by the class
    /// streamer that owns this member.
    fn read(
        &self,
        ctx: &mut DecodeContext<'_, '_>,
        frame: &mut Frame,
        rec: &mut Record,
    ) -> Result<(), DecodeError>;

    /// Ancestor class and version, for members that stream a base class.
    fn base_class(&self) -> Option<(&str, i32)> {
        None
    }
}

/// Shared handle to a member operation.
pub type MemberOp = Arc<dyn MemberStreamer>;

/// Per-object scratch space: the values of counter members, indexed by
/// the slot the compiler assigned them.
///
/// Flattened base-class members read through a shifted window of the
/// same frame, so their slot numbers never collide with the derived
/// class's.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    slots: Vec<Option<i64>>,
    base: usize,
}

impl Frame {
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            slots: vec![None; slots],
            base: 0,
        }
    }

    #[must_use]
    pub fn counter(&self, slot: usize) -> Option<i64> {
        self.slots.get(self.base + slot).copied().flatten()
    }

    pub fn set_counter(&mut self, slot: usize, value: i64) {
        if let Some(s) = self.slots.get_mut(self.base + slot) {
            *s = Some(value);
        }
    }
}

/// The member operations for one class version.
#[derive(Debug)]
pub struct CompiledStreamer {
    pub class_name: String,
    pub version: i32,
    pub checksum: u32,
    pub(crate) ops: Vec<MemberOp>,
    pub(crate) slots: usize,
    /// Members the compiler could not turn into a read.
    pub(crate) unsupported: Vec<DecodeWarning>,
}

impl CompiledStreamer {
    #[must_use]
    pub fn ops(&self) -> &[MemberOp] {
        &self.ops
    }

    /// Number of counter slots a [`Frame`] for this class needs.
    #[must_use]
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Run every member against one object body.
    ///
    /// When the body has a byte count, a recoverable failure nulls the
    /// failing member and everything after it, then moves the cursor to
    /// the end of the window. Without a byte count there is nowhere to
    /// resync to and the error is returned.
    ///
    /// # Errors
    ///
    /// Unrecoverable errors, or any error when `token` has no byte count.
    pub fn read(
        &self,
        ctx: &mut DecodeContext<'_, '_>,
        token: &VersionToken,
        rec: &mut Record,
    ) -> Result<(), DecodeError> {
        let mut frame = Frame::new(self.slots);
        for (i, op) in self.ops.iter().enumerate() {
            match op.read(ctx, &mut frame, rec) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() && token.end().is_some() => {
                    ctx.warn(DecodeWarning::FieldNulled {
                        class: self.class_name.clone(),
                        field: op.name().to_string(),
                        reason: e.to_string(),
                    });
                    for later in &self.ops[i..] {
                        if later.base_class().is_none() {
                            rec.set(later.name(), Value::Null);
                        }
                    }
                    let end = ctx.cursor.limit();
                    ctx.cursor.seek(end)?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Flatten base classes into one operation list for member-wise reads.
    ///
    /// Returns the operations and the number of frame slots they use.
    ///
    /// # Errors
    ///
    /// [`DecodeError::SchemaNotFound`] for a base class with no streamer,
    /// [`DecodeError::Unsupported`] for a base that cannot be flattened.
    pub fn split(&self, registry: &SchemaRegistry) -> Result<(Vec<MemberOp>, usize), DecodeError> {
        let mut ops = Vec::with_capacity(self.ops.len());
        let mut slots = self.slots;
        for op in &self.ops {
            let Some((class, version)) = op.base_class() else {
                ops.push(Arc::clone(op));
                continue;
            };
            let base = registry
                .streamer(class, version, None)
                .ok_or_else(|| DecodeError::SchemaNotFound {
                    class: class.to_string(),
                    version,
                })?;
            let (base_ops, base_slots) = base.split(registry)?;
            let offset = slots;
            slots += base_slots;
            ops.extend(base_ops.into_iter().map(|inner| {
                if offset == 0 {
                    inner
                } else {
                    Arc::new(Rebased { inner, offset }) as MemberOp
                }
            }));
        }
        Ok((ops, slots))
    }
}

/// A flattened base-class member reading through a shifted frame.
#[derive(Debug)]
struct Rebased {
    inner: MemberOp,
    offset: usize,
}

impl MemberStreamer for Rebased {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn read(
        &self,
        ctx: &mut DecodeContext<'_, '_>,
        frame: &mut Frame,
        rec: &mut Record,
    ) -> Result<(), DecodeError> {
        frame.base += self.offset;
        let result = self.inner.read(ctx, frame, rec);
        frame.base -= self.offset;
        result
    }
}

/// Whatever reads a class body: a compiled schema or a fixed layout.
#[derive(Debug)]
pub enum Streamer {
    Compiled(CompiledStreamer),
    Builtin(Builtin),
}

impl Streamer {
    #[must_use]
    pub fn class_name(&self) -> &str {
        match self {
            Self::Compiled(s) => &s.class_name,
            Self::Builtin(b) => b.class_name(),
        }
    }

    /// Read one object body; the version token has already been consumed.
    ///
    /// # Errors
    ///
    /// As for [`CompiledStreamer::read`] and [`Builtin::read`].
    pub fn read(
        &self,
        ctx: &mut DecodeContext<'_, '_>,
        token: &VersionToken,
        rec: &mut Record,
    ) -> Result<(), DecodeError> {
        match self {
            Self::Compiled(s) => s.read(ctx, token, rec),
            Self::Builtin(b) => b.read(ctx, token, rec),
        }
    }

    /// Member operations with base classes flattened.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Unsupported`] for fixed layouts that have no
    /// member-wise form.
    pub fn split(&self, registry: &SchemaRegistry) -> Result<(Vec<MemberOp>, usize), DecodeError> {
        match self {
            Self::Compiled(s) => s.split(registry),
            Self::Builtin(b) => b.split_ops().map(|ops| (ops, 0)).ok_or_else(|| {
                DecodeError::Unsupported {
                    what: format!("member-wise {}", b.class_name()),
                }
            }),
        }
    }

    /// Warnings produced when the streamer was compiled.
    #[must_use]
    pub fn compile_warnings(&self) -> &[DecodeWarning] {
        match self {
            Self::Compiled(s) => &s.unsupported,
            Self::Builtin(_) => &[],
        }
    }
}
