//! Per-buffer decode state.
//!
//! A [`DecodeContext`] lives for one top-level object. It borrows the
//! cursor (which owns the tag maps) and the schema registry, and owns the
//! object arena plus the warnings absorbed along the way. Every read that
//! can recurse (pointers, embedded classes, containers of records) goes
//! through here so byte-count windows and recovery are handled once.
//!
//! ```text
//!   read_object_any ─┬─ null / back-reference ─────────────▶ Value
//!                    └─ new object ─ reserve slot ─ map tag
//!                                     └─ stream_into ─ fill ─▶ Value::Ref
//! ```

use std::collections::HashSet;

use oxroot_types::typename::{is_string_class, tarray_kind};
use oxroot_types::{DecodeWarning, DecodedObject, ObjectGraph, Record, Value};
use oxroot_wire::{ArrayKind, ByteCursor, ClassRef, VersionToken};
use tracing::{debug, trace};

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::registry::{SchemaRegistry, canonical_name};
use crate::streamer::{Frame, Streamer};

pub struct DecodeContext<'c, 'b> {
    pub cursor: &'c mut ByteCursor<'b>,
    registry: &'c SchemaRegistry,
    config: &'c DecoderConfig,
    graph: ObjectGraph,
    diagnostics: Vec<DecodeWarning>,
    reported: HashSet<String>,
    class_stack: Vec<String>,
}

impl<'c, 'b> DecodeContext<'c, 'b> {
    pub fn new(cursor: &'c mut ByteCursor<'b>, registry: &'c SchemaRegistry, config: &'c DecoderConfig) -> Self {
        Self {
            cursor,
            registry,
            config,
            graph: ObjectGraph::new(),
            diagnostics: Vec::new(),
            reported: HashSet::new(),
            class_stack: Vec::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &'c SchemaRegistry {
        self.registry
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[DecodeWarning] {
        &self.diagnostics
    }

    /// Class whose body is being read, or `""` at the top level.
    #[must_use]
    pub fn current_class(&self) -> &str {
        self.class_stack.last().map_or("", String::as_str)
    }

    /// Record a recoverable problem.
    pub fn warn(&mut self, warning: DecodeWarning) {
        debug!(%warning, "absorbed");
        self.diagnostics.push(warning);
    }

    /// Hand over the arena and warnings.
    #[must_use]
    pub fn finish(self, root: Value) -> DecodedObject {
        DecodedObject {
            graph: self.graph,
            root,
            diagnostics: self.diagnostics,
        }
    }

    // ── Versioned bodies ──────────────────────────────────────────────

    /// Stream the body of `class` into `rec`, starting at its version
    /// record.
    ///
    /// Base classes call this with the derived record so their members
    /// land beside the derived ones.
    ///
    /// # Errors
    ///
    /// Any error when the body has no byte count to resync on;
    /// unrecoverable errors always.
    pub fn stream_into(&mut self, class: &str, rec: &mut Record) -> Result<(), DecodeError> {
        let class = canonical_name(class);
        let registry = self.registry;
        let token = self.cursor.read_version(|sum| registry.knows_checksum(&class, sum))?;
        let version = i32::from(token.class_version());
        trace!(class = %class, version, at = token.start, "stream");

        if token.class_version() > self.config.max_class_version {
            self.warn(DecodeWarning::VersionOutOfRange {
                class: class.clone(),
                version,
            });
            return match token.end() {
                Some(end) => self.resync(end),
                None => Err(DecodeError::corrupt(class, format!("version {version} out of range"))),
            };
        }

        let Some(streamer) = registry.streamer(&class, version, token.checksum) else {
            return match token.end() {
                Some(end) => {
                    self.warn(DecodeWarning::SchemaNotFound { class, version });
                    self.resync(end)
                }
                None => Err(DecodeError::SchemaNotFound { class, version }),
            };
        };
        self.report_compile_warnings(&streamer);

        self.class_stack.push(class.clone());
        let result = self.windowed(token.end(), |ctx| streamer.read(ctx, &token, rec));
        self.class_stack.pop();

        match (result, token.end()) {
            (Ok(()), end) => self.close(end, &class),
            (Err(e), Some(end)) if e.is_recoverable() => {
                self.absorb(&class, &e);
                self.resync(end)
            }
            (Err(e), _) => Err(e),
        }
    }

    /// Run `f` over the body described by `token`, absorbing recoverable
    /// failures as a null value when the body has a byte count.
    ///
    /// # Errors
    ///
    /// Whatever `f` returns when it cannot be absorbed.
    pub fn versioned_body(
        &mut self,
        token: &VersionToken,
        context: &str,
        f: impl FnOnce(&mut Self) -> Result<Value, DecodeError>,
    ) -> Result<Value, DecodeError> {
        match (self.windowed(token.end(), f), token.end()) {
            (Ok(value), end) => {
                self.close(end, context)?;
                Ok(value)
            }
            (Err(e), Some(end)) if e.is_recoverable() => {
                self.warn(DecodeWarning::FieldNulled {
                    class: self.current_class().to_string(),
                    field: context.to_string(),
                    reason: e.to_string(),
                });
                self.resync(end)?;
                Ok(Value::Null)
            }
            (Err(e), _) => Err(e),
        }
    }

    fn windowed<T>(
        &mut self,
        end: Option<usize>,
        f: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        let previous = end.map(|end| self.cursor.push_limit(end));
        let result = f(self);
        if let Some(previous) = previous {
            self.cursor.pop_limit(previous);
        }
        result
    }

    /// Compare the cursor with a declared end and move to it on a mismatch.
    fn close(&mut self, end: Option<usize>, class: &str) -> Result<(), DecodeError> {
        let Some(expected) = end else {
            return Ok(());
        };
        let actual = self.cursor.position();
        if actual != expected {
            self.warn(DecodeWarning::ByteCountMismatch {
                class: class.to_string(),
                expected,
                actual,
            });
            self.resync(expected)?;
        }
        Ok(())
    }

    fn resync(&mut self, end: usize) -> Result<(), DecodeError> {
        self.cursor.seek(end)?;
        Ok(())
    }

    fn absorb(&mut self, class: &str, error: &DecodeError) {
        let warning = match error {
            DecodeError::SchemaNotFound { class, version } => DecodeWarning::SchemaNotFound {
                class: class.clone(),
                version: *version,
            },
            other => DecodeWarning::FieldNulled {
                class: class.to_string(),
                field: "*".to_string(),
                reason: other.to_string(),
            },
        };
        trace!(class, "body abandoned");
        self.warn(warning);
    }

    fn report_compile_warnings(&mut self, streamer: &Streamer) {
        let warnings = streamer.compile_warnings();
        if warnings.is_empty() || !self.reported.insert(streamer.class_name().to_string()) {
            return;
        }
        for warning in warnings {
            self.warn(warning.clone());
        }
    }

    // ── Objects ───────────────────────────────────────────────────────

    /// Read a polymorphic pointer: class header, then a new object or a
    /// back-reference to one already read.
    ///
    /// New objects are reserved in the arena and mapped before their body
    /// is read, so a pointer back to an object under construction
    /// resolves to its slot.
    ///
    /// # Errors
    ///
    /// Truncated headers, an unknown class with no byte count, and
    /// unrecoverable body errors.
    pub fn read_object_any(&mut self) -> Result<Value, DecodeError> {
        let tag = self.cursor.next_object_tag();
        let header = self.cursor.read_class_header()?;
        let end = header.end();
        let class = match header.class {
            ClassRef::Object(0) => return Ok(Value::Null),
            ClassRef::Object(t) => {
                return Ok(match self.cursor.mapped_object(t) {
                    Some(slot) => Value::Ref(slot),
                    None => {
                        self.warn(DecodeWarning::UnknownObjectTag { tag: t });
                        Value::Null
                    }
                });
            }
            ClassRef::Unknown(t) => {
                self.warn(DecodeWarning::UnknownClassTag { tag: t });
                return match end {
                    Some(end) => self.resync(end).map(|()| Value::Null),
                    None => Err(DecodeError::corrupt("class header", format!("unknown class tag {t}"))),
                };
            }
            ClassRef::Class(name) => canonical_name(&name),
        };

        if is_string_class(&class) {
            let value = self.windowed(end, |ctx| Ok(Value::Str(ctx.cursor.read_tstring()?)))?;
            self.close(end, &class)?;
            return Ok(value);
        }
        if let Some(kind) = tarray_kind(&class) {
            let value = self.windowed(end, |ctx| ctx.read_tarray(kind))?;
            self.close(end, &class)?;
            let slot = self.graph.insert(value);
            self.cursor.map_object(tag, slot);
            return Ok(Value::Ref(slot));
        }

        let slot = self.graph.reserve();
        self.cursor.map_object(tag, slot);
        let mut rec = Record::new(class.as_str());
        let result = self.windowed(end, |ctx| ctx.stream_into(&class, &mut rec));
        if let Err(e) = result {
            if !(e.is_recoverable() && end.is_some()) {
                return Err(e);
            }
            self.absorb(&class, &e);
        }
        self.graph.fill(slot, rec.into());
        self.close(end, &class)?;
        Ok(Value::Ref(slot))
    }

    /// Read an inline (non-pointer) instance of `class`.
    ///
    /// # Errors
    ///
    /// As for [`stream_into`](Self::stream_into).
    pub fn read_class(&mut self, class: &str) -> Result<Value, DecodeError> {
        let class = canonical_name(class);
        if is_string_class(&class) {
            return Ok(Value::Str(self.cursor.read_tstring()?));
        }
        if let Some(kind) = tarray_kind(&class) {
            return self.read_tarray(kind);
        }
        let mut rec = Record::new(class.as_str());
        self.stream_into(&class, &mut rec)?;
        Ok(rec.into())
    }

    /// `TArray*` payload: a count then the data.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Wire`] when the data runs past the window.
    pub fn read_tarray(&mut self, kind: ArrayKind) -> Result<Value, DecodeError> {
        let n = self.cursor.read_u32()? as usize;
        Ok(Value::Array(self.cursor.read_array(n, kind)?))
    }

    /// Validate an element count against the configured ceiling.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Corrupt`] when `n` exceeds the ceiling; a
    /// [`DecodeWarning::CollectionTooLarge`] is recorded first.
    pub fn check_count(&mut self, field: &str, n: u64, memberwise: bool) -> Result<usize, DecodeError> {
        let ceiling = if memberwise {
            self.config.memberwise_ceiling
        } else {
            self.config.objectwise_ceiling
        };
        if n > ceiling {
            self.warn(DecodeWarning::CollectionTooLarge {
                field: field.to_string(),
                count: n,
                ceiling,
            });
            return Err(DecodeError::corrupt(field, format!("{n} elements exceeds ceiling {ceiling}")));
        }
        usize::try_from(n).map_err(|_| DecodeError::corrupt(field, "count does not fit in memory"))
    }

    /// Read `n` records of `class` stored member by member: every
    /// member's values for all `n` objects, then the next member.
    ///
    /// # Errors
    ///
    /// [`DecodeError::SchemaNotFound`] when the class is unknown, and any
    /// member read error.
    pub fn read_memberwise(
        &mut self,
        class: &str,
        version: i16,
        checksum: Option<u32>,
        n: usize,
    ) -> Result<Vec<Value>, DecodeError> {
        let class = canonical_name(class);
        let version = i32::from(version);
        let streamer = self
            .registry
            .streamer(&class, version, checksum)
            .ok_or_else(|| DecodeError::SchemaNotFound {
                class: class.clone(),
                version,
            })?;
        self.report_compile_warnings(&streamer);
        let (ops, slots) = streamer.split(self.registry)?;

        let mut records: Vec<Record> = (0..n).map(|_| Record::new(class.as_str())).collect();
        let mut frames = vec![Frame::new(slots); n];
        self.class_stack.push(class);
        let mut result = Ok(());
        'ops: for op in &ops {
            for (rec, frame) in records.iter_mut().zip(frames.iter_mut()) {
                if let Err(e) = op.read(self, frame, rec) {
                    result = Err(e);
                    break 'ops;
                }
            }
        }
        self.class_stack.pop();
        result?;
        Ok(records.into_iter().map(Value::from).collect())
    }
}
