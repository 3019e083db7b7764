//! Big-endian buffer writer mirroring [`oxroot_wire::ByteCursor`].
//!
//! Object and class tags are positions in the writer's buffer biased by
//! `tag_offset`, exactly as the reader computes them, so a payload written
//! with `BufferWriter::with_tag_offset(keylen)` lines up with a cursor
//! built by `ByteCursor::with_tag_offset(payload, keylen)`.

use std::collections::HashMap;

use oxroot_wire::codes::tag::{BYTE_COUNT_MASK, CLASS_MASK, MAP_OFFSET, NEW_CLASS_TAG};

#[derive(Debug, Default)]
pub struct BufferWriter {
    buf: Vec<u8>,
    tag_offset: u32,
    classes: HashMap<String, u32>,
}

/// Position of a byte-count placeholder, closed with
/// [`BufferWriter::end_versioned`] or [`BufferWriter::end_object`].
#[must_use]
#[derive(Debug)]
pub struct Mark(usize);

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag_offset(tag_offset: u32) -> Self {
        Self {
            tag_offset,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    // ── Primitives ───────────────────────────────────────────────────

    pub fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(b);
        self
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.u8(u8::from(v))
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn f64(&mut self, v: f64) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    /// Length-prefixed string: one byte, or 255 plus a u32 for long ones.
    pub fn tstring(&mut self, s: &str) -> &mut Self {
        let len = s.len();
        match u8::try_from(len) {
            Ok(n) if n < 255 => {
                self.u8(n);
            }
            _ => {
                self.u8(255);
                self.u32(u32::try_from(len).unwrap_or(u32::MAX));
            }
        }
        self.bytes(s.as_bytes())
    }

    /// Overwrite four bytes at `pos`.
    pub fn patch_u32(&mut self, pos: usize, v: u32) {
        self.buf[pos..pos + 4].copy_from_slice(&v.to_be_bytes());
    }

    // ── Versioned bodies ─────────────────────────────────────────────

    /// Byte count placeholder followed by `version`.
    pub fn begin_versioned(&mut self, version: i16) -> Mark {
        let mark = Mark(self.buf.len());
        self.u32(0);
        self.i16(version);
        mark
    }

    /// Patch the byte count opened by [`begin_versioned`](Self::begin_versioned).
    pub fn end_versioned(&mut self, mark: Mark) {
        self.close(mark.0);
    }

    /// A complete versioned body written by `body`.
    pub fn versioned(&mut self, version: i16, body: impl FnOnce(&mut Self)) -> &mut Self {
        let mark = self.begin_versioned(version);
        body(self);
        self.end_versioned(mark);
        self
    }

    /// `TObject` base: bare version, unique id, bits.
    pub fn tobject(&mut self, bits: u32) -> &mut Self {
        self.i16(1).u32(0).u32(bits);
        if bits & oxroot_wire::codes::tag::IS_REFERENCED != 0 {
            self.u16(0);
        }
        self
    }

    /// `TNamed` base, versioned.
    pub fn tnamed(&mut self, bits: u32, name: &str, title: &str) -> &mut Self {
        self.versioned(1, |w| {
            w.tobject(bits).tstring(name).tstring(title);
        })
    }

    // ── Polymorphic pointers ─────────────────────────────────────────

    /// Null pointer.
    pub fn null(&mut self) -> &mut Self {
        self.u32(0)
    }

    /// Reference to an object written earlier in this buffer.
    pub fn object_ref(&mut self, tag: u32) -> &mut Self {
        self.u32(tag)
    }

    /// Open a polymorphic object of `class`. Returns the tag later
    /// pointers use to refer back to it.
    pub fn begin_object(&mut self, class: &str) -> (u32, Mark) {
        let start = self.buf.len();
        let tag = self.tag_at(start);
        self.u32(0);
        match self.classes.get(class) {
            Some(&class_tag) => {
                self.u32(class_tag | CLASS_MASK);
            }
            None => {
                let class_tag = self.tag_at(start + 4);
                self.classes.insert(class.to_string(), class_tag);
                self.u32(NEW_CLASS_TAG);
                self.bytes(class.as_bytes()).u8(0);
            }
        }
        (tag, Mark(start))
    }

    pub fn end_object(&mut self, mark: Mark) {
        self.close(mark.0);
    }

    /// A complete polymorphic object; `body` writes its versioned body.
    pub fn object(&mut self, class: &str, body: impl FnOnce(&mut Self)) -> u32 {
        let (tag, mark) = self.begin_object(class);
        body(self);
        self.end_object(mark);
        tag
    }

    #[allow(clippy::cast_possible_truncation)]
    fn tag_at(&self, pos: usize) -> u32 {
        self.tag_offset + pos as u32 + MAP_OFFSET
    }

    #[allow(clippy::cast_possible_truncation)]
    fn close(&mut self, start: usize) {
        let count = (self.buf.len() - start - 4) as u32;
        self.patch_u32(start, count | BYTE_COUNT_MASK);
    }
}

#[cfg(test)]
mod tests {
    use oxroot_wire::{ByteCursor, ClassRef};

    use super::*;

    #[test]
    fn versioned_body_matches_reader() {
        let mut w = BufferWriter::new();
        w.versioned(3, |w| {
            w.i32(7);
        });
        let bytes = w.into_inner();
        let mut c = ByteCursor::new(&bytes);
        let token = c.read_version(|_| false).unwrap();
        assert_eq!(token.version, 3);
        assert_eq!(token.end(), Some(bytes.len()));
    }

    #[test]
    fn class_tags_line_up_with_reader() {
        let mut w = BufferWriter::with_tag_offset(50);
        w.object("TNamed", |w| {
            w.versioned(1, |_| {});
        });
        w.object("TNamed", |w| {
            w.versioned(1, |_| {});
        });
        let bytes = w.into_inner();
        let mut c = ByteCursor::with_tag_offset(&bytes, 50);
        let first = c.read_class_header().unwrap();
        c.seek(first.end().unwrap()).unwrap();
        let second = c.read_class_header().unwrap();
        assert_eq!(second.class, ClassRef::Class("TNamed".into()));
    }
}
