use std::collections::HashMap;

use crate::array::{ArrayKind, TypedArray};
use crate::codes::tag::{BYTE_COUNT_MASK, CLASS_MASK, MAP_OFFSET, NEW_CLASS_TAG, STREAMED_MEMBERWISE};
use crate::error::WireError;

/// Index of a decoded object in the arena that owns it.
///
/// The cursor only stores these; the arena itself lives in the decoder's
/// object graph. A ref is meaningful only together with the cursor (and
/// graph) that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(pub u32);

impl ObjectRef {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Result of reading the class preamble of a polymorphic object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassRef {
    /// Back-reference to an object already seen in this buffer. Tag 0 is null.
    Object(u32),
    /// A class name, either spelled out or found in the class map.
    Class(String),
    /// A class back-reference whose tag was never registered.
    Unknown(u32),
}

/// Class preamble plus the byte count that framed it, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassHeader {
    pub class: ClassRef,
    /// Declared length of the object measured from `start`.
    pub byte_count: Option<u32>,
    /// Position just after the first preamble word.
    pub start: usize,
}

impl ClassHeader {
    /// Declared end position of the object, when a byte count was present.
    #[must_use]
    pub fn end(&self) -> Option<usize> {
        self.byte_count.map(|n| self.start + n as usize)
    }
}

/// The "begin object" record that precedes every versioned object body.
///
/// ```text
/// ┌─────────────────────────┬──────────────┬──────────────────────────┐
/// │ [bytecount | 0x40000000]│ version: i16 │ [checksum: u32]          │
/// │ optional, 4 bytes       │ 2 bytes      │ only when version <= 0   │
/// └─────────────────────────┴──────────────┴──────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionToken {
    pub version: i16,
    /// Byte count measured from the end of the version field.
    pub byte_count: Option<u32>,
    /// Position right after the version field.
    pub start: usize,
    pub checksum: Option<u32>,
}

impl VersionToken {
    /// Declared end of the object body.
    #[must_use]
    pub fn end(&self) -> Option<usize> {
        self.byte_count.map(|n| self.start + n as usize)
    }

    /// True when bit 14 of the version is set (container written member-wise).
    #[must_use]
    pub fn memberwise(&self) -> bool {
        self.version & STREAMED_MEMBERWISE != 0
    }

    /// The version with the member-wise bit cleared.
    #[must_use]
    pub fn class_version(&self) -> i16 {
        self.version & !STREAMED_MEMBERWISE
    }
}

/// Sequential big-endian reader over one decompressed buffer.
///
/// Besides primitive reads the cursor owns the two reference maps used by
/// polymorphic pointers. Tags in those maps are absolute positions in the
/// writer's buffer, which included the entry header; `tag_offset` restores
/// that bias so tags line up with positions in this buffer.
///
/// ```text
///   0 ........ pos ............ limit ........ len
///   ├── read ───┤── readable ────┤── hidden ───┤
/// ```
///
/// `limit` is the end of the innermost byte-count window (or `len`).
#[derive(Debug)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    limit: usize,
    objects: HashMap<u32, ObjectRef>,
    classes: HashMap<u32, String>,
    displacement: i32,
    tag_offset: u32,
}

impl<'a> ByteCursor<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            limit: buf.len(),
            objects: HashMap::new(),
            classes: HashMap::new(),
            displacement: 0,
            tag_offset: 0,
        }
    }

    /// Cursor whose reference tags are biased by `tag_offset` bytes.
    #[must_use]
    pub fn with_tag_offset(buf: &'a [u8], tag_offset: u32) -> Self {
        let mut cursor = Self::new(buf);
        cursor.tag_offset = tag_offset;
        cursor
    }

    // ── Position and windows ──────────────────────────────────────────

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes left before the active limit.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.pos)
    }

    /// The whole underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Move to an absolute position inside the buffer.
    ///
    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] when `pos` lies past the physical end.
    pub fn seek(&mut self, pos: usize) -> Result<(), WireError> {
        if pos > self.buf.len() {
            return Err(WireError::OutOfBounds {
                offset: pos,
                needed: 0,
                limit: self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Advance by `n` bytes without reading them.
    ///
    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] when the skip crosses the active limit.
    pub fn skip(&mut self, n: usize) -> Result<(), WireError> {
        self.take(n).map(|_| ())
    }

    /// Restrict reads to end at `end` until the matching [`pop_limit`].
    ///
    /// The window is clamped to the current limit so nested windows never
    /// widen an outer one. Returns the previous limit.
    ///
    /// [`pop_limit`]: Self::pop_limit
    pub fn push_limit(&mut self, end: usize) -> usize {
        let previous = self.limit;
        self.limit = end.clamp(self.pos.min(previous), previous);
        previous
    }

    /// Restore the limit returned by [`push_limit`](Self::push_limit).
    pub fn pop_limit(&mut self, previous: usize) {
        self.limit = previous.min(self.buf.len());
    }

    /// True when a byte-count window narrower than the buffer is active.
    #[must_use]
    pub fn in_window(&self) -> bool {
        self.limit < self.buf.len()
    }

    // ── Reference maps ────────────────────────────────────────────────

    pub fn set_tag_offset(&mut self, tag_offset: u32) {
        self.tag_offset = tag_offset;
    }

    #[must_use]
    pub fn tag_offset(&self) -> u32 {
        self.tag_offset
    }

    pub fn set_displacement(&mut self, displacement: i32) {
        self.displacement = displacement;
    }

    /// Tag a polymorphic object starting at the current position would get.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn next_object_tag(&self) -> u32 {
        self
            .tag_offset
            .wrapping_add(self.pos as u32)
            .wrapping_add(MAP_OFFSET)
    }

    pub fn map_object(&mut self, tag: u32, object: ObjectRef) {
        self.objects.insert(tag, object);
    }

    #[must_use]
    pub fn mapped_object(&self, tag: u32) -> Option<ObjectRef> {
        self.objects.get(&tag).copied()
    }

    pub fn map_class(&mut self, tag: u32, name: impl Into<String>) {
        self.classes.insert(tag, name.into());
    }

    #[must_use]
    pub fn mapped_class(&self, tag: u32) -> Option<&str> {
        self.classes.get(&tag).map(String::as_str)
    }

    // ── Primitive reads ───────────────────────────────────────────────

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.limit);
        match end {
            Some(end) => {
                let bytes = &self.buf[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(WireError::OutOfBounds {
                offset: self.pos,
                needed: n,
                limit: self.limit,
            }),
        }
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Borrow the next `n` raw bytes.
    ///
    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] when fewer than `n` bytes remain.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        self.take(n)
    }

    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] at the active limit.
    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take_array::<1>()?[0])
    }

    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] at the active limit.
    pub fn read_i8(&mut self) -> Result<i8, WireError> {
        Ok(i8::from_be_bytes(self.take_array()?))
    }

    /// Reads one byte; any non-zero value is `true`.
    ///
    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] at the active limit.
    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.read_u8()? != 0)
    }

    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] at the active limit.
    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] at the active limit.
    pub fn read_i16(&mut self) -> Result<i16, WireError> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] at the active limit.
    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] at the active limit.
    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] at the active limit.
    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] at the active limit.
    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] at the active limit.
    pub fn read_f32(&mut self) -> Result<f32, WireError> {
        Ok(f32::from_be_bytes(self.take_array()?))
    }

    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] at the active limit.
    pub fn read_f64(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    // ── Strings ───────────────────────────────────────────────────────

    /// Length-prefixed string.
    ///
    /// One length byte; 255 means a 4-byte length follows. Bytes are
    /// decoded as Latin-1. A body whose first byte is zero reads as `""`.
    ///
    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] when the body is truncated.
    pub fn read_tstring(&mut self) -> Result<String, WireError> {
        let mut len = u32::from(self.read_u8()?);
        if len == 255 {
            len = self.read_u32()?;
        }
        if len == 0 {
            return Ok(String::new());
        }
        let bytes = self.take(len as usize)?;
        if bytes[0] == 0 {
            return Ok(String::new());
        }
        Ok(latin1(bytes))
    }

    /// Fixed-width or zero-terminated string.
    ///
    /// With `n < 0` bytes are read up to and including the first zero. With
    /// `n >= 0` exactly `n` bytes are consumed and anything after an
    /// embedded zero is padding.
    ///
    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] when the buffer ends first.
    pub fn read_fast_string(&mut self, n: i32) -> Result<String, WireError> {
        if let Ok(n) = usize::try_from(n) {
            let bytes = self.take(n)?;
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            return Ok(latin1(&bytes[..end]));
        }
        let rest = &self.buf[self.pos..self.limit];
        match rest.iter().position(|&b| b == 0) {
            Some(end) => {
                self.pos += end + 1;
                Ok(latin1(&rest[..end]))
            }
            None => Err(WireError::OutOfBounds {
                offset: self.pos,
                needed: rest.len() + 1,
                limit: self.limit,
            }),
        }
    }

    // ── Versioned objects ─────────────────────────────────────────────

    /// Read the begin-object record.
    ///
    /// `knows_checksum` decides whether a 4-byte word after a non-positive
    /// version is a schema checksum. When it answers `false` the word is
    /// left unread and becomes part of the object body.
    ///
    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] when the record is truncated.
    pub fn read_version(
        &mut self,
        knows_checksum: impl FnOnce(u32) -> bool,
    ) -> Result<VersionToken, WireError> {
        let word = self.read_u32()?;
        let byte_count = if word & BYTE_COUNT_MASK != 0 {
            Some((word & !BYTE_COUNT_MASK).saturating_sub(2))
        } else {
            self.pos -= 4;
            None
        };
        let version = self.read_i16()?;
        let start = self.pos;
        let mut checksum = None;
        if version <= 0 && byte_count.is_some_and(|n| n >= 4) {
            let value = self.read_u32()?;
            if knows_checksum(value) {
                checksum = Some(value);
            } else {
                self.pos -= 4;
            }
        }
        Ok(VersionToken {
            version,
            byte_count,
            start,
            checksum,
        })
    }

    /// Verify the cursor ended exactly where `token` said it would.
    ///
    /// On a mismatch a warning is logged, the cursor is moved to the declared
    /// end, and `false` is returned. Tokens without a byte count always pass.
    pub fn check_byte_count(&mut self, token: &VersionToken, context: &str) -> bool {
        let Some(end) = token.end() else {
            return true;
        };
        if end == self.pos {
            return true;
        }
        tracing::warn!(
            context,
            expected = end,
            actual = self.pos,
            "byte count mismatch"
        );
        self.pos = end.min(self.buf.len());
        false
    }

    // ── Arrays ────────────────────────────────────────────────────────

    /// Read `n` elements of `kind`.
    ///
    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] when the array is longer than the data
    /// left before the limit. The check happens before any allocation.
    pub fn read_array(&mut self, n: usize, kind: ArrayKind) -> Result<TypedArray, WireError> {
        if let Some(width) = kind.width() {
            let needed = n.saturating_mul(width);
            if needed > self.remaining() {
                return Err(WireError::OutOfBounds {
                    offset: self.pos,
                    needed,
                    limit: self.limit,
                });
            }
        } else if n > self.remaining() {
            return Err(WireError::OutOfBounds {
                offset: self.pos,
                needed: n,
                limit: self.limit,
            });
        }

        macro_rules! collect {
            ($variant:ident, $read:ident) => {{
                let mut v = Vec::with_capacity(n);
                for _ in 0..n {
                    v.push(self.$read()?);
                }
                TypedArray::$variant(v)
            }};
        }

        let array = match kind {
            ArrayKind::I8 => collect!(I8, read_i8),
            ArrayKind::U8 => TypedArray::U8(self.take(n)?.to_vec()),
            ArrayKind::I16 => collect!(I16, read_i16),
            ArrayKind::U16 => collect!(U16, read_u16),
            ArrayKind::I32 => collect!(I32, read_i32),
            ArrayKind::U32 => collect!(U32, read_u32),
            ArrayKind::I64 => collect!(I64, read_i64),
            ArrayKind::U64 => collect!(U64, read_u64),
            ArrayKind::F32 => collect!(F32, read_f32),
            ArrayKind::F64 => collect!(F64, read_f64),
            ArrayKind::Bool => collect!(Bool, read_bool),
            ArrayKind::Str => collect!(Str, read_tstring),
        };
        Ok(array)
    }

    // ── Class references ──────────────────────────────────────────────

    /// Read a class preamble and resolve it against the class map.
    ///
    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] when the preamble is truncated.
    pub fn read_class_reference(&mut self) -> Result<ClassRef, WireError> {
        self.read_class_header().map(|header| header.class)
    }

    /// Read a class preamble, keeping the byte count that framed it.
    ///
    /// ```text
    /// [bcnt|0x40000000] tag
    ///   tag without 0x80000000      → object back-reference
    ///   tag == 0xFFFFFFFF           → class name (C string) follows
    ///   tag with 0x80000000         → class back-reference
    /// ```
    ///
    /// New class names are registered at `tag_offset + start + 2` where
    /// `start` is the position right after the first word.
    ///
    /// # Errors
    ///
    /// [`WireError::OutOfBounds`] when the preamble is truncated.
    #[allow(clippy::cast_possible_truncation)]
    pub fn read_class_header(&mut self) -> Result<ClassHeader, WireError> {
        let first = self.read_u32()?;
        let start = self.pos;
        let (tag, byte_count) = if first & BYTE_COUNT_MASK == 0 || first == NEW_CLASS_TAG {
            (first, None)
        } else {
            (self.read_u32()?, Some(first & !BYTE_COUNT_MASK))
        };

        let class = if tag & CLASS_MASK == 0 {
            if tag == 0 {
                ClassRef::Object(0)
            } else {
                ClassRef::Object(tag.wrapping_add_signed(self.displacement))
            }
        } else if tag == NEW_CLASS_TAG {
            let name = self.read_fast_string(-1)?;
            let class_tag = self
                .tag_offset
                .wrapping_add(start as u32)
                .wrapping_add(MAP_OFFSET);
            self.classes.insert(class_tag, name.clone());
            ClassRef::Class(name)
        } else {
            let class_tag = (tag & !CLASS_MASK).wrapping_add_signed(self.displacement);
            match self.classes.get(&class_tag) {
                Some(name) => ClassRef::Class(name.clone()),
                None => ClassRef::Unknown(class_tag),
            }
        };

        Ok(ClassHeader {
            class,
            byte_count,
            start,
        })
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_big_endian() {
        let data = [
            0x12, 0x34, 0xDE, 0xAD, 0xBE, 0xEF, 0x3F, 0x80, 0x00, 0x00, 0xFF,
        ];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_u16().unwrap(), 0x1234);
        assert_eq!(c.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(c.read_f32().unwrap(), 1.0);
        assert_eq!(c.read_i8().unwrap(), -1);
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn read_past_end_reports_position() {
        let data = [0u8; 3];
        let mut c = ByteCursor::new(&data);
        c.read_u8().unwrap();
        let err = c.read_u32().unwrap_err();
        assert!(matches!(
            err,
            WireError::OutOfBounds {
                offset: 1,
                needed: 4,
                limit: 3
            }
        ));
    }

    #[test]
    fn tstring_short_and_long_forms() {
        let mut data = vec![3, b'a', b'b', b'c', 255, 0, 0, 1, 0];
        data.extend(std::iter::repeat_n(b'x', 256));
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_tstring().unwrap(), "abc");
        assert_eq!(c.read_tstring().unwrap().len(), 256);
    }

    #[test]
    fn tstring_is_latin1_and_zero_led_is_empty() {
        let data = [2, 0xE9, b'!', 2, 0, b'z', 0];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_tstring().unwrap(), "é!");
        assert_eq!(c.read_tstring().unwrap(), "");
        assert_eq!(c.read_tstring().unwrap(), "");
        assert_eq!(c.position(), 7);
    }

    #[test]
    fn fast_string_terminated_and_padded() {
        let data = b"TList\0ab\0cd";
        let mut c = ByteCursor::new(data);
        assert_eq!(c.read_fast_string(-1).unwrap(), "TList");
        assert_eq!(c.read_fast_string(5).unwrap(), "ab");
        assert_eq!(c.position(), 11);
    }

    #[test]
    fn version_with_byte_count() {
        // count 0x0A covers version (2) + 8 body bytes
        let data = [0x40, 0, 0, 0x0A, 0, 5, 1, 2, 3, 4, 5, 6, 7, 8];
        let mut c = ByteCursor::new(&data);
        let token = c.read_version(|_| false).unwrap();
        assert_eq!(token.version, 5);
        assert_eq!(token.byte_count, Some(8));
        assert_eq!(token.start, 6);
        assert_eq!(token.end(), Some(14));
        c.skip(8).unwrap();
        assert!(c.check_byte_count(&token, "test"));
    }

    #[test]
    fn legacy_version_without_byte_count() {
        let data = [0, 3, 0xAA];
        let mut c = ByteCursor::new(&data);
        let token = c.read_version(|_| true).unwrap();
        assert_eq!(token.version, 3);
        assert_eq!(token.byte_count, None);
        assert_eq!(c.position(), 2);
    }

    #[test]
    fn unknown_checksum_is_rewound() {
        let data = [0x40, 0, 0, 0x08, 0xFF, 0xFF, 0xCA, 0xFE, 0xBA, 0xBE];
        let mut c = ByteCursor::new(&data);
        let token = c.read_version(|_| false).unwrap();
        assert_eq!(token.version, -1);
        assert_eq!(token.checksum, None);
        assert_eq!(c.position(), 6);

        let mut c = ByteCursor::new(&data);
        let token = c.read_version(|sum| sum == 0xCAFE_BABE).unwrap();
        assert_eq!(token.checksum, Some(0xCAFE_BABE));
        assert_eq!(c.position(), 10);
    }

    #[test]
    fn byte_count_mismatch_resyncs() {
        let data = [0x40, 0, 0, 0x06, 0, 1, 9, 9, 9, 9, 0x77];
        let mut c = ByteCursor::new(&data);
        let token = c.read_version(|_| false).unwrap();
        c.read_u8().unwrap();
        assert!(!c.check_byte_count(&token, "short read"));
        assert_eq!(c.position(), 10);
        assert_eq!(c.read_u8().unwrap(), 0x77);
    }

    #[test]
    fn windows_hide_trailing_bytes() {
        let data = [1, 2, 3, 4, 5, 6];
        let mut c = ByteCursor::new(&data);
        let prev = c.push_limit(2);
        assert!(c.in_window());
        assert_eq!(c.read_u16().unwrap(), 0x0102);
        let err = c.read_u8().unwrap_err();
        assert!(matches!(err, WireError::OutOfBounds { limit: 2, .. }));
        c.pop_limit(prev);
        assert!(!c.in_window());
        assert_eq!(c.read_u8().unwrap(), 3);
    }

    #[test]
    fn nested_window_cannot_widen() {
        let data = [0u8; 10];
        let mut c = ByteCursor::new(&data);
        let outer = c.push_limit(4);
        let inner = c.push_limit(8);
        assert_eq!(c.limit(), 4);
        c.pop_limit(inner);
        c.pop_limit(outer);
        assert_eq!(c.limit(), 10);
    }

    #[test]
    fn oversized_array_fails_before_allocating() {
        let data = [0u8; 8];
        let mut c = ByteCursor::new(&data);
        assert!(c.read_array(usize::MAX / 2, ArrayKind::F64).is_err());
        assert_eq!(c.position(), 0);
        let arr = c.read_array(2, ArrayKind::I32).unwrap();
        assert_eq!(arr, TypedArray::I32(vec![0, 0]));
    }

    #[test]
    fn new_class_then_class_back_reference() {
        let mut data = vec![0x40, 0, 0, 0x0B];
        data.extend_from_slice(&NEW_CLASS_TAG.to_be_bytes());
        data.extend_from_slice(b"TNamed\0");
        // back-reference to the tag registered at 0 + 4 + 2
        data.extend_from_slice(&[0x40, 0, 0, 0x04]);
        data.extend_from_slice(&(CLASS_MASK | 6).to_be_bytes());

        let mut c = ByteCursor::new(&data);
        let first = c.read_class_header().unwrap();
        assert_eq!(first.class, ClassRef::Class("TNamed".into()));
        assert_eq!(first.start, 4);
        assert_eq!(first.end(), Some(15));
        assert_eq!(c.mapped_class(6), Some("TNamed"));

        let second = c.read_class_reference().unwrap();
        assert_eq!(second, ClassRef::Class("TNamed".into()));
    }

    #[test]
    fn tag_offset_biases_class_registration() {
        let mut data = NEW_CLASS_TAG.to_be_bytes().to_vec();
        data.extend_from_slice(b"TList\0");
        let mut c = ByteCursor::with_tag_offset(&data, 100);
        c.read_class_reference().unwrap();
        assert_eq!(c.mapped_class(106), Some("TList"));
    }

    #[test]
    fn object_back_reference_and_null() {
        let data = [0, 0, 0, 0, 0, 0, 0, 42, 0x80, 0, 0, 9];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_class_reference().unwrap(), ClassRef::Object(0));
        assert_eq!(c.read_class_reference().unwrap(), ClassRef::Object(42));
        assert_eq!(c.read_class_reference().unwrap(), ClassRef::Unknown(9));
    }
}
