//! Numeric constants that appear on the wire.
//!
//! These are grouped the same way the format groups them: reference tags
//! used by the object/class maps, the member type codes recorded in class
//! schemas, and the container kinds used by STL-style fields.

/// Tags used when reading polymorphic references.
///
/// ```text
/// ┌──────────────────┬─────────────┬────────────────────────────────────┐
/// │ Constant         │ Value       │ Meaning                            │
/// ├──────────────────┼─────────────┼────────────────────────────────────┤
/// │ NULL_TAG         │ 0x0000_0000 │ null pointer                       │
/// │ NEW_CLASS_TAG    │ 0xFFFF_FFFF │ a class name string follows        │
/// │ CLASS_MASK       │ 0x8000_0000 │ tag refers to an already-seen class│
/// │ BYTE_COUNT_MASK  │ 0x4000_0000 │ word is a byte count, not a tag    │
/// │ MAP_OFFSET       │ 2           │ bias added to every map position   │
/// └──────────────────┴─────────────┴────────────────────────────────────┘
/// ```
pub mod tag {
    pub const NULL_TAG: u32 = 0;
    pub const NEW_CLASS_TAG: u32 = 0xFFFF_FFFF;
    pub const CLASS_MASK: u32 = 0x8000_0000;
    pub const BYTE_COUNT_MASK: u32 = 0x4000_0000;
    pub const MAP_OFFSET: u32 = 2;

    /// Bit 14 of a container version: elements were written member-wise.
    pub const STREAMED_MEMBERWISE: i16 = 0x4000;

    /// Object bit: a process id follows the bits word.
    pub const IS_REFERENCED: u32 = 1 << 4;

    /// Schema element bit: the title carries a `[min,max,nbits]` range.
    pub const HAS_RANGE: u32 = 1 << 6;
}

/// Member type codes recorded in class schemas.
///
/// Codes 1..=19 are scalars. Adding [`OFFSET_L`] gives a fixed inline
/// array of that scalar; adding [`OFFSET_P`] gives an array whose length
/// lives in a sibling counter field.
pub mod type_code {
    pub const BASE: i32 = 0;
    pub const CHAR: i32 = 1;
    pub const SHORT: i32 = 2;
    pub const INT: i32 = 3;
    pub const LONG: i32 = 4;
    pub const FLOAT: i32 = 5;
    pub const COUNTER: i32 = 6;
    pub const CHAR_STAR: i32 = 7;
    pub const DOUBLE: i32 = 8;
    pub const DOUBLE32: i32 = 9;
    pub const LEGACY_CHAR: i32 = 10;
    pub const UCHAR: i32 = 11;
    pub const USHORT: i32 = 12;
    pub const UINT: i32 = 13;
    pub const ULONG: i32 = 14;
    pub const BITS: i32 = 15;
    pub const LONG64: i32 = 16;
    pub const ULONG64: i32 = 17;
    pub const BOOL: i32 = 18;
    pub const FLOAT16: i32 = 19;

    pub const OFFSET_L: i32 = 20;
    pub const OFFSET_P: i32 = 40;

    pub const OBJECT: i32 = 61;
    pub const ANY: i32 = 62;
    pub const OBJECTP: i32 = 63;
    pub const OBJECT_P: i32 = 64;
    pub const TSTRING: i32 = 65;
    pub const TOBJECT: i32 = 66;
    pub const TNAMED: i32 = 67;
    pub const ANYP: i32 = 68;
    pub const ANY_P: i32 = 69;
    pub const ANY_P_NO_VT: i32 = 70;
    pub const STLP: i32 = 71;

    pub const STL: i32 = 300;
    pub const STL_STRING: i32 = 365;
    pub const STREAMER: i32 = 500;
    pub const STREAM_LOOP: i32 = 501;

    /// True for the scalar codes `CHAR..=FLOAT16`, excluding `CHAR_STAR`.
    #[must_use]
    pub fn is_scalar(code: i32) -> bool {
        (CHAR..=FLOAT16).contains(&code) && code != CHAR_STAR
    }
}

/// Container kinds recorded for STL-style fields.
pub mod stl {
    pub const NOT_STL: i32 = 0;
    pub const VECTOR: i32 = 1;
    pub const LIST: i32 = 2;
    pub const DEQUE: i32 = 3;
    pub const MAP: i32 = 4;
    pub const MULTIMAP: i32 = 5;
    pub const SET: i32 = 6;
    pub const MULTISET: i32 = 7;
    pub const BITSET: i32 = 8;
    pub const UNORDERED_SET: i32 = 12;
    pub const UNORDERED_MULTISET: i32 = 13;
    pub const UNORDERED_MAP: i32 = 14;
    pub const UNORDERED_MULTIMAP: i32 = 15;
    pub const STRING: i32 = 365;
}

/// Directory/key versions above this use 8-byte offsets.
pub const LARGE_KEY_VERSION: i16 = 1000;

/// Container versions at or above this use 8-byte offsets in the header.
pub const LARGE_FILE_VERSION: i32 = 1_000_000;
