/// Errors raised while reading raw bytes from a container buffer.
///
/// Every variant carries the byte position where the read failed so a
/// desync can be traced back to the exact field that caused it.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A read of `needed` bytes at `offset` would cross `limit`.
    ///
    /// `limit` is either the physical end of the buffer or the end of the
    /// innermost byte-count window opened with
    /// [`ByteCursor::push_limit`](crate::ByteCursor::push_limit). The
    /// decoder uses the difference between the two to decide whether the
    /// failure is recoverable.
    #[error("read of {needed} bytes at offset {offset} crosses limit {limit}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        limit: usize,
    },

    /// The container does not start with the `root` signature.
    #[error("invalid magic: expected \"root\", got {found:02X?}")]
    InvalidMagic { found: [u8; 4] },

    /// A length prefix was negative or otherwise impossible.
    #[error("invalid length {len} at offset {offset}")]
    InvalidLength { offset: usize, len: i64 },

    /// A header points at no record: zero offset or zero length.
    #[error("missing record: offset {seek}, length {nbytes}")]
    MissingRecord { seek: u64, nbytes: u32 },

    /// The element type code cannot be read as a flat array.
    ///
    /// Reduced-precision float codes need the per-field range recorded in
    /// the schema, so they never appear in a plain array read.
    #[error("type code {code} cannot be read as a flat array")]
    UnsupportedArrayType { code: i32 },

    /// I/O error from an underlying reader.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// True when the failure is a bounds violation.
    #[must_use]
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }
}
