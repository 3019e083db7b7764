use crate::block::Algorithm;

/// Errors from the block front end.
///
/// # Error hierarchy
///
/// ```text
/// ┌───────────────────────────────────────────────────────────┐
/// │ InflateError (this crate)                                 │
/// │   ├── framing: TruncatedHeader, UnknownAlgorithm,         │
/// │   │            TruncatedBlock, EmptyBlock, SizeMismatch   │
/// │   ├── policy:  UnsupportedAlgorithm, DecompressionBomb    │
/// │   ├── wraps DeflateError (hand-written DEFLATE)           │
/// │   ├── wraps Lz4Error (hand-written LZ4)                   │
/// │   └── External for attached decoders (zstd, lzma)         │
/// └───────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum InflateError {
    /// Fewer than 9 bytes remain where a block header was expected.
    #[error("truncated block header at offset {offset}")]
    TruncatedHeader { offset: usize },

    /// The 2-byte magic and method byte match no known algorithm.
    #[error("unknown compression magic {magic:02X?} (method {method}) at offset {offset}")]
    UnknownAlgorithm {
        magic: [u8; 2],
        method: u8,
        offset: usize,
    },

    /// The algorithm is known but no decoder is attached for it.
    #[error("no decoder attached for {algorithm}")]
    UnsupportedAlgorithm { algorithm: Algorithm },

    /// A block's declared compressed length runs past the input.
    #[error("block at offset {offset} declares {declared} bytes, {available} available")]
    TruncatedBlock {
        offset: usize,
        declared: usize,
        available: usize,
    },

    /// A block decoded to zero bytes, which would loop forever.
    #[error("block at offset {offset} produced no output")]
    EmptyBlock { offset: usize },

    /// The blocks ran out before (or overshot) the declared total.
    #[error("decompressed {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The declared size exceeds the configured ceiling.
    #[error("declared size {declared} exceeds limit {limit}")]
    DecompressionBomb { declared: usize, limit: usize },

    #[error(transparent)]
    Deflate(#[from] DeflateError),

    #[error(transparent)]
    Lz4(#[from] Lz4Error),

    /// An attached external decoder failed.
    #[error("{algorithm} decoder failed: {source}")]
    External {
        algorithm: Algorithm,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors from the DEFLATE decoder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeflateError {
    #[error("unexpected end of deflate stream")]
    UnexpectedEof,

    #[error("invalid deflate block type {0}")]
    InvalidBlockType(u32),

    #[error("stored block length {len:#06X} does not match complement {nlen:#06X}")]
    StoredLengthMismatch { len: u16, nlen: u16 },

    /// Code lengths describe an over-subscribed or unusable code.
    #[error("invalid Huffman code lengths")]
    InvalidCodeLengths,

    #[error("invalid Huffman symbol")]
    InvalidSymbol,

    #[error("back-reference distance {distance} exceeds {available} bytes of history")]
    DistanceTooFar { distance: usize, available: usize },

    #[error("output exceeds declared size {limit}")]
    OutputOverflow { limit: usize },
}

/// Errors from the LZ4 block decoder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Lz4Error {
    #[error("lz4 input truncated at offset {offset}")]
    TruncatedInput { offset: usize },

    #[error("lz4 match with zero offset at input offset {offset}")]
    ZeroOffset { offset: usize },

    #[error("lz4 match offset {distance} reaches before output start ({available} bytes written)")]
    OffsetBeyondOutput { distance: usize, available: usize },

    #[error("lz4 output exceeds declared size {limit}")]
    OutputOverflow { limit: usize },
}
