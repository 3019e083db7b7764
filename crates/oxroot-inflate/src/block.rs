use std::fmt;

use crate::error::InflateError;

/// Size of the header in front of every compressed block.
pub const BLOCK_HEADER_SIZE: usize = 9;

/// Compression algorithm named by a block's magic.
///
/// ```text
/// ┌───────────────┬───────┬────────┬──────────────────────────────┐
/// │ Variant       │ Magic │ Method │ Payload prefix skipped       │
/// ├───────────────┼───────┼────────┼──────────────────────────────┤
/// │ Zlib          │ "ZL"  │ 8      │ 2-byte zlib header           │
/// │ LegacyDeflate │ "CS"  │ 8      │ none (raw deflate)           │
/// │ Lz4           │ "L4"  │ any    │ 8-byte checksum              │
/// │ Zstd          │ "ZS"  │ 1      │ none                         │
/// │ Lzma          │ "XZ"  │ 0      │ none                         │
/// └───────────────┴───────┴────────┴──────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Zlib,
    LegacyDeflate,
    Lz4,
    Zstd,
    Lzma,
}

impl Algorithm {
    /// Resolve a magic/method pair, or `None` if nothing matches.
    #[must_use]
    pub fn from_magic(magic: [u8; 2], method: u8) -> Option<Self> {
        match (&magic, method) {
            (b"ZL", 8) => Some(Self::Zlib),
            (b"CS", 8) => Some(Self::LegacyDeflate),
            (b"L4", _) => Some(Self::Lz4),
            (b"ZS", 1) => Some(Self::Zstd),
            (b"XZ", 0) => Some(Self::Lzma),
            _ => None,
        }
    }

    /// Magic and method bytes written for this algorithm.
    #[must_use]
    pub fn magic(self) -> ([u8; 2], u8) {
        match self {
            Self::Zlib => (*b"ZL", 8),
            Self::LegacyDeflate => (*b"CS", 8),
            Self::Lz4 => (*b"L4", 1),
            Self::Zstd => (*b"ZS", 1),
            Self::Lzma => (*b"XZ", 0),
        }
    }

    /// Bytes at the start of the payload that precede the compressed stream.
    #[must_use]
    pub fn payload_skip(self) -> usize {
        match self {
            Self::Zlib => 2,
            Self::Lz4 => 8,
            Self::LegacyDeflate | Self::Zstd | Self::Lzma => 0,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Zlib => "zlib",
            Self::LegacyDeflate => "legacy deflate",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
            Self::Lzma => "lzma",
        };
        f.write_str(name)
    }
}

/// Parsed 9-byte block header.
///
/// ```text
/// ┌────────┬──────┬────────────────────────────────────┐
/// │ Offset │ Size │ Field                              │
/// ├────────┼──────┼────────────────────────────────────┤
/// │ 0      │ 2    │ algorithm magic                    │
/// │ 2      │ 1    │ method                             │
/// │ 3      │ 3    │ compressed length (little-endian)  │
/// │ 6      │ 3    │ uncompressed length (little-endian)│
/// └────────┴──────┴────────────────────────────────────┘
/// ```
///
/// The compressed length counts the payload after the header, including
/// any algorithm prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub algorithm: Algorithm,
    pub method: u8,
    pub compressed_len: usize,
    pub uncompressed_len: usize,
}

impl BlockHeader {
    /// Parse a header from the start of `buf`. `offset` is only used in
    /// error reports.
    ///
    /// # Errors
    ///
    /// - [`InflateError::TruncatedHeader`] if `buf` is shorter than 9 bytes.
    /// - [`InflateError::UnknownAlgorithm`] for an unknown magic/method.
    pub fn parse(buf: &[u8], offset: usize) -> Result<Self, InflateError> {
        let Some(h) = buf.get(..BLOCK_HEADER_SIZE) else {
            return Err(InflateError::TruncatedHeader { offset });
        };
        let magic = [h[0], h[1]];
        let method = h[2];
        let algorithm = Algorithm::from_magic(magic, method).ok_or(InflateError::UnknownAlgorithm {
            magic,
            method,
            offset,
        })?;
        Ok(Self {
            algorithm,
            method,
            compressed_len: le24(&h[3..6]),
            uncompressed_len: le24(&h[6..9]),
        })
    }

    /// Serialise the header; used by test fixtures to frame blocks.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let (magic, _) = self.algorithm.magic();
        let c = self.compressed_len;
        let u = self.uncompressed_len;
        #[allow(clippy::cast_possible_truncation)]
        let bytes = [
            magic[0],
            magic[1],
            self.method,
            c as u8,
            (c >> 8) as u8,
            (c >> 16) as u8,
            u as u8,
            (u >> 8) as u8,
            (u >> 16) as u8,
        ];
        bytes
    }
}

fn le24(b: &[u8]) -> usize {
    usize::from(b[0]) | usize::from(b[1]) << 8 | usize::from(b[2]) << 16
}
