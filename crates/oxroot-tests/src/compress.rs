//! Compressed block framing for fixtures, using the reference encoders.

use std::io::Write;

use flate2::Compression as Level;
use flate2::write::{DeflateEncoder, ZlibEncoder};
use oxroot_inflate::{Algorithm, BlockHeader};

/// Largest chunk one block header can describe (24-bit sizes).
pub const MAX_BLOCK: usize = 0xFF_FFFF;

/// Algorithm used for entry payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    None,
    Zlib,
    LegacyDeflate,
    Lz4,
    Zstd,
}

impl Compression {
    pub const ALL: [Self; 4] = [Self::Zlib, Self::LegacyDeflate, Self::Lz4, Self::Zstd];

    pub fn algorithm(self) -> Option<Algorithm> {
        match self {
            Self::None => None,
            Self::Zlib => Some(Algorithm::Zlib),
            Self::LegacyDeflate => Some(Algorithm::LegacyDeflate),
            Self::Lz4 => Some(Algorithm::Lz4),
            Self::Zstd => Some(Algorithm::Zstd),
        }
    }
}

/// Compress one chunk without framing.
///
/// # Panics
///
/// If a reference encoder fails, which only happens on allocation failure,
/// or for [`Algorithm::Lzma`], which has no encoder here.
pub fn compress_raw(algorithm: Algorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        Algorithm::Zlib => {
            let mut enc = ZlibEncoder::new(Vec::new(), Level::default());
            enc.write_all(data).expect("zlib write");
            enc.finish().expect("zlib finish")
        }
        Algorithm::LegacyDeflate => {
            let mut enc = DeflateEncoder::new(Vec::new(), Level::default());
            enc.write_all(data).expect("deflate write");
            enc.finish().expect("deflate finish")
        }
        Algorithm::Lz4 => {
            // 8-byte checksum slot the reader skips.
            let mut out = vec![0u8; 8];
            out.extend(lz4_flex::block::compress(data));
            out
        }
        Algorithm::Zstd => zstd::bulk::compress(data, 3).expect("zstd compress"),
        Algorithm::Lzma => unimplemented!("no lzma encoder in the fixture stack"),
    }
}

/// Frame `data` as a run of blocks of at most `block_size` input bytes.
pub fn compress_blocks(algorithm: Algorithm, data: &[u8], block_size: usize) -> Vec<u8> {
    let block_size = block_size.clamp(1, MAX_BLOCK);
    let (_, method) = algorithm.magic();
    let mut out = Vec::new();
    for chunk in data.chunks(block_size) {
        let payload = compress_raw(algorithm, chunk);
        let header = BlockHeader {
            algorithm,
            method,
            compressed_len: payload.len(),
            uncompressed_len: chunk.len(),
        };
        out.extend_from_slice(&header.to_bytes());
        out.extend(payload);
    }
    out
}

/// What an entry stores on disk: the framed blocks when they are smaller
/// than the input, otherwise the input itself.
pub fn pack(compression: Compression, data: &[u8], block_size: usize) -> Vec<u8> {
    let Some(algorithm) = compression.algorithm() else {
        return data.to_vec();
    };
    let framed = compress_blocks(algorithm, data, block_size);
    if framed.len() < data.len() { framed } else { data.to_vec() }
}
