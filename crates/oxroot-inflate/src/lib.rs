#![warn(clippy::pedantic)]
//! Block decompression for container payloads.
//!
//! A compressed payload is a run of independently-compressed blocks, each
//! behind a 9-byte header naming its algorithm. [`BlockInflator`] walks
//! the blocks and dispatches each to the matching decoder.

pub mod bits;
pub mod block;
pub mod deflate;
pub mod error;
pub mod external;
pub mod huffman;
pub mod inflator;
pub mod lz4;

pub use block::{Algorithm, BLOCK_HEADER_SIZE, BlockHeader};
pub use error::{DeflateError, InflateError, Lz4Error};
pub use external::{ExternalDecoder, ExternalError};
#[cfg(feature = "zstd")]
pub use external::ZstdDecoder;
pub use inflator::{BlockInflator, DEFAULT_MAX_OUTPUT};
