use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::block::{Algorithm, BLOCK_HEADER_SIZE, BlockHeader};
use crate::error::InflateError;
use crate::external::ExternalDecoder;
use crate::{deflate, lz4};

/// Default ceiling on a single inflate call: 1 GiB.
pub const DEFAULT_MAX_OUTPUT: usize = 1 << 30;

/// Demultiplexes a sequence of compressed blocks into one flat buffer.
///
/// DEFLATE (both framings) and LZ4 are decoded in-crate. ZSTD and LZMA go
/// through [`ExternalDecoder`]s attached per algorithm; the default
/// inflator carries a ZSTD decoder when the `zstd` feature is on.
///
/// An inflator holds no per-call state, so one instance can serve
/// concurrent entry reads.
#[derive(Clone)]
pub struct BlockInflator {
    decoders: HashMap<Algorithm, Arc<dyn ExternalDecoder>>,
    max_output: usize,
}

impl fmt::Debug for BlockInflator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockInflator")
            .field("external", &self.decoders.keys().collect::<Vec<_>>())
            .field("max_output", &self.max_output)
            .finish()
    }
}

impl Default for BlockInflator {
    fn default() -> Self {
        let inflator = Self::bare();
        #[cfg(feature = "zstd")]
        let inflator = inflator.with_decoder(Algorithm::Zstd, crate::external::ZstdDecoder);
        inflator
    }
}

impl BlockInflator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inflator with no external decoders attached.
    #[must_use]
    pub fn bare() -> Self {
        Self {
            decoders: HashMap::new(),
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }

    /// Attach `decoder` for `algorithm`, replacing any previous one.
    pub fn attach(&mut self, algorithm: Algorithm, decoder: Arc<dyn ExternalDecoder>) {
        self.decoders.insert(algorithm, decoder);
    }

    #[must_use]
    pub fn with_decoder(mut self, algorithm: Algorithm, decoder: impl ExternalDecoder + 'static) -> Self {
        self.attach(algorithm, Arc::new(decoder));
        self
    }

    #[must_use]
    pub fn with_max_output(mut self, max_output: usize) -> Self {
        self.max_output = max_output;
        self
    }

    #[must_use]
    pub fn max_output(&self) -> usize {
        self.max_output
    }

    /// Inflate `input` into exactly `total` bytes.
    ///
    /// Blocks are decoded back to back until `total` bytes exist. Each
    /// block is independent: no back-reference crosses a block boundary.
    ///
    /// # Errors
    ///
    /// - [`InflateError::DecompressionBomb`] when `total` exceeds the ceiling.
    /// - [`InflateError::SizeMismatch`] when input runs out early or a block overshoots.
    /// - [`InflateError::EmptyBlock`] for a block that produces nothing.
    /// - [`InflateError::UnsupportedAlgorithm`] when no decoder is attached.
    /// - Framing and codec errors from the individual blocks.
    pub fn inflate(&self, input: &[u8], total: usize) -> Result<Vec<u8>, InflateError> {
        if total > self.max_output {
            return Err(InflateError::DecompressionBomb {
                declared: total,
                limit: self.max_output,
            });
        }
        let mut out = Vec::with_capacity(total);
        let mut pos = 0;
        while out.len() < total {
            if pos >= input.len() {
                return Err(InflateError::SizeMismatch {
                    expected: total,
                    actual: out.len(),
                });
            }
            let header = BlockHeader::parse(&input[pos..], pos)?;
            let body = pos + BLOCK_HEADER_SIZE;
            let end = body + header.compressed_len;
            if end > input.len() {
                return Err(InflateError::TruncatedBlock {
                    offset: pos,
                    declared: header.compressed_len,
                    available: input.len() - body.min(input.len()),
                });
            }
            let payload = &input[body..end];
            let before = out.len();
            self.inflate_block(&header, payload, &mut out, total, pos)?;
            let produced = out.len() - before;
            debug!(
                offset = pos,
                algorithm = %header.algorithm,
                compressed = header.compressed_len,
                produced,
                "inflated block"
            );
            if produced == 0 {
                return Err(InflateError::EmptyBlock { offset: pos });
            }
            pos = end;
        }
        if out.len() != total {
            return Err(InflateError::SizeMismatch {
                expected: total,
                actual: out.len(),
            });
        }
        Ok(out)
    }

    fn inflate_block(
        &self,
        header: &BlockHeader,
        payload: &[u8],
        out: &mut Vec<u8>,
        total: usize,
        offset: usize,
    ) -> Result<(), InflateError> {
        let skip = header.algorithm.payload_skip();
        let Some(stream) = payload.get(skip..) else {
            return Err(InflateError::TruncatedBlock {
                offset,
                declared: header.compressed_len,
                available: payload.len(),
            });
        };
        let limit = total.min(out.len() + header.uncompressed_len);
        match header.algorithm {
            Algorithm::Zlib | Algorithm::LegacyDeflate => {
                deflate::inflate(stream, out, limit)?;
            }
            Algorithm::Lz4 => lz4::decompress(stream, out, limit)?,
            algorithm @ (Algorithm::Zstd | Algorithm::Lzma) => {
                let decoder = self
                    .decoders
                    .get(&algorithm)
                    .ok_or(InflateError::UnsupportedAlgorithm { algorithm })?;
                let decoded = decoder
                    .decode(stream, header.uncompressed_len)
                    .map_err(|source| InflateError::External { algorithm, source })?;
                if out.len() + decoded.len() > total {
                    return Err(InflateError::SizeMismatch {
                        expected: total,
                        actual: out.len() + decoded.len(),
                    });
                }
                out.extend_from_slice(&decoded);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(algorithm: Algorithm, payload: &[u8], uncompressed: usize) -> Vec<u8> {
        let (_, method) = algorithm.magic();
        let header = BlockHeader {
            algorithm,
            method,
            compressed_len: payload.len(),
            uncompressed_len: uncompressed,
        };
        let mut out = header.to_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn zlib_block_skips_stream_header() {
        let payload = [0x78, 0x9C, 0x4b, 0x4c, 0x4a, 0x06, 0x00];
        let input = frame(Algorithm::Zlib, &payload, 3);
        assert_eq!(BlockInflator::bare().inflate(&input, 3).unwrap(), b"abc");
    }

    #[test]
    fn two_blocks_concatenate() {
        let mut input = frame(Algorithm::LegacyDeflate, &[0x4b, 0x04, 0x00], 1);
        let mut lz = vec![0u8; 8];
        lz.extend_from_slice(&[0x20, b'b', b'c']);
        input.extend(frame(Algorithm::Lz4, &lz, 2));
        assert_eq!(BlockInflator::bare().inflate(&input, 3).unwrap(), b"abc");
    }

    #[test]
    fn short_input_is_size_mismatch() {
        let input = frame(Algorithm::LegacyDeflate, &[0x4b, 0x04, 0x00], 1);
        assert!(matches!(
            BlockInflator::bare().inflate(&input, 5),
            Err(InflateError::SizeMismatch { expected: 5, actual: 1 })
        ));
    }

    #[test]
    fn missing_external_decoder() {
        let input = frame(Algorithm::Lzma, &[1, 2, 3], 10);
        assert!(matches!(
            BlockInflator::bare().inflate(&input, 10),
            Err(InflateError::UnsupportedAlgorithm {
                algorithm: Algorithm::Lzma
            })
        ));
    }

    #[test]
    fn empty_block_is_an_error() {
        // stored deflate block of length zero
        let input = frame(Algorithm::LegacyDeflate, &[0x01, 0x00, 0x00, 0xFF, 0xFF], 0);
        assert!(matches!(
            BlockInflator::bare().inflate(&input, 4),
            Err(InflateError::EmptyBlock { offset: 0 })
        ));
    }

    #[test]
    fn declared_size_over_ceiling() {
        let inflator = BlockInflator::bare().with_max_output(16);
        assert!(matches!(
            inflator.inflate(&[], 17),
            Err(InflateError::DecompressionBomb { declared: 17, limit: 16 })
        ));
    }

    struct Reverse;

    impl ExternalDecoder for Reverse {
        fn decode(&self, payload: &[u8], _: usize) -> Result<Vec<u8>, crate::external::ExternalError> {
            Ok(payload.iter().rev().copied().collect())
        }
    }

    #[test]
    fn attached_decoder_is_used() {
        let input = frame(Algorithm::Lzma, b"cba", 3);
        let inflator = BlockInflator::bare().with_decoder(Algorithm::Lzma, Reverse);
        assert_eq!(inflator.inflate(&input, 3).unwrap(), b"abc");
    }
}
