#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use oxroot_inflate::{Algorithm, BlockInflator};
use oxroot_tests::compress_blocks;

#[derive(Debug, Arbitrary)]
struct Input {
    algorithm: u8,
    block_size: u16,
    data: Vec<u8>,
}

// Roundtrip: reference encoder → block framing → BlockInflator.
//
// Frames arbitrary data with the zlib, raw deflate, LZ4 or zstd reference
// encoders and checks the inflated output is identical.
fuzz_target!(|input: Input| {
    if input.data.is_empty() {
        return;
    }
    let algorithm = match input.algorithm % 4 {
        0 => Algorithm::Zlib,
        1 => Algorithm::LegacyDeflate,
        2 => Algorithm::Lz4,
        _ => Algorithm::Zstd,
    };
    let framed = compress_blocks(algorithm, &input.data, usize::from(input.block_size));
    let out = BlockInflator::new()
        .inflate(&framed, input.data.len())
        .expect("reference-framed data must inflate");
    assert_eq!(out, input.data);
});
