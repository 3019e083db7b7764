#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: LZ4 block decoding.
//
// Catches bugs in:
// - Length extension bytes running past the input
// - Zero or out-of-window match offsets
// - Output limit enforcement
fuzz_target!(|data: &[u8]| {
    let mut out = Vec::new();
    let _ = oxroot_inflate::lz4::decompress(data, &mut out, 1 << 16);
    assert!(out.len() <= 1 << 16);
});
