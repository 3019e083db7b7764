#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: raw DEFLATE streams.
//
// Catches bugs in:
// - Stored, fixed and dynamic block parsing
// - Code length tables that do not form a prefix code
// - Back-references before the start of the output
// - Output limit enforcement
fuzz_target!(|data: &[u8]| {
    let mut out = Vec::new();
    let _ = oxroot_inflate::deflate::inflate(data, &mut out, 1 << 16);
    assert!(out.len() <= 1 << 16);
});
