#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use oxroot_inflate::BlockInflator;

#[derive(Debug, Arbitrary)]
struct Input {
    total: u16,
    framed: Vec<u8>,
}

// Fuzz target: the block front end over arbitrary framed input.
//
// Catches bugs in:
// - 9-byte block header parsing (magic, 24-bit little-endian sizes)
// - Declared sizes that disagree with the payload
// - Dispatch to each decoder, including the attached zstd decoder
// - Output overshooting the declared total
fuzz_target!(|input: Input| {
    let inflator = BlockInflator::new().with_max_output(1 << 16);
    if let Ok(out) = inflator.inflate(&input.framed, usize::from(input.total)) {
        assert_eq!(out.len(), usize::from(input.total));
    }
});
