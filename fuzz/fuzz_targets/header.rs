#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: ContainerHeader::read_from with arbitrary bytes.
//
// Catches bugs in:
// - Magic validation
// - Small/large offset switching on the format version
// - Truncated header handling
fuzz_target!(|data: &[u8]| {
    let _ = oxroot_wire::ContainerHeader::read_from(data);
});
