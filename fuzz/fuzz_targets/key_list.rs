#![no_main]

use libfuzzer_sys::fuzz_target;
use oxroot_wire::{ByteCursor, DirectoryHeader, KeyHeader};

// Fuzz target: key and directory records.
//
// Parses the input three ways: as one key header, as a directory record,
// and as a keys list. Catches bugs in:
// - Short/long seek fields keyed on the record version
// - Length-prefixed strings running past the buffer
// - Huge key counts in a keys list
fuzz_target!(|data: &[u8]| {
    let _ = KeyHeader::read(&mut ByteCursor::new(data));
    let _ = DirectoryHeader::read(&mut ByteCursor::new(data));
    let _ = oxroot_wire::read_key_list(&mut ByteCursor::new(data));
});
