//! Fuzz target for pkt-line framing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mingit_proto::PktLineReader;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut reader = PktLineReader::new(Cursor::new(data));
    while let Ok(Some(_)) = reader.read() {}
});
