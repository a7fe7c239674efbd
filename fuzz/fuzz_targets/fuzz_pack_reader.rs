//! Fuzz target for pack file decoding.
//!
//! Tests that the pack reader handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mingit_proto::PackReader;
use mingit_store::LooseStore;

fuzz_target!(|data: &[u8]| {
    let temp = tempfile::TempDir::new().unwrap();
    let store = LooseStore::new(temp.path().join("objects"));

    let _ = PackReader::new(data).parse(&store);
});
