//! Fuzz target for delta stream application.
//!
//! The first byte splits the input into a base buffer and a delta stream.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mingit_proto::delta;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let split = (data[0] as usize + 1).min(data.len());
    let (base, delta_stream) = data[1..].split_at(split - 1);

    let _ = delta::apply(base, delta_stream);
});
