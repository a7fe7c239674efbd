//! Fuzz target for tree and commit parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mingit_store::{Commit, Tree};

fuzz_target!(|data: &[u8]| {
    let _ = Tree::parse(data);
    let _ = Commit::parse(data);
});
