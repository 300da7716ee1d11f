//! Fuzz target for key bundle addressing
//!
//! Arbitrary `keys` maps and receiver terminals through bundle decoding.
//!
//! # Invariants
//!
//! - Decoding never panics
//! - A decoded bundle is never empty
//! - Every decoded entry comes from an address of the receiver

#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use courier_core::{ANY_TERMINAL, bundle};
use courier_proto::Id;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    keys: BTreeMap<String, String>,
    receiver: String,
    terminals: Vec<String>,
}

fuzz_target!(|input: Input| {
    let Ok(receiver) = Id::parse(&input.receiver) else {
        return;
    };

    let Ok(decoded) = bundle::decode(&input.keys, &receiver, &input.terminals) else {
        return;
    };

    assert!(!decoded.is_empty());
    let identity = receiver.without_terminal().to_string();
    for (terminal, _) in decoded.iter() {
        let addressed = if terminal == ANY_TERMINAL {
            input.keys.contains_key(&identity)
                || input.keys.contains_key(&format!("{identity}/{ANY_TERMINAL}"))
        } else {
            input.keys.contains_key(&format!("{identity}/{terminal}"))
        };
        assert!(addressed, "entry {terminal:?} not addressed to {identity}");
    }
});
