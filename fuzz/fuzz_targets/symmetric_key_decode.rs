//! Fuzz target for sealed-key payloads (bytes -> SymmetricKey -> decrypt)
//!
//! The bytes a receiver gets after opening a bundle are attacker-chosen.
//!
//! # Invariants
//!
//! - Parsing a key dictionary never panics
//! - Decrypting arbitrary ciphertext with a parsed key never panics

#![no_main]

use arbitrary::Arbitrary;
use courier_crypto::SymmetricKey;
use courier_proto::{Compressor, ShortKeys, codec};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

#[derive(Debug, Arbitrary)]
struct Input {
    dict: Vec<u8>,
    ciphertext: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let Ok(Some(mut dict)) = codec::decode_object(&input.dict) else {
        return;
    };
    ShortKeys.extract_symmetric_key(&mut dict);

    let Ok(key) = serde_json::from_value::<SymmetricKey>(Value::Object(dict)) else {
        return;
    };
    let _ = key.decrypt(&input.ciphertext);
});
