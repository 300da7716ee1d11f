//! Fuzz target for the wire boundary (bytes -> ReliableMessage)
//!
//! Exercises UTF-8 and JSON decoding, short-key restoration, identifier
//! parsing, base64 fields and the legacy `key` field.
//!
//! # Invariants
//!
//! - Decoding never panics; invalid input is an error
//! - Anything that decodes re-encodes, and the re-encoding decodes to the
//!   same envelope, data, keys and signature

#![no_main]

use courier_proto::{Compressor, ReliableMessage, ShortKeys, codec};
use libfuzzer_sys::fuzz_target;

fn decode(data: &[u8]) -> Option<ReliableMessage> {
    let mut object = codec::decode_object(data).ok()??;
    ShortKeys.extract_message(&mut object);
    ReliableMessage::from_wire(object).ok()
}

fuzz_target!(|data: &[u8]| {
    let Some(message) = decode(data) else {
        return;
    };

    // Broadcast data that is not UTF-8 cannot arise from decoding
    let Ok(mut object) = message.to_wire() else {
        panic!("decoded message failed to re-encode: {message:?}");
    };
    ShortKeys.compress_message(&mut object);
    let bytes = codec::encode_object(object).unwrap_or_default();

    let Some(again) = decode(&bytes) else {
        panic!("re-encoded message failed to decode: {message:?}");
    };

    // meta and visa are opaque JSON; floats inside them may drift
    assert_eq!(again.envelope(), message.envelope());
    assert_eq!(again.secure().data, message.secure().data);
    assert_eq!(again.secure().keys, message.secure().keys);
    assert_eq!(again.signature(), message.signature());
});
