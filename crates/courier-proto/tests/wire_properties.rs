//! Property-based tests for identifiers and the message wire boundary
//!
//! These verify that identifiers survive their text form, that key
//! shortening is reversible, and that reliable messages survive the full
//! typed -> object -> compressed -> bytes path and back.

use courier_proto::{
    Address, Compressor, ContentType, EntityType, Envelope, Id, LongKeys, ReliableMessage,
    SecureMessage, ShortKeys, codec, shortener,
};
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Strategy for identifier names and terminals
fn arbitrary_label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.-]{0,11}"
}

/// Strategy for addresses: plain text, derived, or broadcast
fn arbitrary_address() -> impl Strategy<Value = Address> {
    prop_oneof![
        "[A-Za-z0-9]{1,16}".prop_map(|text| Address::parse(&text).expect("valid address text")),
        (
            prop_oneof![Just(EntityType::User), Just(EntityType::Group), Just(EntityType::Bot)],
            prop::collection::vec(any::<u8>(), 32),
        )
            .prop_map(|(network, material)| Address::generate(network, &material)),
        Just(Address::parse("anywhere").expect("reserved address")),
        Just(Address::parse("everywhere").expect("reserved address")),
    ]
}

/// Strategy for full identifiers
fn arbitrary_id() -> impl Strategy<Value = Id> {
    (
        prop::option::of(arbitrary_label()),
        arbitrary_address(),
        prop::option::of(arbitrary_label()),
    )
        .prop_map(|(name, address, terminal)| {
            let id = Id::new(name.as_deref(), address);
            match terminal {
                Some(terminal) => id.with_terminal(&terminal),
                None => id,
            }
        })
}

/// Strategy for signed messages to non-broadcast user receivers
fn arbitrary_reliable() -> impl Strategy<Value = ReliableMessage> {
    (
        arbitrary_id(),
        arbitrary_label(),
        any::<u64>(),
        prop::collection::vec(any::<u8>(), 0..256),
        prop::collection::btree_map(arbitrary_label(), "[A-Za-z0-9+/]{4,44}", 0..4),
        prop::collection::vec(any::<u8>(), 64),
    )
        .prop_map(|(sender, receiver, time, data, keys, signature)| {
            let receiver = Id::parse(&format!("{receiver}@BBB")).expect("valid receiver");
            let mut envelope = Envelope::new(sender, receiver, time);
            envelope.kind = Some(ContentType::TEXT);

            let mut secure = SecureMessage::new(envelope, data);
            secure.keys = (!keys.is_empty()).then_some(keys);
            ReliableMessage::new(secure, signature)
        })
}

fn to_bytes(message: &ReliableMessage, compressor: &dyn Compressor) -> Vec<u8> {
    let mut object = message.to_wire().expect("to_wire should succeed");
    compressor.compress_message(&mut object);
    codec::encode_object(object).expect("encode should succeed")
}

fn from_bytes(bytes: &[u8], compressor: &dyn Compressor) -> ReliableMessage {
    let mut object = codec::decode_object(bytes)
        .expect("decode should succeed")
        .expect("bytes are not empty");
    compressor.extract_message(&mut object);
    ReliableMessage::from_wire(object).expect("from_wire should succeed")
}

#[test]
fn prop_id_text_roundtrip() {
    proptest!(|(id in arbitrary_id())| {
        let parsed = Id::parse(&id.to_string()).expect("display output should parse");

        // PROPERTY: Display then parse is identity, including entity type
        prop_assert_eq!(&parsed, &id);
        prop_assert_eq!(parsed.entity_type(), id.entity_type());
    });
}

#[test]
fn prop_terminal_never_changes_party() {
    proptest!(|(id in arbitrary_id(), terminal in arbitrary_label())| {
        let bound = id.with_terminal(&terminal);

        prop_assert!(bound.same_party(&id));
        prop_assert_eq!(bound.without_terminal(), id.without_terminal());
        prop_assert_eq!(bound.is_broadcast(), id.is_broadcast());
    });
}

#[test]
fn prop_shorten_restore_identity() {
    let long_names: Vec<&str> = shortener::MESSAGE_KEYS.iter().skip(1).step_by(2).copied().collect();

    proptest!(|(
        present in prop::collection::vec(any::<bool>(), long_names.len()),
        extra in prop::collection::btree_map("[a-z]{3,8}", any::<i64>(), 0..4),
    )| {
        let mut original = Map::new();
        for (name, keep) in long_names.iter().zip(&present) {
            if *keep {
                original.insert((*name).to_string(), Value::from(*name));
            }
        }
        for (name, value) in extra {
            original.insert(name, Value::from(value));
        }

        let mut object = original.clone();
        shortener::shorten(&mut object, shortener::MESSAGE_KEYS);
        shortener::restore(&mut object, shortener::MESSAGE_KEYS);

        // PROPERTY: restore(shorten(x)) == x
        prop_assert_eq!(object, original);
    });
}

#[test]
fn prop_reliable_bytes_roundtrip() {
    proptest!(|(message in arbitrary_reliable())| {
        // PROPERTY: Both compressors produce bytes that parse back to the same message
        prop_assert_eq!(&from_bytes(&to_bytes(&message, &ShortKeys), &ShortKeys), &message);
        prop_assert_eq!(&from_bytes(&to_bytes(&message, &LongKeys), &LongKeys), &message);
    });
}

#[test]
fn prop_short_keys_readable_by_long_keys_reader() {
    proptest!(|(message in arbitrary_reliable())| {
        let bytes = to_bytes(&message, &ShortKeys);

        // PROPERTY: A long-key deployment still reads compressed messages
        prop_assert_eq!(&from_bytes(&bytes, &LongKeys), &message);
    });
}

#[test]
fn prop_compressed_encoding_is_smaller() {
    proptest!(|(message in arbitrary_reliable())| {
        let short = to_bytes(&message, &ShortKeys);
        let long = to_bytes(&message, &LongKeys);

        prop_assert!(short.len() < long.len(), "{} >= {}", short.len(), long.len());
    });
}
