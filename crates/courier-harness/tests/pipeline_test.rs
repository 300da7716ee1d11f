//! End-to-end pipeline tests: encrypt -> sign -> serialize -> deserialize ->
//! verify -> decrypt between independent packers.

use std::sync::Arc;

use courier_core::{KeyCache, PackerConfig};
use courier_crypto::{SymmetricAlgorithm, VerifyKey};
use courier_harness::{Account, MemoryDirectory, Seed, TestPacker, packer};
use courier_proto::{
    Content, ContentType, Envelope, Id, InstantMessage, ReliableMessage, codec, shortener,
};
use serde_json::Value;

struct World {
    directory: Arc<MemoryDirectory>,
    alice: Account,
    bob: Account,
    alice_packer: TestPacker,
    bob_packer: TestPacker,
}

impl World {
    fn new(bob: Account, config: PackerConfig) -> Self {
        let mut seed = Seed::new(11);
        let directory = MemoryDirectory::shared();
        let alice = Account::single("alice@AAA", &mut seed);
        directory.register(&alice);
        directory.register(&bob);

        Self {
            alice_packer: packer(&directory, config),
            bob_packer: packer(&directory, config),
            directory,
            alice,
            bob,
        }
    }

    fn single() -> Self {
        Self::new(Account::single("bob@BBB", &mut Seed::new(12)), PackerConfig::default())
    }

    fn message(&self, content: Content) -> InstantMessage {
        InstantMessage::new(
            Envelope::new(self.alice.id().clone(), self.bob.id().clone(), 1_700_000_000),
            content,
        )
    }

    fn send(&self, message: &InstantMessage) -> ReliableMessage {
        let secure = self.alice_packer.encrypt(message).expect("encrypt should succeed");
        self.alice_packer.sign(secure).expect("sign should succeed")
    }
}

#[test]
fn alice_to_bob_scenario() {
    let world = World::single();
    let message = world.message(Content::text(1, "hi"));

    let reliable = world.send(&message);

    // One wildcard entry for single-device bob
    let keys = reliable.secure().keys.as_ref().expect("first message carries its key");
    assert_eq!(keys.keys().collect::<Vec<_>>(), ["bob@BBB"]);
    assert_eq!(reliable.envelope().kind, Some(ContentType::TEXT));

    // Signature checks out against alice's meta key
    let meta = world.alice.meta_key();
    assert!(meta.verify_key.verify(&reliable.secure().data, reliable.signature()));

    let secure = world.bob_packer.verify(reliable).expect("verify should succeed");
    let received = world.bob_packer.decrypt(&secure, world.bob.id()).expect("decrypt should succeed");
    assert_eq!(received.content, message.content);
    assert_eq!(received.content.text_value(), Some("hi"));

    // Generated key is AES and the body is short-key JSON
    let lease = world
        .bob_packer
        .cache()
        .get_key(world.alice.id(), world.bob.id(), false)
        .unwrap()
        .expect("bob cached the delivered key");
    assert_eq!(lease.key.algorithm(), SymmetricAlgorithm::Aes256Gcm);

    let body = codec::decode_object(&lease.key.decrypt(&secure.data).unwrap()).unwrap().unwrap();
    assert_eq!(body["T"], 1);
    assert_eq!(body["text"], "hi");
    assert!(!body.contains_key("type"));
}

#[test]
fn roundtrip_through_bytes() {
    let world = World::single();
    let message = world.message(Content::text(2, "over the wire").with_time(1_700_000_001));

    let bytes = world.alice_packer.serialize(&world.send(&message)).unwrap();
    let reliable = world.bob_packer.deserialize(&bytes).unwrap();
    let secure = world.bob_packer.verify(reliable).unwrap();
    let received = world.bob_packer.decrypt(&secure, world.bob.id()).unwrap();

    assert_eq!(received.content, message.content);
    assert_eq!(received.envelope.sender, message.envelope.sender);
    assert_eq!(received.envelope.receiver, message.envelope.receiver);
    assert_eq!(received.envelope.time, message.envelope.time);
}

#[test]
fn wire_uses_short_keys() {
    let world = World::single();
    let bytes = world.alice_packer.serialize(&world.send(&world.message(Content::text(3, "x")))).unwrap();

    let object = codec::decode_object(&bytes).unwrap().unwrap();
    for key in ["F", "R", "W", "T", "D", "K", "V"] {
        assert!(object.contains_key(key), "missing {key}");
    }
    assert!(!object.contains_key("sender"));
}

#[test]
fn long_key_deployment_interoperates() {
    let config = PackerConfig { shorten_keys: false, ..PackerConfig::default() };
    let world = World::new(Account::single("bob@BBB", &mut Seed::new(12)), config);
    let short_sender = packer(&world.directory, PackerConfig::default());

    let long_bytes = world.alice_packer.serialize(&world.send(&world.message(Content::text(4, "a")))).unwrap();
    let object = codec::decode_object(&long_bytes).unwrap().unwrap();
    assert!(object.contains_key("sender") && object.contains_key("signature"));

    // A long-key reader accepts short-key input, content keys included
    let secure = short_sender.encrypt(&world.message(Content::text(5, "b"))).unwrap();
    let short_bytes = short_sender.serialize(&short_sender.sign(secure).unwrap()).unwrap();
    let reliable = world.bob_packer.deserialize(&short_bytes).unwrap();
    let secure = world.bob_packer.verify(reliable).unwrap();
    let received = world.bob_packer.decrypt(&secure, world.bob.id()).unwrap();
    assert_eq!(received.content.sn, 5);
}

#[test]
fn multi_terminal_fan_out() {
    let bob = Account::with_terminals("bob@BBB", &["pc", "phone"], &mut Seed::new(13));
    let world = World::new(bob, PackerConfig::default());

    let reliable = world.send(&world.message(Content::text(6, "two devices")));
    let keys = reliable.secure().keys.clone().unwrap();
    assert_eq!(keys.keys().collect::<Vec<_>>(), ["bob@BBB/pc", "bob@BBB/phone"]);

    // pc needs only its own entry
    let mut secure = world.bob_packer.verify(reliable).unwrap();
    secure.keys.as_mut().unwrap().remove("bob@BBB/phone");
    let received = world.bob_packer.decrypt(&secure, &world.bob.on("pc")).unwrap();
    assert_eq!(received.content.text_value(), Some("two devices"));
}

#[test]
fn phone_decrypts_with_phone_key() {
    let bob = Account::with_terminals("bob@BBB", &["pc", "phone"], &mut Seed::new(13));
    let world = World::new(bob, PackerConfig::default());

    let secure = world.bob_packer.verify(world.send(&world.message(Content::text(7, "p")))).unwrap();

    assert!(world.bob_packer.decrypt(&secure, &world.bob.on("phone")).is_ok());
}

#[test]
fn bare_receiver_tries_every_known_terminal() {
    let bob = Account::with_terminals("bob@BBB", &["pc", "phone"], &mut Seed::new(13));
    let world = World::new(bob, PackerConfig::default());

    let mut secure = world.bob_packer.verify(world.send(&world.message(Content::text(8, "q")))).unwrap();
    secure.keys.as_mut().unwrap().remove("bob@BBB/pc");

    assert!(world.bob_packer.decrypt(&secure, world.bob.id()).is_ok());
}

#[test]
fn meta_only_receiver_gets_wildcard_entry() {
    let carol = Account::meta_only("carol@CCC", &mut Seed::new(14));
    let world = World::new(carol, PackerConfig::default());

    let reliable = world.send(&world.message(Content::text(9, "meta")));
    assert_eq!(reliable.secure().keys.as_ref().unwrap().keys().collect::<Vec<_>>(), ["carol@CCC"]);

    let secure = world.bob_packer.verify(reliable).unwrap();
    assert!(world.bob_packer.decrypt(&secure, world.bob.id()).is_ok());
}

#[test]
fn visa_signature_verifies_before_meta() {
    let world = World::single();
    let visa_key = world.alice.visa_signing_key(None).unwrap();
    world.directory.set_signing_key(world.alice.id(), visa_key);

    let reliable = world.send(&world.message(Content::text(10, "visa-signed")));

    assert!(!world.alice.meta_key().verify_key.verify(&reliable.secure().data, reliable.signature()));
    assert!(world.bob_packer.verify(reliable).is_ok());
}

#[test]
fn broadcast_is_never_encrypted() {
    let world = World::single();
    let content = Content::text(11, "hello everyone");
    let message = InstantMessage::new(
        Envelope::new(world.alice.id().clone(), Id::anyone(), 1),
        content.clone(),
    );

    let secure = world.alice_packer.encrypt(&message).unwrap();

    let mut expected = match serde_json::to_value(&content).unwrap() {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    shortener::shorten(&mut expected, shortener::CONTENT_KEYS);
    assert!(secure.keys.is_none());
    assert_eq!(secure.data, codec::encode_object(expected).unwrap());

    // Data is JSON text on the wire
    let bytes = world.alice_packer.serialize(&world.alice_packer.sign(secure).unwrap()).unwrap();
    let object = codec::decode_object(&bytes).unwrap().unwrap();
    assert!(object["D"].as_str().unwrap().starts_with('{'));

    // Anyone can read it, even without keys of their own
    let reliable = world.bob_packer.deserialize(&bytes).unwrap();
    let secure = world.bob_packer.verify(reliable).unwrap();
    let stranger = Id::parse("dave@DDD").unwrap();
    assert_eq!(world.bob_packer.decrypt(&secure, &stranger).unwrap().content, content);
}

#[test]
fn broadcast_group_is_overt_and_plain() {
    let world = World::single();
    let message = world.message(Content::text(12, "to the room").with_group(Id::everyone()));

    let secure = world.alice_packer.encrypt(&message).unwrap();

    assert_eq!(secure.envelope.group, Some(Id::everyone()));
    assert!(secure.keys.is_none());
    assert!(secure.envelope.is_broadcast());
    assert_eq!(
        codec::decode_object(&secure.data).unwrap().unwrap()["text"],
        "to the room"
    );
}
