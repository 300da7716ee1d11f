//! Group addressing: overt vs hidden groups, split and non-split group
//! messages, and the shared group key slot.

use std::sync::Arc;

use courier_core::{KeyCache, PackerConfig, PackerError};
use courier_harness::{Account, MemoryDirectory, Seed, TestPacker, packer};
use courier_proto::{Address, Content, EntityType, Envelope, Id, InstantMessage, SecureMessage};

struct Room {
    directory: Arc<MemoryDirectory>,
    team: Id,
    alice: Account,
    bob: Account,
    carol: Account,
    alice_packer: TestPacker,
    bob_packer: TestPacker,
    carol_packer: TestPacker,
}

impl Room {
    fn new() -> Self {
        let mut seed = Seed::new(21);
        let directory = MemoryDirectory::shared();
        let alice = Account::single("alice@AAA", &mut seed);
        let bob = Account::single("bob@BBB", &mut seed);
        let carol = Account::with_terminals("carol@CCC", &["pc", "phone"], &mut seed);
        for account in [&alice, &bob, &carol] {
            directory.register(account);
        }

        let team = Id::new(Some("team"), Address::generate(EntityType::Group, b"alice founded it"));
        directory.register_group(&team, &[bob.id().clone(), carol.id().clone()]);

        let config = PackerConfig::default();
        Self {
            alice_packer: packer(&directory, config),
            bob_packer: packer(&directory, config),
            carol_packer: packer(&directory, config),
            directory,
            team,
            alice,
            bob,
            carol,
        }
    }

    fn encrypt(&self, receiver: &Id, content: Content) -> SecureMessage {
        let message = InstantMessage::new(Envelope::new(self.alice.id().clone(), receiver.clone(), 5), content);
        self.alice_packer.encrypt(&message).expect("encrypt should succeed")
    }

    fn deliver(&self, packer: &TestPacker, secure: SecureMessage, receiver: &Id) -> Result<InstantMessage, PackerError> {
        let reliable = self.alice_packer.sign(secure)?;
        let bytes = self.alice_packer.serialize(&reliable)?;
        let secure = packer.verify(packer.deserialize(&bytes)?)?;
        packer.decrypt(&secure, receiver)
    }
}

#[test]
fn group_chat_is_overt() {
    let room = Room::new();

    let secure = room.encrypt(room.bob.id(), Content::text(1, "hi team").with_group(room.team.clone()));

    assert_eq!(secure.envelope.group, Some(room.team.clone()));
    assert_eq!(secure.envelope.destination(), room.team);
}

#[test]
fn group_command_hides_group() {
    let room = Room::new();

    let secure = room.encrypt(room.bob.id(), Content::group_command(2, "invite", room.team.clone()));

    assert_eq!(secure.envelope.group, None);
    assert_eq!(secure.envelope.destination(), *room.bob.id());

    // The group is still inside the encrypted content
    let received = room.deliver(&room.bob_packer, secure, room.bob.id()).unwrap();
    assert_eq!(received.content.group, Some(room.team.clone()));
}

#[test]
fn hidden_command_uses_personal_slot() {
    let room = Room::new();

    room.encrypt(room.bob.id(), Content::group_command(3, "expel", room.team.clone()));

    let cache = room.alice_packer.cache();
    assert!(cache.get_key(room.alice.id(), room.bob.id(), false).unwrap().is_some());
    assert!(cache.get_key(room.alice.id(), &room.team, false).unwrap().is_none());
}

#[test]
fn non_split_message_seals_for_every_member() {
    let room = Room::new();

    let secure = room.encrypt(&room.team, Content::text(4, "all of you").with_group(room.team.clone()));

    let keys = secure.keys.clone().unwrap();
    assert_eq!(
        keys.keys().collect::<Vec<_>>(),
        ["bob@BBB", "carol@CCC/pc", "carol@CCC/phone"]
    );

    assert!(room.deliver(&room.bob_packer, secure.clone(), room.bob.id()).is_ok());
    assert!(room.deliver(&room.carol_packer, secure, &room.carol.on("phone")).is_ok());
}

#[test]
fn group_receiver_without_group_field_routes_to_group() {
    let room = Room::new();

    let secure = room.encrypt(&room.team, Content::text(5, "no group field"));

    assert_eq!(secure.envelope.group, None);
    assert_eq!(secure.envelope.destination(), room.team);
    assert_eq!(secure.keys.as_ref().unwrap().len(), 3);
}

#[test]
fn non_split_follow_up_reuses_group_key() {
    let room = Room::new();
    let first = room.encrypt(&room.team, Content::text(6, "first").with_group(room.team.clone()));
    let second = room.encrypt(&room.team, Content::text(7, "second").with_group(room.team.clone()));

    assert!(first.keys.is_some());
    assert!(second.keys.is_none());

    room.deliver(&room.bob_packer, first, room.bob.id()).unwrap();
    let received = room.deliver(&room.bob_packer, second, room.bob.id()).unwrap();
    assert_eq!(received.content.text_value(), Some("second"));
}

#[test]
fn split_messages_always_carry_the_key() {
    let room = Room::new();
    let chat = |sn| Content::text(sn, "split").with_group(room.team.clone());

    let to_bob = room.encrypt(room.bob.id(), chat(8));
    let to_carol = room.encrypt(room.carol.id(), chat(9));
    let to_bob_again = room.encrypt(room.bob.id(), chat(10));

    // One shared group slot, yet every split copy seals the key
    assert!(to_bob.keys.is_some() && to_carol.keys.is_some() && to_bob_again.keys.is_some());
    assert_eq!(to_carol.keys.as_ref().unwrap().len(), 2);

    room.deliver(&room.carol_packer, to_carol, &room.carol.on("pc")).unwrap();
    let lease = room
        .carol_packer
        .cache()
        .get_key(room.alice.id(), &room.team, false)
        .unwrap()
        .expect("carol cached the group key");
    let alice_lease = room.alice_packer.cache().get_key(room.alice.id(), &room.team, false).unwrap().unwrap();
    assert_eq!(lease.key, alice_lease.key);
}

#[test]
fn member_missing_from_bundle_is_malformed() {
    let room = Room::new();
    let dave = Account::single("dave@DDD", &mut Seed::new(22));
    room.directory.register(&dave);
    let dave_packer = packer(&room.directory, PackerConfig::default());

    let secure = room.encrypt(&room.team, Content::text(11, "members only"));
    let err = room.deliver(&dave_packer, secure, dave.id()).unwrap_err();

    assert!(matches!(err, PackerError::MalformedBundle { .. }));
}

#[test]
fn unknown_member_is_skipped() {
    let room = Room::new();
    let ghost = Id::parse("ghost@GGG").unwrap();
    room.directory.register_group(&room.team, &[room.bob.id().clone(), ghost]);

    let secure = room.encrypt(&room.team, Content::text(12, "who is there"));

    assert_eq!(secure.keys.unwrap().keys().collect::<Vec<_>>(), ["bob@BBB"]);
}

#[test]
fn empty_group_has_no_encryption_key() {
    let room = Room::new();
    let empty = Id::new(Some("empty"), Address::generate(EntityType::Group, b"nobody"));
    let message = InstantMessage::new(Envelope::new(room.alice.id().clone(), empty, 5), Content::text(13, "echo"));

    let err = room.alice_packer.encrypt(&message).unwrap_err();

    assert!(matches!(err, PackerError::NoEncryptionKey { .. }));
    assert!(err.should_suspend());
}
