//! Entity identifiers.
//!
//! Text form: `[name@]address[/terminal]`.
//!
//! The address decides what kind of entity an identifier names. Two
//! addresses are reserved for broadcast: `anywhere` (broadcast user, e.g.
//! `anyone@anywhere`) and `everywhere` (broadcast group, e.g.
//! `everyone@everywhere`). Derived addresses are 42 hex digits: one network
//! byte followed by a 20-byte key digest. Any other address text names a
//! plain user.
//!
//! The terminal tag names one logged-in device of the entity. Identifiers
//! that differ only by terminal refer to the same party.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{ProtocolError, Result};

/// Reserved address of broadcast users
pub const ANYWHERE: &str = "anywhere";

/// Reserved address of broadcast groups
pub const EVERYWHERE: &str = "everywhere";

/// Length of the key digest inside a derived address
const DIGEST_SIZE: usize = 20;

/// Kind of entity, carried by the network byte of its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    /// Person
    User,
    /// Group of users
    Group,
    /// Relay station
    Station,
    /// Automated user
    Bot,
    /// Broadcast user (`anywhere`)
    Any,
    /// Broadcast group (`everywhere`)
    Every,
}

impl EntityType {
    /// Network byte of this entity type.
    pub const fn network(self) -> u8 {
        match self {
            Self::User => 0x00,
            Self::Group => 0x01,
            Self::Station => 0x02,
            Self::Bot => 0x04,
            Self::Any => 0x80,
            Self::Every => 0x81,
        }
    }

    /// Entity type for a network byte. `None` if unassigned.
    pub const fn from_network(network: u8) -> Option<Self> {
        match network {
            0x00 => Some(Self::User),
            0x01 => Some(Self::Group),
            0x02 => Some(Self::Station),
            0x04 => Some(Self::Bot),
            0x80 => Some(Self::Any),
            0x81 => Some(Self::Every),
            _ => None,
        }
    }

    /// True for groups, including the broadcast group.
    pub const fn is_group(self) -> bool {
        matches!(self, Self::Group | Self::Every)
    }

    /// True for anything that is not a group.
    pub const fn is_user(self) -> bool {
        !self.is_group()
    }

    /// True for the two broadcast types.
    pub const fn is_broadcast(self) -> bool {
        matches!(self, Self::Any | Self::Every)
    }
}

/// Address part of an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    text: String,
    network: EntityType,
}

impl Address {
    /// Parse address text and classify it.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(ProtocolError::InvalidId { input: text.to_string(), reason: "empty address" });
        }
        if text.contains(['@', '/']) || text.chars().any(char::is_whitespace) {
            return Err(ProtocolError::InvalidId {
                input: text.to_string(),
                reason: "address contains a reserved character",
            });
        }

        let network = match text {
            ANYWHERE => EntityType::Any,
            EVERYWHERE => EntityType::Every,
            _ => derived_network(text).unwrap_or(EntityType::User),
        };
        Ok(Self { text: text.to_string(), network })
    }

    /// Derive an address for `network` from public key material.
    ///
    /// `hex(network || sha256(key_material)[..20])`
    pub fn generate(network: EntityType, key_material: &[u8]) -> Self {
        let digest = Sha256::digest(key_material);
        let mut raw = Vec::with_capacity(1 + DIGEST_SIZE);
        raw.push(network.network());
        raw.extend_from_slice(&digest[..DIGEST_SIZE]);
        Self { text: hex::encode(raw), network }
    }

    /// Entity type encoded in this address.
    pub fn network(&self) -> EntityType {
        self.network
    }

    /// Address text.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn derived_network(text: &str) -> Option<EntityType> {
    if text.len() != 2 * (1 + DIGEST_SIZE) {
        return None;
    }
    let raw = hex::decode(text).ok()?;
    EntityType::from_network(raw[0])
}

/// Entity identifier.
///
/// # Invariants
///
/// - Equality and hashing include the terminal
/// - `name` and `terminal`, when present, are non-empty
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Id {
    name: Option<String>,
    address: Address,
    terminal: Option<String>,
}

impl Id {
    /// Build an identifier from parts.
    pub fn new(name: Option<&str>, address: Address) -> Self {
        Self {
            name: name.filter(|n| !n.is_empty()).map(str::to_string),
            address,
            terminal: None,
        }
    }

    /// The broadcast user `anyone@anywhere`.
    pub fn anyone() -> Self {
        Self::new(Some("anyone"), Address { text: ANYWHERE.to_string(), network: EntityType::Any })
    }

    /// The broadcast group `everyone@everywhere`.
    pub fn everyone() -> Self {
        Self::new(
            Some("everyone"),
            Address { text: EVERYWHERE.to_string(), network: EntityType::Every },
        )
    }

    /// Parse `[name@]address[/terminal]`.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason| ProtocolError::InvalidId { input: input.to_string(), reason };

        let (identity, terminal) = match input.split_once('/') {
            Some((_, "")) => return Err(invalid("empty terminal")),
            Some((identity, terminal)) => (identity, Some(terminal.to_string())),
            None => (input, None),
        };
        let (name, address) = match identity.split_once('@') {
            Some(("", _)) => return Err(invalid("empty name")),
            Some((name, address)) => (Some(name), address),
            None => (None, identity),
        };
        let address = Address::parse(address).map_err(|_| invalid("malformed address"))?;

        Ok(Self { name: name.map(str::to_string), address, terminal })
    }

    /// Same identity bound to one device.
    #[must_use]
    pub fn with_terminal(&self, terminal: &str) -> Self {
        let terminal = Some(terminal).filter(|t| !t.is_empty()).map(str::to_string);
        Self { terminal, ..self.clone() }
    }

    /// Same identity with no device tag.
    #[must_use]
    pub fn without_terminal(&self) -> Self {
        Self { terminal: None, ..self.clone() }
    }

    /// True if both identifiers name the same party, ignoring terminals.
    pub fn same_party(&self, other: &Self) -> bool {
        self.name == other.name && self.address == other.address
    }

    /// Name part, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Address part.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Terminal tag, if bound to a device.
    pub fn terminal(&self) -> Option<&str> {
        self.terminal.as_deref()
    }

    /// Entity type of the address.
    pub fn entity_type(&self) -> EntityType {
        self.address.network()
    }

    /// True for users (including broadcast users).
    pub fn is_user(&self) -> bool {
        self.entity_type().is_user()
    }

    /// True for groups (including the broadcast group).
    pub fn is_group(&self) -> bool {
        self.entity_type().is_group()
    }

    /// True for `anywhere` / `everywhere` identifiers.
    pub fn is_broadcast(&self) -> bool {
        self.entity_type().is_broadcast()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}@")?;
        }
        write!(f, "{}", self.address)?;
        if let Some(terminal) = &self.terminal {
            write!(f, "/{terminal}")?;
        }
        Ok(())
    }
}

impl FromStr for Id {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_form() {
        let id = Id::parse("bob@BBB/phone").unwrap();

        assert_eq!(id.name(), Some("bob"));
        assert_eq!(id.address().as_str(), "BBB");
        assert_eq!(id.terminal(), Some("phone"));
        assert_eq!(id.to_string(), "bob@BBB/phone");
    }

    #[test]
    fn parse_address_only() {
        let id = Id::parse("moon").unwrap();

        assert_eq!(id.name(), None);
        assert_eq!(id.to_string(), "moon");
        assert!(id.is_user());
    }

    #[test]
    fn parse_rejects_malformed() {
        for input in ["", "@BBB", "bob@", "bob@BBB/", "bob@B B", "a@b@c"] {
            assert!(Id::parse(input).is_err(), "{input:?} should be rejected");
        }
    }

    #[test]
    fn broadcast_classification() {
        let anyone = Id::parse("anyone@anywhere").unwrap();
        let everyone = Id::parse("everyone@everywhere").unwrap();
        let broadcast_group = Id::parse("chatroom@everywhere").unwrap();

        assert_eq!(anyone, Id::anyone());
        assert_eq!(everyone, Id::everyone());
        assert!(anyone.is_broadcast() && anyone.is_user());
        assert!(everyone.is_broadcast() && everyone.is_group());
        assert!(broadcast_group.is_broadcast() && broadcast_group.is_group());
    }

    #[test]
    fn derived_group_address() {
        let address = Address::generate(EntityType::Group, b"founder public key");
        let group = Id::new(Some("team"), address.clone());
        let reparsed = Id::parse(&group.to_string()).unwrap();

        assert_eq!(address.as_str().len(), 42);
        assert!(address.as_str().starts_with("01"));
        assert!(reparsed.is_group());
        assert!(!reparsed.is_broadcast());
        assert_eq!(reparsed, group);
    }

    #[test]
    fn unknown_network_byte_is_user() {
        let text = format!("7f{}", "00".repeat(DIGEST_SIZE));

        assert_eq!(Address::parse(&text).unwrap().network(), EntityType::User);
    }

    #[test]
    fn terminal_does_not_change_party() {
        let pc = Id::parse("bob@BBB/pc").unwrap();
        let phone = pc.with_terminal("phone");

        assert_ne!(pc, phone);
        assert!(pc.same_party(&phone));
        assert_eq!(pc.without_terminal(), phone.without_terminal());
        assert_eq!(pc.without_terminal().to_string(), "bob@BBB");
    }

    #[test]
    fn serde_as_string() {
        let id = Id::parse("alice@AAA").unwrap();
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, "\"alice@AAA\"");
        assert_eq!(serde_json::from_str::<Id>(&json).unwrap(), id);
        assert!(serde_json::from_str::<Id>("\"@\"").is_err());
    }
}
