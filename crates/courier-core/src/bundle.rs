//! Multi-terminal key bundles.
//!
//! A symmetric key sealed once per terminal of one recipient. On the wire
//! each sealed copy is an entry of the message `keys` map:
//!
//! ```text
//! "bob@BBB"        -> base64   (wildcard: single-device or meta key)
//! "bob@BBB/pc"     -> base64
//! "bob@BBB/phone"  -> base64
//! ```
//!
//! Decoding picks the entries addressed to one local identity: each known
//! terminal first, then the bare identity, then an explicit `/*` entry.

use std::collections::BTreeMap;

use courier_proto::{EncryptedKeys, Id, codec};

use crate::{directory::ANY_TERMINAL, error::PackerError};

/// Sealed copies of one key, by terminal. `*` is the wildcard terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedBundle {
    entries: BTreeMap<String, Vec<u8>>,
}

impl EncryptedBundle {
    /// Empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the sealed key for `terminal`, replacing any previous one.
    pub fn insert(&mut self, terminal: &str, sealed: Vec<u8>) {
        self.entries.insert(terminal.to_string(), sealed);
    }

    /// Sealed key for `terminal`.
    pub fn get(&self, terminal: &str) -> Option<&[u8]> {
        self.entries.get(terminal).map(Vec::as_slice)
    }

    /// True if no terminal had a usable key.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of sealed copies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `(terminal, sealed key)` pairs in terminal order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(t, sealed)| (t.as_str(), sealed.as_slice()))
    }
}

fn is_wildcard(terminal: &str) -> bool {
    terminal.is_empty() || terminal == ANY_TERMINAL
}

/// Wire entries for `recipient`'s bundle. The recipient's own terminal tag,
/// if any, is ignored.
pub fn encode(recipient: &Id, bundle: &EncryptedBundle) -> EncryptedKeys {
    let identity = recipient.without_terminal();
    bundle
        .iter()
        .map(|(terminal, sealed)| {
            let address = if is_wildcard(terminal) {
                identity.to_string()
            } else {
                format!("{identity}/{terminal}")
            };
            (address, codec::base64_encode(sealed))
        })
        .collect()
}

/// Entries of `keys` addressed to `receiver`.
///
/// Each terminal in `terminals` is looked up as `identity/terminal`. If none
/// match, the bare identity is taken as the wildcard entry, and failing that
/// an explicit `identity/*` entry. Entries of other identities and of other
/// terminals are ignored.
///
/// # Errors
///
/// - `MalformedBundle` if nothing is addressed to `receiver`
/// - `Protocol` if a matching entry is not valid base64
pub fn decode(
    keys: &EncryptedKeys,
    receiver: &Id,
    terminals: &[String],
) -> Result<EncryptedBundle, PackerError> {
    let identity = receiver.without_terminal().to_string();
    let mut bundle = EncryptedBundle::new();

    for terminal in terminals.iter().filter(|t| !is_wildcard(t)) {
        if let Some(sealed) = keys.get(&format!("{identity}/{terminal}")) {
            bundle.insert(terminal, codec::base64_decode(sealed)?);
        }
    }

    if bundle.is_empty() {
        let wildcard = keys
            .get(&identity)
            .or_else(|| keys.get(&format!("{identity}/{ANY_TERMINAL}")));
        if let Some(sealed) = wildcard {
            bundle.insert(ANY_TERMINAL, codec::base64_decode(sealed)?);
        }
    }

    if bundle.is_empty() {
        return Err(PackerError::MalformedBundle { receiver: receiver.clone() });
    }
    Ok(bundle)
}
