//! Directional cipher key cache.
//!
//! Maps `(sender, destination)` to the symmetric key of that conversation,
//! where the destination comes from [`courier_proto::destination`]. The
//! sender side fills a slot on first use and the receiver side fills it when
//! a message delivers the key.
//!
//! A generated key is not *delivered* until a message sealing it has been
//! packed. Until then every lease reports `delivered == false`, so a send
//! that fails halfway leaves the next attempt carrying the key again.
//!
//! # Invariants
//!
//! - Slots ignore terminals: all devices of a party share one key
//! - Get-or-generate is atomic per cache, so two concurrent first messages
//!   in one conversation never produce two different keys
//! - Keys stored with [`KeyCache::put_key`] came from the peer and count as
//!   delivered
//! - Broadcast destinations always resolve to the plain key
//!
//! Entries never expire here; eviction is the owner's policy.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use courier_crypto::{CryptoError, SymmetricAlgorithm, SymmetricKey};
use courier_proto::Id;

/// A key handed out by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLease {
    /// The conversation key
    pub key: SymmetricKey,
    /// True once the destination has been sent this key, so messages may
    /// omit it
    pub delivered: bool,
}

/// Storage for conversation keys.
pub trait KeyCache: Send + Sync {
    /// Key for `sender -> destination`.
    ///
    /// With `generate`, a missing key is created and stored. Returns `None`
    /// only when the slot is empty and `generate` is false.
    fn get_key(
        &self,
        sender: &Id,
        destination: &Id,
        generate: bool,
    ) -> Result<Option<KeyLease>, CryptoError>;

    /// Store or replace the key for `sender -> destination`.
    fn put_key(&self, sender: &Id, destination: &Id, key: SymmetricKey);

    /// Record whether the key for `sender -> destination` has been sent.
    ///
    /// No effect on an empty slot.
    fn set_delivered(&self, sender: &Id, destination: &Id, delivered: bool);
}

impl<T: KeyCache + ?Sized> KeyCache for Arc<T> {
    fn get_key(
        &self,
        sender: &Id,
        destination: &Id,
        generate: bool,
    ) -> Result<Option<KeyLease>, CryptoError> {
        (**self).get_key(sender, destination, generate)
    }

    fn put_key(&self, sender: &Id, destination: &Id, key: SymmetricKey) {
        (**self).put_key(sender, destination, key);
    }

    fn set_delivered(&self, sender: &Id, destination: &Id, delivered: bool) {
        (**self).set_delivered(sender, destination, delivered);
    }
}

/// In-memory key cache behind a single lock.
#[derive(Debug, Default)]
pub struct MemoryKeyCache {
    algorithm: SymmetricAlgorithm,
    slots: Mutex<HashMap<(Id, Id), Slot>>,
}

#[derive(Debug)]
struct Slot {
    key: SymmetricKey,
    delivered: bool,
}

impl MemoryKeyCache {
    /// Empty cache generating keys with `algorithm`.
    pub fn new(algorithm: SymmetricAlgorithm) -> Self {
        Self { algorithm, slots: Mutex::new(HashMap::new()) }
    }

    /// Number of cached conversations.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    /// True if no conversation key is cached.
    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    /// Drop every cached key.
    pub fn clear(&self) {
        self.slots().clear();
    }

    // Slots hold plain data, so a panic elsewhere cannot leave them torn.
    fn slots(&self) -> MutexGuard<'_, HashMap<(Id, Id), Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn slot(sender: &Id, destination: &Id) -> (Id, Id) {
    (sender.without_terminal(), destination.without_terminal())
}

impl KeyCache for MemoryKeyCache {
    fn get_key(
        &self,
        sender: &Id,
        destination: &Id,
        generate: bool,
    ) -> Result<Option<KeyLease>, CryptoError> {
        if destination.is_broadcast() {
            return Ok(Some(KeyLease { key: SymmetricKey::plain(), delivered: true }));
        }

        let slot = slot(sender, destination);
        let mut slots = self.slots();
        if let Some(Slot { key, delivered }) = slots.get(&slot) {
            return Ok(Some(KeyLease { key: key.clone(), delivered: *delivered }));
        }
        if !generate {
            return Ok(None);
        }

        let key = SymmetricKey::generate(self.algorithm)?;
        tracing::debug!(
            %sender,
            %destination,
            algorithm = self.algorithm.name(),
            "generated conversation key"
        );
        slots.insert(slot, Slot { key: key.clone(), delivered: false });
        Ok(Some(KeyLease { key, delivered: false }))
    }

    fn put_key(&self, sender: &Id, destination: &Id, key: SymmetricKey) {
        if destination.is_broadcast() {
            return;
        }
        let replaced = self
            .slots()
            .insert(slot(sender, destination), Slot { key: key.clone(), delivered: true });
        if replaced.as_ref().map(|slot| &slot.key) != Some(&key) {
            tracing::debug!(%sender, %destination, "cached conversation key");
        }
    }

    fn set_delivered(&self, sender: &Id, destination: &Id, delivered: bool) {
        if let Some(slot) = self.slots().get_mut(&slot(sender, destination)) {
            slot.delivered = delivered;
        }
    }
}
