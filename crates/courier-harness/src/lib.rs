//! Test harness for the Courier message pipeline.
//!
//! An in-memory [`Directory`] plus account fixtures with deterministic key
//! material, so pipeline tests can run several parties against one
//! directory without any entity subsystem.
//!
//! Each party should get its own [`MessagePacker`] (and so its own key
//! cache); sharing a packer between sender and receiver would hide key
//! delivery bugs behind a shared cache slot.
//!
//! # Example
//!
//! ```
//! use courier_harness::{Account, MemoryDirectory, Seed};
//!
//! let mut seed = Seed::new(7);
//! let directory = MemoryDirectory::shared();
//! let alice = Account::single("alice@AAA", &mut seed);
//! directory.register(&alice);
//! assert!(directory.knows(alice.id()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use courier_core::{ANY_TERMINAL, Directory, Document, MessagePacker, MetaKey, PackerConfig};
use courier_crypto::{DecryptKey, Ed25519SignKey, EncryptKey, SignKey, X25519OpenKey};
use courier_proto::Id;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Packer type used by the pipeline tests.
pub type TestPacker = MessagePacker<Arc<MemoryDirectory>>;

/// Seeded source of key material.
#[derive(Debug, Clone)]
pub struct Seed(ChaCha8Rng);

impl Seed {
    /// Deterministic source for `seed`.
    pub fn new(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    fn bytes(&mut self) -> [u8; 32] {
        let mut out = [0u8; 32];
        self.0.fill_bytes(&mut out);
        out
    }

    fn signing_key(&mut self) -> Ed25519SignKey {
        Ed25519SignKey::from_seed(&self.bytes())
    }

    fn open_key(&mut self) -> X25519OpenKey {
        X25519OpenKey::from_bytes(self.bytes())
    }
}

/// Private keys of one terminal.
struct Terminal {
    name: Option<String>,
    open_key: Arc<X25519OpenKey>,
    visa_key: Arc<Ed25519SignKey>,
}

/// A party with its full key material.
pub struct Account {
    id: Id,
    master: Arc<Ed25519SignKey>,
    meta_open_key: Option<Arc<X25519OpenKey>>,
    terminals: Vec<Terminal>,
}

impl Account {
    /// Single-device account: one visa document with no terminal tag.
    ///
    /// Keys sealed for it are addressed to the bare identity.
    ///
    /// # Panics
    ///
    /// If `id` is not a valid identifier.
    pub fn single(id: &str, seed: &mut Seed) -> Self {
        let mut account = Self::meta(id, false, seed);
        account.terminals.push(Terminal {
            name: None,
            open_key: Arc::new(seed.open_key()),
            visa_key: Arc::new(seed.signing_key()),
        });
        account
    }

    /// Multi-device account: one visa document per terminal.
    ///
    /// # Panics
    ///
    /// If `id` is not a valid identifier.
    pub fn with_terminals(id: &str, terminals: &[&str], seed: &mut Seed) -> Self {
        let mut account = Self::meta(id, false, seed);
        for name in terminals {
            account.terminals.push(Terminal {
                name: Some((*name).to_string()),
                open_key: Arc::new(seed.open_key()),
                visa_key: Arc::new(seed.signing_key()),
            });
        }
        account
    }

    /// Account with no visa documents; keys are sealed with its meta key.
    ///
    /// # Panics
    ///
    /// If `id` is not a valid identifier.
    pub fn meta_only(id: &str, seed: &mut Seed) -> Self {
        Self::meta(id, true, seed)
    }

    #[allow(clippy::expect_used)]
    fn meta(id: &str, meta_encrypts: bool, seed: &mut Seed) -> Self {
        let id = Id::parse(id).expect("fixture identifier must be valid");
        let master = Arc::new(seed.signing_key());
        let meta_open_key = meta_encrypts.then(|| Arc::new(seed.open_key()));
        Self { id, master, meta_open_key, terminals: Vec::new() }
    }

    /// Identity without terminal.
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Identity bound to `terminal`.
    pub fn on(&self, terminal: &str) -> Id {
        self.id.with_terminal(terminal)
    }

    /// Terminal names, in registration order.
    pub fn terminal_names(&self) -> Vec<&str> {
        self.terminals.iter().filter_map(|t| t.name.as_deref()).collect()
    }

    /// Public meta key.
    pub fn meta_key(&self) -> MetaKey {
        MetaKey {
            verify_key: Arc::new(self.master.verify_key()),
            encrypt_key: self
                .meta_open_key
                .as_ref()
                .map(|key| Arc::new(key.seal_key()) as Arc<dyn EncryptKey>),
        }
    }

    /// Public visa documents.
    pub fn documents(&self) -> Vec<Document> {
        self.terminals
            .iter()
            .map(|terminal| Document {
                encrypt_key: Some(Arc::new(terminal.open_key.seal_key())),
                verify_key: Some(Arc::new(terminal.visa_key.verify_key())),
                ..Document::new(self.id.clone(), terminal.name.as_deref())
            })
            .collect()
    }

    /// Identity signing key.
    pub fn signing_key(&self) -> Arc<dyn SignKey> {
        Arc::clone(&self.master) as Arc<dyn SignKey>
    }

    /// Visa signing key of a terminal (`None` for the untagged document).
    pub fn visa_signing_key(&self, terminal: Option<&str>) -> Option<Arc<dyn SignKey>> {
        self.terminals
            .iter()
            .find(|t| t.name.as_deref() == terminal)
            .map(|t| Arc::clone(&t.visa_key) as Arc<dyn SignKey>)
    }

    fn private_keys(&self) -> Vec<(String, Arc<dyn DecryptKey>)> {
        let terminals = self.terminals.iter().map(|t| {
            let name = t.name.clone().unwrap_or_else(|| ANY_TERMINAL.to_string());
            (name, Arc::clone(&t.open_key) as Arc<dyn DecryptKey>)
        });
        let meta = self
            .meta_open_key
            .iter()
            .map(|key| (ANY_TERMINAL.to_string(), Arc::clone(key) as Arc<dyn DecryptKey>));
        terminals.chain(meta).collect()
    }
}

#[derive(Default)]
struct Tables {
    metas: HashMap<Id, MetaKey>,
    documents: HashMap<Id, Vec<Document>>,
    private_keys: HashMap<Id, Vec<(String, Arc<dyn DecryptKey>)>>,
    signing_keys: HashMap<Id, Arc<dyn SignKey>>,
    members: HashMap<Id, Vec<Id>>,
}

/// Directory backed by in-memory tables.
///
/// Identities are stored without terminals.
#[derive(Default)]
pub struct MemoryDirectory {
    tables: RwLock<Tables>,
}

impl MemoryDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty directory behind an `Arc`, ready to share between packers.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Publish an account's public keys and hold its private keys.
    pub fn register(&self, account: &Account) {
        self.register_public(account);
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.private_keys.insert(account.id.clone(), account.private_keys());
        tables.signing_keys.insert(account.id.clone(), account.signing_key());
    }

    /// Publish only an account's public keys (a remote party).
    pub fn register_public(&self, account: &Account) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.metas.insert(account.id.clone(), account.meta_key());
        tables.documents.insert(account.id.clone(), account.documents());
        tracing::debug!(identity = %account.id, terminals = account.terminals.len(), "registered account");
    }

    /// Replace an identity's visa documents.
    pub fn set_documents(&self, identity: &Id, documents: Vec<Document>) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.documents.insert(identity.without_terminal(), documents);
    }

    /// Replace an identity's signing key.
    pub fn set_signing_key(&self, identity: &Id, key: Arc<dyn SignKey>) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.signing_keys.insert(identity.without_terminal(), key);
    }

    /// Forget an identity's public keys.
    pub fn forget(&self, identity: &Id) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.metas.remove(&identity.without_terminal());
        tables.documents.remove(&identity.without_terminal());
    }

    /// Set the member list of a group.
    pub fn register_group(&self, group: &Id, members: &[Id]) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.members.insert(group.without_terminal(), members.to_vec());
    }

    /// True if the identity's meta key is known.
    pub fn knows(&self, identity: &Id) -> bool {
        self.read().metas.contains_key(&identity.without_terminal())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Directory for MemoryDirectory {
    fn public_keys(&self, identity: &Id) -> Option<MetaKey> {
        self.read().metas.get(&identity.without_terminal()).cloned()
    }

    fn documents(&self, identity: &Id) -> Vec<Document> {
        self.read().documents.get(&identity.without_terminal()).cloned().unwrap_or_default()
    }

    fn private_keys(&self, identity: &Id, terminal: &str) -> Vec<Arc<dyn DecryptKey>> {
        self.read()
            .private_keys
            .get(&identity.without_terminal())
            .into_iter()
            .flatten()
            .filter(|(name, _)| terminal == ANY_TERMINAL || name == terminal)
            .map(|(_, key)| Arc::clone(key))
            .collect()
    }

    fn signing_key(&self, identity: &Id) -> Option<Arc<dyn SignKey>> {
        self.read().signing_keys.get(&identity.without_terminal()).cloned()
    }

    fn members(&self, group: &Id) -> Vec<Id> {
        self.read().members.get(&group.without_terminal()).cloned().unwrap_or_default()
    }
}

/// Packer for one party over a shared directory.
pub fn packer(directory: &Arc<MemoryDirectory>, config: PackerConfig) -> TestPacker {
    MessagePacker::new(Arc::clone(directory), config)
}
