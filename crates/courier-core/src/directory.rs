//! Identity directory collaborator.
//!
//! The directory resolves identities to key material. It is backed by the
//! entity subsystem of a deployment (documents, storage, network lookups)
//! and injected into the packer; this crate only consumes it.
//!
//! # Key Material
//!
//! - [`MetaKey`]: the non-rotatable root of an identity. Its verify key is
//!   the verifier of last resort; its encrypt key (if any) is the fallback
//!   when no visa carries one.
//! - [`Document`]: a visa published by one terminal of an identity, carrying
//!   rotatable keys.

use std::{fmt, sync::Arc};

use courier_crypto::{DecryptKey, EncryptKey, SignKey, VerifyKey};
use courier_proto::Id;

/// Terminal name that matches every private key of an identity
pub const ANY_TERMINAL: &str = "*";

/// Non-rotatable public keys of an identity.
#[derive(Clone)]
pub struct MetaKey {
    /// Master verify key
    pub verify_key: Arc<dyn VerifyKey>,
    /// Master encrypt key, if the meta algorithm supports encryption
    pub encrypt_key: Option<Arc<dyn EncryptKey>>,
}

impl fmt::Debug for MetaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaKey")
            .field("verify_key", &self.verify_key.algorithm())
            .field("encrypt_key", &self.encrypt_key.as_ref().map(|k| k.algorithm()))
            .finish()
    }
}

/// Visa document of one terminal.
#[derive(Clone)]
pub struct Document {
    /// Identity that published the document
    pub identifier: Id,
    /// Terminal the document belongs to; `None` for a single-device identity
    pub terminal: Option<String>,
    /// Rotatable encrypt key
    pub encrypt_key: Option<Arc<dyn EncryptKey>>,
    /// Rotatable verify key
    pub verify_key: Option<Arc<dyn VerifyKey>>,
}

impl Document {
    /// Document with no keys.
    pub fn new(identifier: Id, terminal: Option<&str>) -> Self {
        Self {
            identifier,
            terminal: terminal.map(str::to_string),
            encrypt_key: None,
            verify_key: None,
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("identifier", &self.identifier)
            .field("terminal", &self.terminal)
            .field("encrypt_key", &self.encrypt_key.as_ref().map(|k| k.algorithm()))
            .field("verify_key", &self.verify_key.as_ref().map(|k| k.algorithm()))
            .finish()
    }
}

/// Resolves identities to key material.
///
/// Lookups are assumed to be fast local calls. Terminals on the identifiers
/// passed in are ignored except by [`Directory::private_keys`], which takes
/// the terminal explicitly.
pub trait Directory: Send + Sync {
    /// Meta key of an identity. `None` until the identity's meta is known.
    fn public_keys(&self, identity: &Id) -> Option<MetaKey>;

    /// Visa documents of an identity, one per active terminal.
    fn documents(&self, identity: &Id) -> Vec<Document>;

    /// Private keys of a local identity for one terminal, in the order they
    /// should be tried. [`ANY_TERMINAL`] returns the keys of every terminal.
    fn private_keys(&self, identity: &Id, terminal: &str) -> Vec<Arc<dyn DecryptKey>>;

    /// Signing key of a local identity.
    fn signing_key(&self, identity: &Id) -> Option<Arc<dyn SignKey>>;

    /// Members of a group. Empty if unknown.
    fn members(&self, group: &Id) -> Vec<Id>;
}

impl<T: Directory + ?Sized> Directory for Arc<T> {
    fn public_keys(&self, identity: &Id) -> Option<MetaKey> {
        (**self).public_keys(identity)
    }

    fn documents(&self, identity: &Id) -> Vec<Document> {
        (**self).documents(identity)
    }

    fn private_keys(&self, identity: &Id, terminal: &str) -> Vec<Arc<dyn DecryptKey>> {
        (**self).private_keys(identity, terminal)
    }

    fn signing_key(&self, identity: &Id) -> Option<Arc<dyn SignKey>> {
        (**self).signing_key(identity)
    }

    fn members(&self, group: &Id) -> Vec<Id> {
        (**self).members(group)
    }
}
