//! Courier Message Pipeline
//!
//! Turns plaintext instant messages into signed, per-recipient encrypted
//! reliable messages and back. Identity resolution is delegated to an
//! injected [`Directory`]; cipher primitives come from `courier-crypto`
//! through its capability traits.
//!
//! # Components
//!
//! - [`MessagePacker`]: the four pipeline stages plus the byte boundary
//! - [`KeyCache`]: one symmetric key per `(sender, destination)`
//! - [`bundle`]: the symmetric key sealed once per recipient terminal
//! - [`VisaAgent`]: which public keys to seal with and verify against
//!
//! # Key Reuse
//!
//! A conversation key travels with the first message of a conversation and
//! is then omitted. The receiver caches it on first decryption, so later
//! messages decrypt from the cache. A receiver that missed the first
//! message gets [`PackerError::KeyCacheMiss`] and must ask for a resend.
//!
//! # Concurrency
//!
//! The packer holds no mutable state of its own. The key cache is the only
//! shared resource and serializes its read-modify-write internally, so one
//! packer can be shared across threads.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bundle;
pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod packer;
pub mod visa;

pub use bundle::EncryptedBundle;
pub use cache::{KeyCache, KeyLease, MemoryKeyCache};
pub use config::PackerConfig;
pub use directory::{ANY_TERMINAL, Directory, Document, MetaKey};
pub use error::PackerError;
pub use packer::{MessagePacker, overt_group};
pub use visa::{DefaultVisaAgent, VisaAgent};
