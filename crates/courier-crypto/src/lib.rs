//! Courier Cryptographic Primitives
//!
//! Capability contracts and the concrete cipher suite used by the Courier
//! message pipeline. The pipeline itself only talks to the four capability
//! traits; everything else in this crate is one implementation of them.
//!
//! # Key Roles
//!
//! ```text
//! Sender                                   Receiver terminal
//!   │ SymmetricKey (per conversation)         │
//!   │   └─ encrypts message body              │
//!   │ EncryptKey (receiver visa, per device)  │ DecryptKey (device private key)
//!   │   └─ seals the serialized key  ───────► │   └─ opens the sealed key
//!   │ SignKey (sender identity)               │ VerifyKey (visa keys, then meta key)
//!   │   └─ signs the ciphertext     ───────►  │   └─ checks the signature
//! ```
//!
//! # Security
//!
//! - Message bodies use AEAD with a fresh random nonce per encryption, so a
//!   symmetric key may be reused across a conversation.
//! - Sealed boxes use an ephemeral X25519 key per seal; the sender keeps no
//!   state that could decrypt them later.
//! - Secret key bytes are zeroized on drop.
//! - The plain key performs no transformation. It exists only for broadcast
//!   messages, which must stay readable by everyone.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod ed25519;
mod error;
mod keys;
pub mod symmetric;
pub mod x25519;

pub use ed25519::{Ed25519SignKey, Ed25519VerifyKey};
pub use error::CryptoError;
pub use keys::{DecryptKey, EncryptKey, SignKey, VerifyKey};
pub use symmetric::{SymmetricAlgorithm, SymmetricKey};
pub use x25519::{X25519OpenKey, X25519SealKey};
