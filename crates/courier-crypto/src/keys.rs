//! Capability contracts consumed by the message pipeline.
//!
//! Each trait is object-safe so the directory can hand out
//! `Arc<dyn EncryptKey>` regardless of the concrete algorithm behind it.

use crate::error::CryptoError;

/// Public key that can encrypt data for its owner.
pub trait EncryptKey: Send + Sync {
    /// Algorithm name, for diagnostics.
    fn algorithm(&self) -> &'static str;

    /// Encrypt `plaintext` so only the matching [`DecryptKey`] can open it.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Private key that opens data encrypted by the matching [`EncryptKey`].
pub trait DecryptKey: Send + Sync {
    /// Algorithm name, for diagnostics.
    fn algorithm(&self) -> &'static str;

    /// Decrypt `ciphertext`.
    ///
    /// Fails if the ciphertext was produced for a different key or has been
    /// tampered with.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Private key that signs data.
pub trait SignKey: Send + Sync {
    /// Algorithm name, for diagnostics.
    fn algorithm(&self) -> &'static str;

    /// Sign `data`.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Public key that checks signatures.
pub trait VerifyKey: Send + Sync {
    /// Algorithm name, for diagnostics.
    fn algorithm(&self) -> &'static str;

    /// True if `signature` is a valid signature over `data` by the matching
    /// [`SignKey`]. Malformed signatures are simply invalid.
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool;
}
