//! Ed25519 signing keys.
//!
//! Used for the sender's identity signature over message ciphertext and for
//! the verify keys published in meta and visa documents.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::{
    error::CryptoError,
    keys::{SignKey, VerifyKey},
};

const ALGORITHM: &str = "Ed25519";

/// Ed25519 private signing key.
///
/// `ed25519-dalek` zeroizes the secret scalar on drop.
pub struct Ed25519SignKey(SigningKey);

impl Ed25519SignKey {
    /// Generate a fresh key from OS entropy.
    pub fn generate() -> Self {
        Self(SigningKey::generate(&mut OsRng))
    }

    /// Restore a key from its 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    /// Matching public key.
    pub fn verify_key(&self) -> Ed25519VerifyKey {
        Ed25519VerifyKey(self.0.verifying_key())
    }
}

impl SignKey for Ed25519SignKey {
    fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(self.0.sign(data).to_bytes().to_vec())
    }
}

/// Ed25519 public verify key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ed25519VerifyKey(VerifyingKey);

impl Ed25519VerifyKey {
    /// Parse a 32-byte compressed public key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: &[u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKey {
            algorithm: ALGORITHM,
            reason: format!("expected 32 bytes, got {}", bytes.len()),
        })?;
        VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|e| CryptoError::InvalidKey { algorithm: ALGORITHM, reason: e.to_string() })
    }

    /// Compressed public key bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl VerifyKey for Ed25519VerifyKey {
    fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(signature) => self.0.verify(data, &signature).is_ok(),
            Err(_) => false,
        }
    }
}
