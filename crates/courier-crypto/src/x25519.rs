//! X25519 sealed boxes for per-terminal key delivery.
//!
//! Sealing generates an ephemeral X25519 key, derives a one-time
//! XChaCha20-Poly1305 key with HKDF-SHA256 over the shared secret, and
//! encrypts. Only the holder of the recipient's static secret can open it.
//!
//! Wire format:
//!
//! ```text
//! [ ephemeral public (32) | nonce (24) | ciphertext + tag ]
//! ```

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use hkdf::Hkdf;
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::{
    error::CryptoError,
    keys::{DecryptKey, EncryptKey},
};

const ALGORITHM: &str = "X25519-XChaCha20Poly1305";

/// Domain separation label for the sealing key
const SEAL_INFO: &[u8] = b"courier-seal-v1";

const PUBLIC_SIZE: usize = 32;
const NONCE_SIZE: usize = 24;
const TAG_SIZE: usize = 16;

/// Public half: seals data for the owner of the matching [`X25519OpenKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct X25519SealKey(PublicKey);

impl X25519SealKey {
    /// Wrap raw public key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(PublicKey::from(bytes))
    }

    /// Raw public key bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl EncryptKey for X25519SealKey {
    fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(&self.0);
        if !shared.was_contributory() {
            return Err(CryptoError::EncryptionFailed("non-contributory public key".to_string()));
        }

        let key = derive_seal_key(shared.as_bytes(), &ephemeral_public, &self.0)?;
        let cipher = XChaCha20Poly1305::new_from_slice(key.as_slice())
            .map_err(|_| CryptoError::EncryptionFailed("seal key length".to_string()))?;

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.try_fill_bytes(&mut nonce).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::EncryptionFailed(ALGORITHM.to_string()))?;

        let mut out = Vec::with_capacity(PUBLIC_SIZE + NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(ephemeral_public.as_bytes());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }
}

/// Private half: opens boxes sealed to its public key.
pub struct X25519OpenKey(StaticSecret);

impl X25519OpenKey {
    /// Generate a fresh secret from OS entropy.
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(OsRng))
    }

    /// Restore a secret from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Matching public key.
    pub fn seal_key(&self) -> X25519SealKey {
        X25519SealKey(PublicKey::from(&self.0))
    }
}

impl DecryptKey for X25519OpenKey {
    fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let min = PUBLIC_SIZE + NONCE_SIZE + TAG_SIZE;
        if ciphertext.len() < min {
            return Err(CryptoError::Truncated { len: ciphertext.len(), min });
        }
        let (ephemeral, rest) = ciphertext.split_at(PUBLIC_SIZE);
        let (nonce, body) = rest.split_at(NONCE_SIZE);

        let mut ephemeral_bytes = [0u8; PUBLIC_SIZE];
        ephemeral_bytes.copy_from_slice(ephemeral);
        let ephemeral_public = PublicKey::from(ephemeral_bytes);

        let shared = self.0.diffie_hellman(&ephemeral_public);
        let own_public = PublicKey::from(&self.0);
        let key = derive_seal_key(shared.as_bytes(), &ephemeral_public, &own_public)?;
        let cipher = XChaCha20Poly1305::new_from_slice(key.as_slice())
            .map_err(|_| CryptoError::DecryptionFailed("seal key length".to_string()))?;

        cipher
            .decrypt(XNonce::from_slice(nonce), body)
            .map_err(|_| CryptoError::DecryptionFailed("authentication failed".to_string()))
    }
}

/// HKDF-SHA256 over the shared secret, salted with both public keys so a
/// box cannot be replayed against another recipient.
fn derive_seal_key(
    shared: &[u8; 32],
    ephemeral: &PublicKey,
    recipient: &PublicKey,
) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let mut salt = [0u8; 2 * PUBLIC_SIZE];
    salt[..PUBLIC_SIZE].copy_from_slice(ephemeral.as_bytes());
    salt[PUBLIC_SIZE..].copy_from_slice(recipient.as_bytes());

    let hkdf = Hkdf::<Sha256>::new(Some(&salt), shared);
    let mut okm = Zeroizing::new([0u8; 32]);
    hkdf.expand(SEAL_INFO, okm.as_mut_slice())
        .map_err(|e| CryptoError::InvalidKey { algorithm: ALGORITHM, reason: e.to_string() })?;
    Ok(okm)
}
