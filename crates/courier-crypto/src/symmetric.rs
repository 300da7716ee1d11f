//! Symmetric message keys.
//!
//! A [`SymmetricKey`] encrypts message bodies and may be reused across a
//! whole conversation. Both AEAD suites draw a random nonce per encryption
//! and prefix it to the ciphertext:
//!
//! ```text
//! [ nonce (12 or 24 bytes) | ciphertext + 16-byte tag ]
//! ```
//!
//! The plain key ([`SymmetricKey::plain`]) is the identity transform used for
//! broadcast messages.
//!
//! # Key Dictionary
//!
//! Keys travel (sealed) as a JSON dictionary:
//!
//! ```text
//! { "algorithm": "AES", "data": "<base64 key>", "iv": "<base64>"? }
//! ```

use aes_gcm::{Aes256Gcm, Nonce};
use base64::{Engine, engine::general_purpose::STANDARD};
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Size of both AEAD keys (32 bytes)
pub const KEY_SIZE: usize = 32;

/// AES-GCM nonce size (12 bytes)
const AES_NONCE_SIZE: usize = 12;

/// `XChaCha20` nonce size (24 bytes)
const XCHACHA_NONCE_SIZE: usize = 24;

/// Poly1305 / GHASH tag size (16 bytes)
const TAG_SIZE: usize = 16;

/// Symmetric cipher selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SymmetricAlgorithm {
    /// AES-256-GCM
    #[default]
    #[serde(rename = "AES")]
    Aes256Gcm,
    /// XChaCha20-Poly1305
    #[serde(rename = "XCHACHA20")]
    XChaCha20Poly1305,
    /// No encryption (broadcast only)
    #[serde(rename = "PLAIN")]
    Plain,
}

impl SymmetricAlgorithm {
    /// Wire name of the algorithm.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aes256Gcm => "AES",
            Self::XChaCha20Poly1305 => "XCHACHA20",
            Self::Plain => "PLAIN",
        }
    }

    /// Parse a wire name.
    pub fn from_name(name: &str) -> Result<Self, CryptoError> {
        match name {
            "AES" => Ok(Self::Aes256Gcm),
            "XCHACHA20" => Ok(Self::XChaCha20Poly1305),
            "PLAIN" => Ok(Self::Plain),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    const fn key_len(self) -> usize {
        match self {
            Self::Aes256Gcm | Self::XChaCha20Poly1305 => KEY_SIZE,
            Self::Plain => 0,
        }
    }
}

/// Conversation key for message bodies.
///
/// # Invariants
///
/// - `data` length matches the algorithm (32 bytes for AEAD suites, empty for
///   plain)
/// - Key bytes are zeroized on drop
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KeyDict", into = "KeyDict")]
pub struct SymmetricKey {
    algorithm: SymmetricAlgorithm,
    data: Zeroizing<Vec<u8>>,
    iv: Option<Vec<u8>>,
}

impl SymmetricKey {
    /// Generate a fresh random key.
    pub fn generate(algorithm: SymmetricAlgorithm) -> Result<Self, CryptoError> {
        let mut data = Zeroizing::new(vec![0u8; algorithm.key_len()]);
        OsRng
            .try_fill_bytes(&mut data)
            .map_err(|e| CryptoError::InvalidKey { algorithm: algorithm.name(), reason: e.to_string() })?;
        Ok(Self { algorithm, data, iv: None })
    }

    /// The identity key used for broadcast messages.
    pub fn plain() -> Self {
        Self { algorithm: SymmetricAlgorithm::Plain, data: Zeroizing::new(Vec::new()), iv: None }
    }

    /// Build a key from raw parts.
    pub fn from_parts(
        algorithm: SymmetricAlgorithm,
        data: Vec<u8>,
        iv: Option<Vec<u8>>,
    ) -> Result<Self, CryptoError> {
        let data = Zeroizing::new(data);
        if data.len() != algorithm.key_len() {
            return Err(CryptoError::InvalidKey {
                algorithm: algorithm.name(),
                reason: format!("expected {} key bytes, got {}", algorithm.key_len(), data.len()),
            });
        }
        Ok(Self { algorithm, data, iv })
    }

    /// Cipher of this key.
    pub fn algorithm(&self) -> SymmetricAlgorithm {
        self.algorithm
    }

    /// True for the broadcast identity key.
    pub fn is_plain(&self) -> bool {
        self.algorithm == SymmetricAlgorithm::Plain
    }

    /// Initialization vector published with the key, if any.
    ///
    /// The AEAD suites draw a nonce per message and do not consume it; it is
    /// preserved so a key dictionary survives a round trip unchanged.
    pub fn iv(&self) -> Option<&[u8]> {
        self.iv.as_deref()
    }

    /// Encrypt a message body.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self.algorithm {
            SymmetricAlgorithm::Plain => Ok(plaintext.to_vec()),
            SymmetricAlgorithm::Aes256Gcm => {
                let cipher = Aes256Gcm::new_from_slice(&self.data).map_err(|_| self.bad_length())?;
                let nonce = random_nonce::<AES_NONCE_SIZE>()?;
                let ciphertext = cipher
                    .encrypt(Nonce::from_slice(&nonce), plaintext)
                    .map_err(|_| CryptoError::EncryptionFailed("AES-GCM".to_string()))?;
                Ok(prefix_nonce(&nonce, ciphertext))
            },
            SymmetricAlgorithm::XChaCha20Poly1305 => {
                let cipher =
                    XChaCha20Poly1305::new_from_slice(&self.data).map_err(|_| self.bad_length())?;
                let nonce = random_nonce::<XCHACHA_NONCE_SIZE>()?;
                let ciphertext = cipher
                    .encrypt(XNonce::from_slice(&nonce), plaintext)
                    .map_err(|_| CryptoError::EncryptionFailed("XChaCha20-Poly1305".to_string()))?;
                Ok(prefix_nonce(&nonce, ciphertext))
            },
        }
    }

    /// Decrypt a message body.
    ///
    /// # Errors
    ///
    /// - `Truncated`: input shorter than nonce plus tag
    /// - `DecryptionFailed`: wrong key or tampering
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self.algorithm {
            SymmetricAlgorithm::Plain => Ok(ciphertext.to_vec()),
            SymmetricAlgorithm::Aes256Gcm => {
                let (nonce, body) = split_nonce(ciphertext, AES_NONCE_SIZE)?;
                let cipher = Aes256Gcm::new_from_slice(&self.data).map_err(|_| self.bad_length())?;
                cipher
                    .decrypt(Nonce::from_slice(nonce), body)
                    .map_err(|_| CryptoError::DecryptionFailed("authentication failed".to_string()))
            },
            SymmetricAlgorithm::XChaCha20Poly1305 => {
                let (nonce, body) = split_nonce(ciphertext, XCHACHA_NONCE_SIZE)?;
                let cipher =
                    XChaCha20Poly1305::new_from_slice(&self.data).map_err(|_| self.bad_length())?;
                cipher
                    .decrypt(XNonce::from_slice(nonce), body)
                    .map_err(|_| CryptoError::DecryptionFailed("authentication failed".to_string()))
            },
        }
    }

    fn bad_length(&self) -> CryptoError {
        CryptoError::InvalidKey {
            algorithm: self.algorithm.name(),
            reason: format!("key is {} bytes", self.data.len()),
        }
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("algorithm", &self.algorithm)
            .field("data", &"<redacted>")
            .field("iv", &self.iv.as_ref().map(Vec::len))
            .finish()
    }
}

fn random_nonce<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut nonce = [0u8; N];
    OsRng.try_fill_bytes(&mut nonce).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    Ok(nonce)
}

fn prefix_nonce(nonce: &[u8], ciphertext: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(nonce.len() + ciphertext.len());
    out.extend_from_slice(nonce);
    out.extend_from_slice(&ciphertext);
    out
}

fn split_nonce(data: &[u8], nonce_len: usize) -> Result<(&[u8], &[u8]), CryptoError> {
    if data.len() < nonce_len + TAG_SIZE {
        return Err(CryptoError::Truncated { len: data.len(), min: nonce_len + TAG_SIZE });
    }
    Ok(data.split_at(nonce_len))
}

/// Serialized form of a [`SymmetricKey`].
#[derive(Serialize, Deserialize)]
struct KeyDict {
    algorithm: String,
    data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iv: Option<String>,
}

impl From<SymmetricKey> for KeyDict {
    fn from(key: SymmetricKey) -> Self {
        Self {
            algorithm: key.algorithm.name().to_string(),
            data: STANDARD.encode(key.data.as_slice()),
            iv: key.iv.as_deref().map(|iv| STANDARD.encode(iv)),
        }
    }
}

impl TryFrom<KeyDict> for SymmetricKey {
    type Error = CryptoError;

    fn try_from(dict: KeyDict) -> Result<Self, Self::Error> {
        let algorithm = SymmetricAlgorithm::from_name(&dict.algorithm)?;
        let data = STANDARD.decode(dict.data)?;
        let iv = dict.iv.map(|iv| STANDARD.decode(iv)).transpose()?;
        Self::from_parts(algorithm, data, iv)
    }
}
