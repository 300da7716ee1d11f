//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors produced by key operations.
///
/// Failures never carry key material. Callers that need to try several keys
/// (verification, bundle opening) treat any variant as "this key did not
/// work" and move on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key bytes have the wrong length or shape for the algorithm
    #[error("invalid key material for {algorithm}: {reason}")]
    InvalidKey {
        /// Algorithm the key was meant for
        algorithm: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Algorithm name not recognized
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Encryption failed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Ciphertext could not be authenticated
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Ciphertext is shorter than the nonce and tag it must carry
    #[error("ciphertext too short: {len} bytes, need at least {min}")]
    Truncated {
        /// Length received
        len: usize,
        /// Minimum length for the algorithm
        min: usize,
    },

    /// Signature bytes are malformed
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Key dictionary field could not be decoded
    #[error("key encoding error: {0}")]
    Encoding(String),
}

impl From<base64::DecodeError> for CryptoError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Encoding(err.to_string())
    }
}
