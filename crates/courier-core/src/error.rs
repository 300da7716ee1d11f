//! Error types for the message packer.
//!
//! Every failure is a typed outcome. A broadcast message that was correctly
//! left unencrypted is a success, never one of these.

use courier_crypto::CryptoError;
use courier_proto::{Id, ProtocolError};
use thiserror::Error;

/// Errors produced by the pack/unpack pipeline.
#[derive(Error, Debug)]
pub enum PackerError {
    /// No recipient of the message has a usable public key
    #[error("no encryption key for {receiver}")]
    NoEncryptionKey {
        /// Receiver of the message
        receiver: Id,
    },

    /// Sender has no signing key in the directory
    #[error("no signing key for {sender}")]
    NoSigningKey {
        /// Sender of the message
        sender: Id,
    },

    /// None of the sender's verify keys accepted the signature
    #[error("signature does not verify for {sender}")]
    NoVerifyKeyMatch {
        /// Claimed sender
        sender: Id,
    },

    /// Directory has no meta key for the identity yet
    #[error("public keys not found for {identity}")]
    MissingPublicKeys {
        /// Identity whose keys are missing
        identity: Id,
    },

    /// Message reused a key that this side never cached
    #[error("no cached key for {sender} -> {destination}")]
    KeyCacheMiss {
        /// Sender of the message
        sender: Id,
        /// Conversation the key is filed under
        destination: Id,
    },

    /// `keys` map holds no entry addressed to this receiver
    #[error("no key bundle entry for {receiver}")]
    MalformedBundle {
        /// Local identity
        receiver: Id,
    },

    /// Key bundle or message body did not decrypt
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// What failed
        reason: String,
        /// Last cipher error, if a key was actually tried
        #[source]
        source: Option<CryptoError>,
    },

    /// Cache could not produce a key for the conversation
    #[error("no key available for {destination}")]
    KeyUnavailable {
        /// Conversation the key is filed under
        destination: Id,
    },

    /// Message is addressed to a different user than the one decrypting
    #[error("message for {expected} cannot be decrypted as {actual}")]
    ReceiverMismatch {
        /// Receiver in the envelope
        expected: Id,
        /// Identity passed to decrypt
        actual: Id,
    },

    /// Wire or content encoding error
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Key operation error
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl PackerError {
    /// Returns true if the sender should be asked to resend the message with
    /// an explicit key.
    ///
    /// A cache miss means the key was delivered in an earlier message this
    /// side never processed. A decryption failure usually means the sender
    /// sealed the key with a stale visa key.
    pub fn needs_resend(&self) -> bool {
        matches!(self, Self::KeyCacheMiss { .. } | Self::DecryptionFailed { .. })
    }

    /// Returns true if the message should be held until the directory learns
    /// the missing public keys, then packed again.
    pub fn should_suspend(&self) -> bool {
        matches!(self, Self::MissingPublicKeys { .. } | Self::NoEncryptionKey { .. })
    }
}

impl From<serde_json::Error> for PackerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(ProtocolError::Json(err))
    }
}
