//! Packer configuration.

use courier_crypto::SymmetricAlgorithm;
use serde::{Deserialize, Serialize};

/// Deployment settings for a [`MessagePacker`](crate::MessagePacker).
///
/// Missing fields take their defaults, so a partial config file is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackerConfig {
    /// Cipher for newly generated conversation keys
    pub cipher: SymmetricAlgorithm,

    /// Omit the key from messages whose conversation key was already
    /// delivered. When false every message carries its key.
    pub reuse_keys: bool,

    /// Emit single-letter field names. Input is accepted in both forms
    /// regardless.
    pub shorten_keys: bool,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self { cipher: SymmetricAlgorithm::default(), reuse_keys: true, shorten_keys: true }
    }
}
