//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors from parsing identities or converting messages at the wire
/// boundary.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Identifier text is malformed
    #[error("invalid identifier {input:?}: {reason}")]
    InvalidId {
        /// The rejected text
        input: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 field could not be decoded
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Bytes are not valid UTF-8
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Input bytes were empty where a value was required
    #[error("empty input")]
    Empty,

    /// Decoded JSON was not an object
    #[error("expected a JSON object")]
    NotAnObject,

    /// Required wire field is absent
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Application field uses a protocol field name or its short alias
    #[error("reserved content field: {0}")]
    ReservedField(String),
}
