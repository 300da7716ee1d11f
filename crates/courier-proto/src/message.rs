//! Message forms and their wire representation.
//!
//! The three forms are distinct types so a message can only move forward
//! through the pipeline: instant (plaintext), secure (encrypted) and
//! reliable (signed). Only the reliable form is meant for the wire, but the
//! secure form can also be converted so relays can inspect it.
//!
//! # Wire Object
//!
//! Long field names, before compression:
//!
//! ```text
//! sender, receiver, time, group?, type?,
//! data                 base64 ciphertext (UTF-8 JSON text for broadcast)
//! keys?                { "name@address[/terminal]": base64 sealed key }
//! signature?           base64
//! meta?, visa?         opaque attachments
//! ```
//!
//! A legacy single `key` string (or a string under `keys`) is accepted on
//! input and filed as the wildcard entry of the envelope receiver.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    codec,
    content::{Content, ContentType},
    envelope::Envelope,
    error::{ProtocolError, Result},
    id::Id,
};

/// Sealed symmetric keys addressed `identity[/terminal]`, values base64.
pub type EncryptedKeys = BTreeMap<String, String>;

/// Envelope plus plaintext content. Never serialized in this form.
#[derive(Debug, Clone, PartialEq)]
pub struct InstantMessage {
    /// Routing fields
    pub envelope: Envelope,
    /// Plaintext content
    pub content: Content,
}

impl InstantMessage {
    /// Pair an envelope with content.
    pub fn new(envelope: Envelope, content: Content) -> Self {
        Self { envelope, content }
    }
}

/// Envelope plus ciphertext and the sealed message key.
#[derive(Debug, Clone, PartialEq)]
pub struct SecureMessage {
    /// Routing fields
    pub envelope: Envelope,
    /// Encrypted content (serialized content itself for broadcast)
    pub data: Vec<u8>,
    /// Sealed keys; absent when the key is reused or the message is broadcast
    pub keys: Option<EncryptedKeys>,
    /// Sender meta attachment
    pub meta: Option<Value>,
    /// Sender visa attachment
    pub visa: Option<Value>,
}

impl SecureMessage {
    /// Secure message without keys or attachments.
    pub fn new(envelope: Envelope, data: Vec<u8>) -> Self {
        Self { envelope, data, keys: None, meta: None, visa: None }
    }

    /// Convert to the long-key wire object.
    pub fn to_wire(&self) -> Result<Map<String, Value>> {
        to_object(&WireMessage::from_secure(self, None)?)
    }

    /// Parse a long-key wire object. A `signature` field is ignored.
    pub fn from_wire(object: Map<String, Value>) -> Result<Self> {
        let wire: WireMessage = serde_json::from_value(Value::Object(object))?;
        wire.into_secure().map(|(secure, _)| secure)
    }
}

/// Signed secure message; the only form placed on the wire.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct ReliableMessage {
    secure: SecureMessage,
    signature: Vec<u8>,
}

impl ReliableMessage {
    /// Attach a signature over `secure.data`.
    pub fn new(secure: SecureMessage, signature: Vec<u8>) -> Self {
        Self { secure, signature }
    }

    /// Routing fields.
    pub fn envelope(&self) -> &Envelope {
        &self.secure.envelope
    }

    /// Signed content.
    pub fn secure(&self) -> &SecureMessage {
        &self.secure
    }

    /// Signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Split into the secure message and the signature.
    pub fn into_parts(self) -> (SecureMessage, Vec<u8>) {
        (self.secure, self.signature)
    }

    /// Convert to the long-key wire object.
    pub fn to_wire(&self) -> Result<Map<String, Value>> {
        to_object(&WireMessage::from_secure(&self.secure, Some(&self.signature))?)
    }

    /// Parse a long-key wire object.
    ///
    /// # Errors
    ///
    /// - `MissingField("signature")` if the object is unsigned
    pub fn from_wire(object: Map<String, Value>) -> Result<Self> {
        let wire: WireMessage = serde_json::from_value(Value::Object(object))?;
        match wire.into_secure()? {
            (secure, Some(signature)) => Ok(Self { secure, signature }),
            (_, None) => Err(ProtocolError::MissingField("signature")),
        }
    }
}

/// Long-key wire layout.
#[derive(Serialize, Deserialize)]
struct WireMessage {
    sender: Id,
    receiver: Id,
    time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<Id>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<ContentType>,
    data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    keys: Option<KeysField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    visa: Option<Value>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum KeysField {
    Bundle(EncryptedKeys),
    Single(String),
}

impl WireMessage {
    fn from_secure(secure: &SecureMessage, signature: Option<&[u8]>) -> Result<Self> {
        let envelope = &secure.envelope;
        let data = if envelope.is_broadcast() {
            std::str::from_utf8(&secure.data)?.to_string()
        } else {
            codec::base64_encode(&secure.data)
        };

        Ok(Self {
            sender: envelope.sender.clone(),
            receiver: envelope.receiver.clone(),
            time: envelope.time,
            group: envelope.group.clone(),
            kind: envelope.kind,
            data,
            keys: secure.keys.clone().map(KeysField::Bundle),
            key: None,
            signature: signature.map(codec::base64_encode),
            meta: secure.meta.clone(),
            visa: secure.visa.clone(),
        })
    }

    fn into_secure(self) -> Result<(SecureMessage, Option<Vec<u8>>)> {
        let envelope = Envelope {
            sender: self.sender,
            receiver: self.receiver,
            time: self.time,
            group: self.group,
            kind: self.kind,
        };

        let data = if envelope.is_broadcast() {
            self.data.into_bytes()
        } else {
            codec::base64_decode(&self.data)?
        };

        let wildcard = |sealed: String| {
            EncryptedKeys::from([(envelope.receiver.without_terminal().to_string(), sealed)])
        };
        let keys = match (self.keys, self.key) {
            (Some(KeysField::Bundle(keys)), _) => Some(keys),
            (Some(KeysField::Single(sealed)), _) | (None, Some(sealed)) => Some(wildcard(sealed)),
            (None, None) => None,
        };

        let signature = self.signature.map(|s| codec::base64_decode(&s)).transpose()?;

        let secure = SecureMessage { envelope, data, keys, meta: self.meta, visa: self.visa };
        Ok((secure, signature))
    }
}

fn to_object(wire: &WireMessage) -> Result<Map<String, Value>> {
    match serde_json::to_value(wire)? {
        Value::Object(object) => Ok(object),
        _ => Err(ProtocolError::NotAnObject),
    }
}
