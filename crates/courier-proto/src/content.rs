//! Application content.
//!
//! Content is application-defined: a few protocol fields (type, serial
//! number, time, group, command) plus arbitrary named fields. It only exists
//! in plaintext inside an [`InstantMessage`](crate::InstantMessage).
//!
//! Application fields may not use a protocol field name or its short alias:
//! shortening would overwrite them or turn them into protocol fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{ProtocolError, Result},
    id::Id,
    shortener::CONTENT_KEYS,
};

/// Numeric content type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentType(pub u8);

impl ContentType {
    /// Plain text
    pub const TEXT: Self = Self(0x01);
    /// File attachment
    pub const FILE: Self = Self(0x10);
    /// Image attachment
    pub const IMAGE: Self = Self(0x12);
    /// Voice message
    pub const AUDIO: Self = Self(0x14);
    /// Video attachment
    pub const VIDEO: Self = Self(0x16);
    /// Web page
    pub const PAGE: Self = Self(0x20);
    /// Quoted reply
    pub const QUOTE: Self = Self(0x37);
    /// Money transfer
    pub const MONEY: Self = Self(0x40);
    /// Command
    pub const COMMAND: Self = Self(0x88);
    /// Group history command (invite, expel, quit, reset, ...)
    pub const HISTORY: Self = Self(0x89);
    /// Forwarded message
    pub const FORWARD: Self = Self(0xFF);

    /// True for command contents, including group-membership commands.
    ///
    /// Commands about a group are always sent member by member and never
    /// expose the group id in the envelope.
    pub const fn is_command(self) -> bool {
        matches!(self, Self::COMMAND | Self::HISTORY)
    }
}

/// Message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Content type tag
    #[serde(rename = "type")]
    pub kind: ContentType,
    /// Serial number chosen by the sender
    pub sn: u64,
    /// Creation time (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    /// Group the content is addressed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Id>,
    /// Command name (command contents only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Application fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Content {
    /// Empty content of the given type.
    pub fn new(kind: ContentType, sn: u64) -> Self {
        Self { kind, sn, time: None, group: None, command: None, fields: Map::new() }
    }

    /// Text content.
    pub fn text(sn: u64, text: &str) -> Self {
        let mut content = Self::new(ContentType::TEXT, sn);
        content.fields.insert("text".to_string(), Value::from(text));
        content
    }

    /// Named command.
    pub fn command(sn: u64, name: &str) -> Self {
        Self { command: Some(name.to_string()), ..Self::new(ContentType::COMMAND, sn) }
    }

    /// Group membership (history) command, always addressed to `group`.
    pub fn group_command(sn: u64, name: &str, group: Id) -> Self {
        Self {
            command: Some(name.to_string()),
            group: Some(group),
            ..Self::new(ContentType::HISTORY, sn)
        }
    }

    /// Address the content to a group.
    #[must_use]
    pub fn with_group(mut self, group: Id) -> Self {
        self.group = Some(group);
        self
    }

    /// Set the creation time.
    #[must_use]
    pub fn with_time(mut self, time: u64) -> Self {
        self.time = Some(time);
        self
    }

    /// Set an application field.
    ///
    /// # Errors
    ///
    /// - `ReservedField` if `key` is a protocol field name or short alias
    pub fn with_field(mut self, key: &str, value: Value) -> Result<Self> {
        if is_reserved_field(key) {
            return Err(ProtocolError::ReservedField(key.to_string()));
        }
        self.fields.insert(key.to_string(), value);
        Ok(self)
    }

    /// Check that no application field collides with a protocol field.
    ///
    /// `fields` is public, so this runs again before the content is packed.
    pub fn validate(&self) -> Result<()> {
        match self.fields.keys().find(|key| is_reserved_field(key)) {
            Some(key) => Err(ProtocolError::ReservedField(key.clone())),
            None => Ok(()),
        }
    }

    /// The `text` field, if present.
    pub fn text_value(&self) -> Option<&str> {
        self.fields.get("text").and_then(Value::as_str)
    }

    /// True for command contents.
    pub fn is_command(&self) -> bool {
        self.kind.is_command()
    }
}

/// True if `name` is a content protocol field or one of their short aliases.
pub fn is_reserved_field(name: &str) -> bool {
    CONTENT_KEYS.contains(&name)
}
