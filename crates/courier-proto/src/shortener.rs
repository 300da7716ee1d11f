//! Field-name shortening.
//!
//! Long field names are replaced by single-letter keys before
//! serialization. Each table is a flat list of `[short, long, short, long,
//! ...]` pairs; content, symmetric key dictionaries and messages each have
//! their own table.
//!
//! # Invariants
//!
//! - `restore(shorten(x)) == x` for any object whose keys do not already
//!   use the short names
//! - Keys absent from the object, and keys absent from the table, are left
//!   untouched

use serde_json::{Map, Value};

/// Content fields
pub const CONTENT_KEYS: &[&str] = &["T", "type", "N", "sn", "W", "time", "G", "group", "C", "command"];

/// Symmetric key dictionary fields
pub const SYMMETRIC_KEY_KEYS: &[&str] = &["A", "algorithm", "D", "data", "I", "iv"];

/// Message fields
pub const MESSAGE_KEYS: &[&str] = &[
    "F", "sender", "R", "receiver", "W", "time", "T", "type", "G", "group", "K", "keys", "D", "data",
    "V", "signature", "M", "meta", "P", "visa",
];

/// Rename long keys to their short aliases in place.
pub fn shorten(object: &mut Map<String, Value>, keys: &[&str]) {
    for pair in keys.chunks_exact(2) {
        rename(object, pair[1], pair[0]);
    }
}

/// Rename short keys back to their long names in place.
pub fn restore(object: &mut Map<String, Value>, keys: &[&str]) {
    for pair in keys.chunks_exact(2) {
        rename(object, pair[0], pair[1]);
    }
}

fn rename(object: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = object.remove(from) {
        object.insert(to.to_string(), value);
    }
}

/// Wire-level key compression, selected per deployment.
///
/// `compress_*` runs just before an object is serialized, `extract_*`
/// just after one is parsed. Extraction must accept both short and long
/// field names.
pub trait Compressor: Send + Sync {
    /// Compress content fields.
    fn compress_content(&self, content: &mut Map<String, Value>);

    /// Restore content fields.
    fn extract_content(&self, content: &mut Map<String, Value>);

    /// Compress a symmetric key dictionary.
    fn compress_symmetric_key(&self, key: &mut Map<String, Value>);

    /// Restore a symmetric key dictionary.
    fn extract_symmetric_key(&self, key: &mut Map<String, Value>);

    /// Compress top-level message fields.
    fn compress_message(&self, message: &mut Map<String, Value>);

    /// Restore top-level message fields.
    fn extract_message(&self, message: &mut Map<String, Value>);
}

/// Emits single-letter keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortKeys;

impl Compressor for ShortKeys {
    fn compress_content(&self, content: &mut Map<String, Value>) {
        shorten(content, CONTENT_KEYS);
    }

    fn extract_content(&self, content: &mut Map<String, Value>) {
        restore(content, CONTENT_KEYS);
    }

    fn compress_symmetric_key(&self, key: &mut Map<String, Value>) {
        shorten(key, SYMMETRIC_KEY_KEYS);
    }

    fn extract_symmetric_key(&self, key: &mut Map<String, Value>) {
        restore(key, SYMMETRIC_KEY_KEYS);
    }

    fn compress_message(&self, message: &mut Map<String, Value>) {
        shorten(message, MESSAGE_KEYS);
    }

    fn extract_message(&self, message: &mut Map<String, Value>) {
        restore(message, MESSAGE_KEYS);
    }
}

/// Emits long field names, still accepts short ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongKeys;

impl Compressor for LongKeys {
    fn compress_content(&self, _content: &mut Map<String, Value>) {}

    fn extract_content(&self, content: &mut Map<String, Value>) {
        restore(content, CONTENT_KEYS);
    }

    fn compress_symmetric_key(&self, _key: &mut Map<String, Value>) {}

    fn extract_symmetric_key(&self, key: &mut Map<String, Value>) {
        restore(key, SYMMETRIC_KEY_KEYS);
    }

    fn compress_message(&self, _message: &mut Map<String, Value>) {}

    fn extract_message(&self, message: &mut Map<String, Value>) {
        restore(message, MESSAGE_KEYS);
    }
}
