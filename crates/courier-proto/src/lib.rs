//! Courier Protocol Types
//!
//! Identities, message forms and the JSON wire codec. Nothing in this crate
//! performs cryptography; it only defines what the pipeline in
//! `courier-core` transforms and how those values cross the wire.
//!
//! # Message Forms
//!
//! ```text
//! InstantMessage  (envelope + plaintext content, memory only)
//!        │ encrypt
//!        ▼
//! SecureMessage   (envelope + ciphertext + sealed keys)
//!        │ sign
//!        ▼
//! ReliableMessage (secure message + signature, the only wire form)
//! ```
//!
//! # Wire Boundary
//!
//! Internal logic works on typed structs. Conversion to and from the flat
//! JSON object happens in one place ([`message`]), after which a
//! [`Compressor`] renames long field names to single-letter keys and
//! [`codec`] turns the object into UTF-8 bytes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod content;
pub mod envelope;
pub mod error;
pub mod id;
pub mod message;
pub mod routing;
pub mod shortener;

pub use content::{Content, ContentType};
pub use envelope::Envelope;
pub use error::{ProtocolError, Result};
pub use id::{Address, EntityType, Id};
pub use message::{EncryptedKeys, InstantMessage, ReliableMessage, SecureMessage};
pub use routing::destination;
pub use shortener::{Compressor, LongKeys, ShortKeys};
