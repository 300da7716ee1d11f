//! Visa agent: picks which public keys to use for an identity.

use std::sync::Arc;

use courier_crypto::{EncryptKey, VerifyKey};

use crate::directory::{ANY_TERMINAL, Document, MetaKey};

/// Selects encryption and verification keys from an identity's meta key and
/// visa documents.
pub trait VisaAgent: Send + Sync {
    /// Ordered `(terminal, key)` pairs; the symmetric key is sealed once per
    /// pair. Empty if the identity has no usable encryption key.
    fn encryption_keys(
        &self,
        meta: &MetaKey,
        documents: &[Document],
    ) -> Vec<(String, Arc<dyn EncryptKey>)>;

    /// Ordered verify keys; verification succeeds on the first match.
    fn verify_keys(&self, meta: &MetaKey, documents: &[Document]) -> Vec<Arc<dyn VerifyKey>>;
}

/// Standard key selection.
///
/// Encryption: one entry per document, keyed by its terminal (`*` if it has
/// none), using the document's own key or the meta key when it has none. If
/// no document carries its own key, a single `*` entry with the meta key.
///
/// Verification: document keys in document order, then the meta key last.
/// Document keys rotate and the meta key cannot, so the meta key is only the
/// fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultVisaAgent;

impl VisaAgent for DefaultVisaAgent {
    fn encryption_keys(
        &self,
        meta: &MetaKey,
        documents: &[Document],
    ) -> Vec<(String, Arc<dyn EncryptKey>)> {
        let has_document_key = documents.iter().any(|doc| doc.encrypt_key.is_some());
        if !has_document_key {
            return meta
                .encrypt_key
                .iter()
                .map(|key| (ANY_TERMINAL.to_string(), Arc::clone(key)))
                .collect();
        }

        documents
            .iter()
            .filter_map(|doc| {
                let key = doc.encrypt_key.as_ref().or(meta.encrypt_key.as_ref())?;
                let terminal = doc.terminal.as_deref().unwrap_or(ANY_TERMINAL);
                Some((terminal.to_string(), Arc::clone(key)))
            })
            .collect()
    }

    fn verify_keys(&self, meta: &MetaKey, documents: &[Document]) -> Vec<Arc<dyn VerifyKey>> {
        documents
            .iter()
            .filter_map(|doc| doc.verify_key.clone())
            .chain(std::iter::once(Arc::clone(&meta.verify_key)))
            .collect()
    }
}
