//! Message packer: the encrypt/sign and verify/decrypt pipeline.
//!
//! ```text
//! InstantMessage ──encrypt──► SecureMessage ──sign──► ReliableMessage ──serialize──► bytes
//! InstantMessage ◄─decrypt─── SecureMessage ◄─verify─ ReliableMessage ◄─deserialize─ bytes
//! ```
//!
//! # Encryption
//!
//! 1. Decide whether the content's group is overt (visible in the envelope)
//! 2. Route `(receiver, overt group)` to a destination and lease its key
//! 3. Serialize and encrypt the content (plain key for broadcast)
//! 4. Seal the key once per terminal of every recipient, unless the
//!    receiver already has it. The cache marks the key delivered only once
//!    sealing succeeds, and [`MessagePacker::sign`] withdraws the mark if
//!    signing fails, so a failed send never leaves the next attempt keyless.
//!
//! # Decryption
//!
//! 1. Resolve the key: plain for broadcast, from the `keys` entries
//!    addressed to the local identity, or from the cache when the sender
//!    reused it
//! 2. Decrypt and parse the content
//! 3. Cache the key so later messages in the conversation can omit it
//!
//! Nothing here retries. Callers use [`PackerError::needs_resend`] and
//! [`PackerError::should_suspend`] to decide what to do with a failure.

use courier_crypto::SymmetricKey;
use courier_proto::{
    Compressor, Content, EncryptedKeys, Envelope, Id, InstantMessage, LongKeys, ProtocolError,
    ReliableMessage, SecureMessage, ShortKeys, codec,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    bundle::{self, EncryptedBundle},
    cache::{KeyCache, MemoryKeyCache},
    config::PackerConfig,
    directory::Directory,
    error::PackerError,
    visa::{DefaultVisaAgent, VisaAgent},
};

/// Group id to expose in the envelope, if any.
///
/// Broadcast groups are always overt so receivers know not to decrypt.
/// Commands about an ordinary group are sent member by member and keep the
/// group hidden from relays.
pub fn overt_group(content: &Content, envelope: &Envelope) -> Option<Id> {
    let group = content.group.as_ref().or(envelope.group.as_ref())?;
    if group.is_broadcast() || !content.is_command() {
        Some(group.clone())
    } else {
        None
    }
}

/// Packs and unpacks messages for one local deployment.
pub struct MessagePacker<D, C = MemoryKeyCache> {
    directory: D,
    cache: C,
    visa_agent: Box<dyn VisaAgent>,
    compressor: Box<dyn Compressor>,
    config: PackerConfig,
}

impl<D: Directory> MessagePacker<D> {
    /// Packer with an in-memory key cache.
    pub fn new(directory: D, config: PackerConfig) -> Self {
        Self::with_cache(directory, MemoryKeyCache::new(config.cipher), config)
    }
}

impl<D: Directory, C: KeyCache> MessagePacker<D, C> {
    /// Packer with a caller-supplied key cache.
    pub fn with_cache(directory: D, cache: C, config: PackerConfig) -> Self {
        let compressor: Box<dyn Compressor> =
            if config.shorten_keys { Box::new(ShortKeys) } else { Box::new(LongKeys) };
        Self { directory, cache, visa_agent: Box::new(DefaultVisaAgent), compressor, config }
    }

    /// Replace the visa agent.
    #[must_use]
    pub fn with_visa_agent(mut self, visa_agent: impl VisaAgent + 'static) -> Self {
        self.visa_agent = Box::new(visa_agent);
        self
    }

    /// Replace the wire compressor.
    #[must_use]
    pub fn with_compressor(mut self, compressor: impl Compressor + 'static) -> Self {
        self.compressor = Box::new(compressor);
        self
    }

    /// Identity directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Conversation key cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Active configuration.
    pub fn config(&self) -> &PackerConfig {
        &self.config
    }

    /// Encrypt an instant message.
    ///
    /// The returned envelope carries the overt group (if any) and the
    /// content type.
    ///
    /// # Errors
    ///
    /// - `KeyUnavailable` if the cache cannot produce a key
    /// - `MissingPublicKeys` if a personal receiver has no meta key yet
    /// - `NoEncryptionKey` if no recipient has a usable encryption key
    /// - `Protocol` if an application field collides with a protocol field
    pub fn encrypt(&self, message: &InstantMessage) -> Result<SecureMessage, PackerError> {
        let content = &message.content;
        content.validate()?;
        let mut envelope = message.envelope.clone();
        envelope.group = overt_group(content, &envelope);
        envelope.kind = Some(content.kind);

        let sender = &envelope.sender;
        let destination = envelope.destination();
        let broadcast = destination.is_broadcast();

        let lease = self
            .cache
            .get_key(sender, &destination, true)?
            .ok_or_else(|| PackerError::KeyUnavailable { destination: destination.clone() })?;
        let key = if broadcast { SymmetricKey::plain() } else { lease.key };

        let mut body = to_object(content)?;
        self.compressor.compress_content(&mut body);
        let data = key.encrypt(&codec::encode_object(body)?)?;

        // Split copies share the group slot, so each member needs the key.
        let split = envelope.group.is_some() && !envelope.receiver.is_group();
        let send_key = !broadcast && (!lease.delivered || !self.config.reuse_keys || split);

        let keys = if send_key {
            let keys = self.seal_key(&key, &envelope.receiver)?;
            self.cache.set_delivered(sender, &destination, true);
            Some(keys)
        } else {
            None
        };

        tracing::debug!(
            %sender,
            %destination,
            broadcast,
            reused = !send_key,
            sealed = keys.as_ref().map_or(0, EncryptedKeys::len),
            "encrypted message"
        );

        Ok(SecureMessage { envelope, data, keys, meta: None, visa: None })
    }

    /// Sign the ciphertext with the sender's signing key.
    ///
    /// # Errors
    ///
    /// - `NoSigningKey` if the directory has no signing key for the sender
    ///
    /// On failure a key sealed into `message` no longer counts as delivered.
    pub fn sign(&self, message: SecureMessage) -> Result<ReliableMessage, PackerError> {
        match self.signature(&message) {
            Ok(signature) => Ok(ReliableMessage::new(message, signature)),
            Err(err) => {
                if message.keys.is_some() {
                    let sender = &message.envelope.sender;
                    let destination = message.envelope.destination();
                    tracing::debug!(%sender, %destination, "signing failed, key not delivered");
                    self.cache.set_delivered(sender, &destination, false);
                }
                Err(err)
            },
        }
    }

    fn signature(&self, message: &SecureMessage) -> Result<Vec<u8>, PackerError> {
        let sender = &message.envelope.sender;
        let signing_key = self
            .directory
            .signing_key(sender)
            .ok_or_else(|| PackerError::NoSigningKey { sender: sender.clone() })?;

        Ok(signing_key.sign(&message.data)?)
    }

    /// Check the signature against the sender's verify keys and strip it.
    ///
    /// # Errors
    ///
    /// - `MissingPublicKeys` if the sender's meta key is not known yet
    /// - `NoVerifyKeyMatch` if no verify key accepts the signature
    pub fn verify(&self, message: ReliableMessage) -> Result<SecureMessage, PackerError> {
        let sender = message.envelope().sender.clone();
        let meta = self
            .directory
            .public_keys(&sender)
            .ok_or_else(|| PackerError::MissingPublicKeys { identity: sender.clone() })?;
        let documents = self.directory.documents(&sender);

        let verified = self
            .visa_agent
            .verify_keys(&meta, &documents)
            .iter()
            .any(|key| key.verify(&message.secure().data, message.signature()));

        if !verified {
            tracing::warn!(%sender, "signature verification failed");
            return Err(PackerError::NoVerifyKeyMatch { sender });
        }
        Ok(message.into_parts().0)
    }

    /// Decrypt a verified message as the local identity `receiver`.
    ///
    /// `receiver` is the local user the message was delivered to. For a group
    /// message it is the member, not the group. A terminal on `receiver`
    /// selects which bundle entry to open.
    ///
    /// # Errors
    ///
    /// - `ReceiverMismatch` if a personal message names another user
    /// - `MalformedBundle` if `keys` has no entry for `receiver`
    /// - `DecryptionFailed` if the bundle or the body does not decrypt
    /// - `KeyCacheMiss` if the key was reused and is not cached here
    pub fn decrypt(
        &self,
        message: &SecureMessage,
        receiver: &Id,
    ) -> Result<InstantMessage, PackerError> {
        let envelope = &message.envelope;
        if envelope.receiver.is_user()
            && !envelope.receiver.is_broadcast()
            && !envelope.receiver.same_party(receiver)
        {
            return Err(PackerError::ReceiverMismatch {
                expected: envelope.receiver.clone(),
                actual: receiver.clone(),
            });
        }

        let sender = &envelope.sender;
        let destination = envelope.destination();

        let key = if destination.is_broadcast() {
            SymmetricKey::plain()
        } else if let Some(keys) = &message.keys {
            self.open_key(keys, receiver)?
        } else {
            self.cache
                .get_key(sender, &destination, false)?
                .map(|lease| lease.key)
                .ok_or_else(|| PackerError::KeyCacheMiss {
                    sender: sender.clone(),
                    destination: destination.clone(),
                })?
        };

        let plaintext = key.decrypt(&message.data).map_err(|err| PackerError::DecryptionFailed {
            reason: "message body".to_string(),
            source: Some(err),
        })?;
        let mut body = codec::decode_object(&plaintext)?.ok_or(ProtocolError::Empty)?;
        self.compressor.extract_content(&mut body);
        let content: Content = serde_json::from_value(Value::Object(body))?;

        self.cache.put_key(sender, &destination, key);

        Ok(InstantMessage::new(envelope.clone(), content))
    }

    /// Encode a reliable message for the wire.
    pub fn serialize(&self, message: &ReliableMessage) -> Result<Vec<u8>, PackerError> {
        let mut object = message.to_wire()?;
        self.compressor.compress_message(&mut object);
        Ok(codec::encode_object(object)?)
    }

    /// Decode a reliable message from the wire. Short and long field names
    /// are both accepted.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<ReliableMessage, PackerError> {
        let mut object = codec::decode_object(bytes)?.ok_or(ProtocolError::Empty)?;
        self.compressor.extract_message(&mut object);
        Ok(ReliableMessage::from_wire(object)?)
    }

    /// Seal `key` for every recipient behind `receiver`.
    fn seal_key(&self, key: &SymmetricKey, receiver: &Id) -> Result<EncryptedKeys, PackerError> {
        let mut dict = to_object(key)?;
        self.compressor.compress_symmetric_key(&mut dict);
        let serialized = codec::encode_object(dict)?;

        let recipients =
            if receiver.is_group() { self.directory.members(receiver) } else { vec![receiver.clone()] };

        let mut keys = EncryptedKeys::new();
        let mut missing_meta = None;
        for recipient in &recipients {
            let Some(meta) = self.directory.public_keys(recipient) else {
                tracing::warn!(%recipient, "no meta key, skipping recipient");
                missing_meta.get_or_insert_with(|| recipient.clone());
                continue;
            };
            let documents = self.directory.documents(recipient);

            let mut sealed = EncryptedBundle::new();
            for (terminal, encrypt_key) in self.visa_agent.encryption_keys(&meta, &documents) {
                sealed.insert(&terminal, encrypt_key.encrypt(&serialized)?);
            }
            if sealed.is_empty() {
                tracing::warn!(%recipient, "no encryption key, skipping recipient");
                continue;
            }
            keys.extend(bundle::encode(recipient, &sealed));
        }

        if keys.is_empty() {
            return Err(match missing_meta {
                Some(identity) if recipients.len() == 1 => PackerError::MissingPublicKeys { identity },
                _ => PackerError::NoEncryptionKey { receiver: receiver.clone() },
            });
        }
        Ok(keys)
    }

    /// Open the bundle entries addressed to `receiver`.
    fn open_key(&self, keys: &EncryptedKeys, receiver: &Id) -> Result<SymmetricKey, PackerError> {
        let terminals: Vec<String> = match receiver.terminal() {
            Some(terminal) => vec![terminal.to_string()],
            None => {
                self.directory.documents(receiver).into_iter().filter_map(|doc| doc.terminal).collect()
            },
        };
        let sealed = bundle::decode(keys, receiver, &terminals)?;

        let mut last_error = None;
        for (terminal, ciphertext) in sealed.iter() {
            for decrypt_key in self.directory.private_keys(receiver, terminal) {
                match decrypt_key.decrypt(ciphertext) {
                    Ok(plaintext) if !plaintext.is_empty() => return self.parse_key(&plaintext),
                    Ok(_) => {},
                    Err(err) => {
                        tracing::debug!(
                            %receiver,
                            terminal,
                            algorithm = decrypt_key.algorithm(),
                            error = %err,
                            "private key did not open bundle"
                        );
                        last_error = Some(err);
                    },
                }
            }
        }

        Err(PackerError::DecryptionFailed {
            reason: format!("no private key of {receiver} opens the key bundle"),
            source: last_error,
        })
    }

    fn parse_key(&self, plaintext: &[u8]) -> Result<SymmetricKey, PackerError> {
        let mut dict = codec::decode_object(plaintext)?.ok_or(ProtocolError::Empty)?;
        self.compressor.extract_symmetric_key(&mut dict);
        Ok(serde_json::from_value(Value::Object(dict))?)
    }
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, PackerError> {
    match serde_json::to_value(value)? {
        Value::Object(object) => Ok(object),
        _ => Err(ProtocolError::NotAnObject.into()),
    }
}
