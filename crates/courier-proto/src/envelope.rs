//! Message envelope: the routing fields every message form shares.

use crate::{content::ContentType, id::Id, routing};

/// Sender, receiver and time of a message, plus the optional overt group
/// and content type relays may route on.
///
/// An envelope is fixed once the message is signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Author of the message
    pub sender: Id,
    /// User, group or broadcast identity the message is sent to
    pub receiver: Id,
    /// Send time (seconds)
    pub time: u64,
    /// Overt group, visible to relays
    pub group: Option<Id>,
    /// Content type copied out of the content for relays
    pub kind: Option<ContentType>,
}

impl Envelope {
    /// Envelope with no group and no content type.
    pub fn new(sender: Id, receiver: Id, time: u64) -> Self {
        Self { sender, receiver, time, group: None, kind: None }
    }

    /// Set the overt group.
    #[must_use]
    pub fn with_group(mut self, group: Id) -> Self {
        self.group = Some(group);
        self
    }

    /// Conversation this envelope belongs to.
    pub fn destination(&self) -> Id {
        routing::destination(&self.receiver, self.group.as_ref())
    }

    /// True if the message must stay unencrypted.
    pub fn is_broadcast(&self) -> bool {
        self.destination().is_broadcast()
    }
}
