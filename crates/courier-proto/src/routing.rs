//! Destination routing.
//!
//! Decides which conversation a message belongs to, and therefore which
//! cipher key slot `(sender, destination)` it uses. Sender and receiver
//! evaluate the same rule over the same envelope fields, so both select the
//! same slot.
//!
//! | group        | receiver        | destination | meaning                          |
//! |--------------|-----------------|-------------|----------------------------------|
//! | absent       | user            | receiver    | personal (or hidden group) msg   |
//! | absent       | group `G`       | `G`         | non-split group message          |
//! | broadcast    | any             | group       | broadcast, no encryption         |
//! | group        | broadcast user  | receiver    | unencrypted group message        |
//! | group `G`    | member          | `G`         | group message split for a member |
//!
//! A broadcast destination means the plain key is used.

use crate::id::Id;

/// Resolve the conversation a message is filed under.
pub fn destination(receiver: &Id, group: Option<&Id>) -> Id {
    let group = match group {
        None if receiver.is_group() => Some(receiver),
        other => other,
    };

    match group {
        None => receiver.clone(),
        Some(group) if group.is_broadcast() => group.clone(),
        Some(_) if receiver.is_broadcast() => receiver.clone(),
        Some(group) => group.clone(),
    }
}
