//! Dead-letter queue boundary.
//!
//! The core only requires that [`Dlq::insert`] succeed synchronously
//! *before* the offending message is acked. [`Dlq::insert`] therefore
//! borrows the message rather than consuming it, so the dispatch engine
//! can insert first and still have the message available to hand to
//! `Adapter::ack` afterwards without requiring every [`Message`]
//! implementation to be `Clone`.
//!
//! A [`DlqEntry`] — id, raw bytes, reason — rather than the full `Message`
//! object is what gets stored; this carries exactly the information a
//! DLQ needs to index on (`message_id`) and record (`reason`), without
//! resurrecting a live `M` instance a backend has no way to reconstruct
//! anyway (a SQLite- or file-backed DLQ only ever had the bytes to begin
//! with).

use crate::message::{Message, MessageId};
use crate::SwitchyardError;

/// A DLQ record: everything a dead-letter entry needs to carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlqEntry {
    pub message_id: MessageId,
    pub raw_data: Vec<u8>,
    pub reason: String,
}

impl DlqEntry {
    pub(crate) fn from_message<M: Message>(message: &M, reason: String) -> Self {
        Self {
            message_id: message.message_id(),
            raw_data: message.raw_data().to_vec(),
            reason,
        }
    }
}

/// A keyed container of `(message, reason)` pairs, indexed by
/// [`MessageId`].
pub trait Dlq<M: Message>: Send {
    /// Inserts (overwriting any existing entry for the same id).
    fn insert(&mut self, message: &M, reason: String) -> Result<(), SwitchyardError>;

    /// Removes and returns the entry for `id`, if any.
    fn remove(&mut self, id: &MessageId) -> Option<DlqEntry>;

    /// Number of entries currently stored.
    fn len(&self) -> usize;

    /// True when no entries are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All currently-stored keys, in unspecified order.
    fn keys(&self) -> Vec<MessageId>;

    /// Borrows the entry for `id`, if present.
    fn get(&self, id: &MessageId) -> Option<&DlqEntry>;
}

/// The simplest DLQ backend: an ordinary in-process keyed container.
/// Discards its contents when dropped; useful for tests and for embedding
/// binaries that only need DLQ semantics within a single process
/// lifetime.
#[derive(Default)]
pub struct InMemoryDlq {
    entries: std::collections::HashMap<MessageId, DlqEntry>,
}

impl InMemoryDlq {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored entries, in insertion-unspecified order.
    pub fn values(&self) -> impl Iterator<Item = &DlqEntry> {
        self.entries.values()
    }
}

impl<M: Message> Dlq<M> for InMemoryDlq {
    fn insert(&mut self, message: &M, reason: String) -> Result<(), SwitchyardError> {
        let entry = DlqEntry::from_message(message, reason);
        self.entries.insert(entry.message_id, entry);
        Ok(())
    }

    fn remove(&mut self, id: &MessageId) -> Option<DlqEntry> {
        self.entries.remove(id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn keys(&self) -> Vec<MessageId> {
        self.entries.keys().copied().collect()
    }

    fn get(&self, id: &MessageId) -> Option<&DlqEntry> {
        self.entries.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::RawMessage;

    #[test]
    fn insert_then_delete_round_trips_to_empty() {
        let mut dlq = InMemoryDlq::new();
        let message = RawMessage::new(b"x".to_vec());
        let id = message.message_id();
        Dlq::<RawMessage>::insert(&mut dlq, &message, "no matching handlers".into()).unwrap();
        assert_eq!(Dlq::<RawMessage>::len(&dlq), 1);
        Dlq::<RawMessage>::remove(&mut dlq, &id);
        assert_eq!(Dlq::<RawMessage>::len(&dlq), 0);
    }
}
