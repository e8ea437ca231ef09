//! Message types.
//!
//! `Message` is the opaque payload carrier threaded through matchers,
//! hooks, and handlers. `MessageId` is generated once at construction and
//! never recomputed; two messages built from identical bytes are distinct
//! because they carry distinct ids — equality is by id, not by bytes.

use std::fmt;
use std::sync::OnceLock;

use uuid::Uuid;

use crate::error::SwitchyardError;

/// 16-byte universally unique identifier assigned to a [`Message`] at
/// construction time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(Uuid);

impl MessageId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The raw 16 bytes backing this id.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Reconstructs an id from the 16 bytes returned by [`Self::as_bytes`].
    /// Used by persistent DLQ backends to restore the identity of a
    /// message read back from storage.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Lowercase hex-with-hyphens rendering, used in log fields and DLQ keys.
    pub fn to_hex(&self) -> String {
        self.0.hyphenated().to_string()
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.to_hex())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Common surface shared by every message variant.
///
/// Implementations are not expected to be cheap to clone; the dispatch
/// engine always works with owned messages or `&M` borrows, never
/// `Arc<M>` fan-out — each context is driven by exactly one thread.
pub trait Message: fmt::Debug + Send + Sync + 'static {
    /// Stable per-instance identifier, set once at construction.
    fn message_id(&self) -> MessageId;

    /// The immutable byte sequence the message was constructed from.
    fn raw_data(&self) -> &[u8];
}

/// Constructs a message variant from raw transport bytes. Adapters are
/// generic over this trait so that the same adapter code can deliver
/// `RawMessage`s or `JsonMessage`s depending on what the embedding binary
/// configures.
pub trait FromRawData: Message + Sized {
    fn from_raw_data(data: Vec<u8>) -> Self;
}

/// A message with no decoding performed on its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    id: MessageId,
    data: Vec<u8>,
}

impl RawMessage {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: MessageId::new(),
            data: data.into(),
        }
    }
}

impl Message for RawMessage {
    fn message_id(&self) -> MessageId {
        self.id
    }

    fn raw_data(&self) -> &[u8] {
        &self.data
    }
}

impl FromRawData for RawMessage {
    fn from_raw_data(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

/// A message whose bytes are UTF-8 JSON text, decoded on first access and
/// memoised thereafter.
pub struct JsonMessage {
    id: MessageId,
    data: Vec<u8>,
    decoded: OnceLock<Result<serde_json::Value, String>>,
}

impl JsonMessage {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: MessageId::new(),
            data: data.into(),
            decoded: OnceLock::new(),
        }
    }

    /// Decodes (or returns the memoised decode of) the message bytes as JSON.
    pub fn get_json(&self) -> Result<&serde_json::Value, SwitchyardError> {
        let result = self.decoded.get_or_init(|| {
            serde_json::from_slice(&self.data).map_err(|e| e.to_string())
        });
        result.as_ref().map_err(|reason| SwitchyardError::Handler {
            message_id: self.id,
            reason: format!("invalid JSON body: {reason}"),
        })
    }
}

impl fmt::Debug for JsonMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonMessage")
            .field("id", &self.id)
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl Message for JsonMessage {
    fn message_id(&self) -> MessageId {
        self.id
    }

    fn raw_data(&self) -> &[u8] {
        &self.data
    }
}

impl FromRawData for JsonMessage {
    fn from_raw_data(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bytes_is_a_valid_message() {
        let m = RawMessage::new(Vec::new());
        assert_eq!(m.raw_data(), b"");
    }

    #[test]
    fn identical_bytes_are_distinct_messages() {
        let a = RawMessage::new(b"same".to_vec());
        let b = RawMessage::new(b"same".to_vec());
        assert_ne!(a, b);
        assert_ne!(a.message_id(), b.message_id());
    }

    #[test]
    fn json_decode_is_memoised_and_correct() {
        let m = JsonMessage::new(br#"{"flag":"a"}"#.to_vec());
        let first = m.get_json().unwrap().clone();
        let second = m.get_json().unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(first["flag"], "a");
    }

    #[test]
    fn json_decode_error_is_a_handler_fault() {
        let m = JsonMessage::new(b"not json".to_vec());
        let err = m.get_json().unwrap_err();
        assert_eq!(err.code(), "dispatch.handler_fault");
    }
}
