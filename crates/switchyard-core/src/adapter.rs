//! The transport boundary the core consumes.
//!
//! An adapter is any object satisfying `ack`/`nack`. The core never
//! constructs adapters itself and never sees transport-level delivery
//! tokens — each concrete adapter owns its own `message_id -> transport
//! token` map privately.

use crate::message::Message;
use crate::SwitchyardError;

/// Transport boundary consumed by [`crate::context::HandlingContext`] and
/// [`crate::context::ProcessingContext`].
pub trait Adapter<M: Message>: Send + Sync {
    /// Signals positive acknowledgement to the transport.
    fn ack(&self, message: &M) -> Result<(), SwitchyardError>;

    /// Signals negative acknowledgement to the transport.
    ///
    /// May be unsupported by a given transport: implementations for which
    /// nack has no meaning (stdin, pub/sub fire-and-forget) should return
    /// `SwitchyardError::Transport`.
    ///
    /// When no DLQ is configured and a handler raises, the dispatch engine
    /// never calls either `ack` or `nack` — the message is left untouched
    /// so the broker redelivers it. `nack` only fires when a handler
    /// explicitly requests it.
    fn nack(&self, message: &M) -> Result<(), SwitchyardError>;
}
