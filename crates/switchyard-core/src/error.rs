//! Error taxonomy for the dispatch engine.
//!
//! Every variant carries a stable `<domain>.<reason>` code (see
//! [`SwitchyardError::code`]) so that logs and alerting can key off a
//! string that survives refactors of the `Display` message.

use crate::message::MessageId;

/// The error domain shared by the whole dispatch engine.
#[derive(Debug, thiserror::Error)]
pub enum SwitchyardError {
    /// A matcher was registered twice.
    #[error("matcher already registered for handler {existing_handler} (new handler {new_handler})")]
    Registration {
        existing_handler: String,
        new_handler: String,
    },

    /// Zero handlers matched and no DLQ is configured.
    #[error("no matching handler for message {message_id} and no DLQ configured")]
    NoHandler { message_id: MessageId },

    /// More than one handler matched and no DLQ is configured.
    #[error("{count} handlers matched message {message_id} and no DLQ configured")]
    AmbiguousHandler { message_id: MessageId, count: usize },

    /// A handler, matcher, or handling hook raised.
    #[error("handler raised for message {message_id}: {reason}")]
    Handler {
        message_id: MessageId,
        reason: String,
    },

    /// A before/after-processing hook raised. Always fatal.
    #[error("processing hook raised: {reason}")]
    ProcessingHook { reason: String },

    /// An adapter-level transport operation is unsupported or failed.
    #[error("transport fault: {reason}")]
    Transport { reason: String },

    /// A DLQ backend failed to persist an entry. Insert must complete
    /// synchronously before the offending message is acked, so a failing
    /// insert is fatal for the current dispatch.
    #[error("dlq write failed for message {message_id}: {reason}")]
    Dlq {
        message_id: MessageId,
        reason: String,
    },

    /// `HandlingContext::ack` was called a second time for the same
    /// message. Exactly-once ack/nack is enforced, not last-wins.
    #[error("message {message_id} was already acked or nacked")]
    DoubleAck { message_id: MessageId },

    /// `HandlingContext::nack` was called a second time for the same message.
    #[error("message {message_id} was already acked or nacked")]
    DoubleNack { message_id: MessageId },
}

impl SwitchyardError {
    /// Stable `<domain>.<reason>` code, independent of the `Display` text.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Registration { .. } => "dispatch.registration_fault",
            Self::NoHandler { .. } => "dispatch.no_handler",
            Self::AmbiguousHandler { .. } => "dispatch.ambiguous_handler",
            Self::Handler { .. } => "dispatch.handler_fault",
            Self::ProcessingHook { .. } => "dispatch.processing_hook_fault",
            Self::Transport { .. } => "adapter.transport_fault",
            Self::Dlq { .. } => "dlq.write_failed",
            Self::DoubleAck { .. } => "dispatch.double_ack",
            Self::DoubleNack { .. } => "dispatch.double_nack",
        }
    }

    /// True for faults that are message-scoped and therefore recoverable
    /// by routing to a DLQ, as opposed to session-scoped faults which are
    /// never DLQ-routable.
    pub fn is_message_scoped(&self) -> bool {
        matches!(self, Self::Handler { .. })
    }
}
