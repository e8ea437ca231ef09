//! Per-message handling scope.

use std::cell::Cell;
use std::marker::PhantomData;

use crate::adapter::Adapter;
use crate::message::Message;
use crate::state::ScopedState;
use crate::SwitchyardError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Pending,
    Acked,
    Nacked,
}

/// The scope a handler (and its surrounding before/after-handling hooks)
/// runs in. Bound to exactly one message and exactly one dispatch attempt:
/// ack/nack are exposed here, not on the message itself, and each may fire
/// at most once, enforced rather than merely documented.
pub struct HandlingContext<'a, M: Message, PS, HS> {
    message: &'a M,
    adapter: &'a dyn Adapter<M>,
    state: ScopedState<HS>,
    outcome: Cell<Outcome>,
    _processing_state: PhantomData<PS>,
}

impl<'a, M: Message, PS, HS: Default> HandlingContext<'a, M, PS, HS> {
    pub(crate) fn new(message: &'a M, adapter: &'a dyn Adapter<M>) -> Self {
        Self {
            message,
            adapter,
            state: ScopedState::new(),
            outcome: Cell::new(Outcome::Pending),
            _processing_state: PhantomData,
        }
    }

    /// The message this scope was opened for.
    pub fn message(&self) -> &M {
        self.message
    }

    /// Handling-scoped state, fresh for every dispatch attempt — a
    /// caller-supplied struct rather than a dynamic bag.
    pub fn state(&self) -> &ScopedState<HS> {
        &self.state
    }

    /// Positively acknowledges the message to the transport. Fails with
    /// [`SwitchyardError::DoubleAck`] if this scope already called
    /// `ack`/`nack`.
    pub fn ack(&self) -> Result<(), SwitchyardError> {
        if self.outcome.get() != Outcome::Pending {
            return Err(SwitchyardError::DoubleAck {
                message_id: self.message.message_id(),
            });
        }
        self.adapter.ack(self.message)?;
        self.outcome.set(Outcome::Acked);
        Ok(())
    }

    /// Negatively acknowledges the message to the transport. Fails with
    /// [`SwitchyardError::DoubleNack`] if this scope already called
    /// `ack`/`nack`. May itself fail with [`SwitchyardError::Transport`]
    /// if the adapter has no concept of nack.
    pub fn nack(&self) -> Result<(), SwitchyardError> {
        if self.outcome.get() != Outcome::Pending {
            return Err(SwitchyardError::DoubleNack {
                message_id: self.message.message_id(),
            });
        }
        self.adapter.nack(self.message)?;
        self.outcome.set(Outcome::Nacked);
        Ok(())
    }

    pub(crate) fn was_settled(&self) -> bool {
        self.outcome.get() != Outcome::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::RawMessage;
    use std::sync::Mutex;

    struct RecordingAdapter {
        acked: Mutex<Vec<Vec<u8>>>,
        nacked: Mutex<Vec<Vec<u8>>>,
    }

    impl Adapter<RawMessage> for RecordingAdapter {
        fn ack(&self, message: &RawMessage) -> Result<(), SwitchyardError> {
            self.acked.lock().unwrap().push(message.raw_data().to_vec());
            Ok(())
        }

        fn nack(&self, message: &RawMessage) -> Result<(), SwitchyardError> {
            self.nacked.lock().unwrap().push(message.raw_data().to_vec());
            Ok(())
        }
    }

    #[test]
    fn a_second_ack_after_ack_is_rejected() {
        let adapter = RecordingAdapter {
            acked: Mutex::new(Vec::new()),
            nacked: Mutex::new(Vec::new()),
        };
        let message = RawMessage::new(b"x".to_vec());
        let ctx: HandlingContext<'_, RawMessage, (), ()> = HandlingContext::new(&message, &adapter);
        ctx.ack().unwrap();
        let err = ctx.ack().unwrap_err();
        assert_eq!(err.code(), "dispatch.double_ack");
        assert_eq!(adapter.acked.lock().unwrap().len(), 1);
    }

    #[test]
    fn nack_after_ack_is_rejected() {
        let adapter = RecordingAdapter {
            acked: Mutex::new(Vec::new()),
            nacked: Mutex::new(Vec::new()),
        };
        let message = RawMessage::new(b"x".to_vec());
        let ctx: HandlingContext<'_, RawMessage, (), ()> = HandlingContext::new(&message, &adapter);
        ctx.ack().unwrap();
        let err = ctx.nack().unwrap_err();
        assert_eq!(err.code(), "dispatch.double_nack");
    }
}
