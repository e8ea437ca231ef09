//! In-process test double for [`crate::adapter::Adapter`].
//!
//! Records every ack/nack in call order so tests can assert dispatch
//! outcomes without standing up a real transport.

use std::sync::Mutex;

use crate::adapter::Adapter;
use crate::message::{Message, MessageId};
use crate::SwitchyardError;

/// An [`Adapter`] that records acks and nacks instead of talking to any
/// transport. `nack` always succeeds here — use [`TestAdapter::refuse_nack`]
/// to model a transport for which nack is unsupported.
#[derive(Default)]
pub struct TestAdapter {
    acked: Mutex<Vec<MessageId>>,
    nacked: Mutex<Vec<MessageId>>,
    nack_unsupported: bool,
}

impl TestAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a `TestAdapter` whose `nack` always fails with
    /// [`SwitchyardError::Transport`], for exercising nack-unsupported
    /// adapters.
    pub fn refuse_nack() -> Self {
        Self {
            nack_unsupported: true,
            ..Self::default()
        }
    }

    pub fn acked_ids(&self) -> Vec<MessageId> {
        self.acked.lock().expect("poisoned").clone()
    }

    pub fn nacked_ids(&self) -> Vec<MessageId> {
        self.nacked.lock().expect("poisoned").clone()
    }
}

impl<M: Message> Adapter<M> for TestAdapter {
    fn ack(&self, message: &M) -> Result<(), SwitchyardError> {
        self.acked.lock().expect("poisoned").push(message.message_id());
        Ok(())
    }

    fn nack(&self, message: &M) -> Result<(), SwitchyardError> {
        if self.nack_unsupported {
            return Err(SwitchyardError::Transport {
                reason: "nack is unsupported by this adapter".into(),
            });
        }
        self.nacked.lock().expect("poisoned").push(message.message_id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::RawMessage;

    #[test]
    fn records_acks_in_order() {
        let adapter = TestAdapter::new();
        let a = RawMessage::new(b"a".to_vec());
        let b = RawMessage::new(b"b".to_vec());
        let (a_id, b_id) = (a.message_id(), b.message_id());
        Adapter::<RawMessage>::ack(&adapter, &a).unwrap();
        Adapter::<RawMessage>::ack(&adapter, &b).unwrap();
        assert_eq!(adapter.acked_ids(), vec![a_id, b_id]);
    }

    #[test]
    fn refuse_nack_rejects_every_nack() {
        let adapter = TestAdapter::refuse_nack();
        let m = RawMessage::new(b"x".to_vec());
        let err = Adapter::<RawMessage>::nack(&adapter, &m).unwrap_err();
        assert_eq!(err.code(), "adapter.transport_fault");
    }
}
