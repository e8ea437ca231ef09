//! Reads newline-delimited messages from stdin, one per line.
//!
//! `ack` is a no-op (there is nowhere to acknowledge to); `nack` always
//! fails with [`SwitchyardError::Transport`] since stdin has no concept of
//! redelivery.

use std::io::BufRead;
use std::sync::Arc;

use switchyard_core::adapter::Adapter;
use switchyard_core::message::{FromRawData, Message};
use switchyard_core::processor::Processor;
use switchyard_core::shutdown::ShutdownCoordinator;
use switchyard_core::SwitchyardError;

pub struct StdinAdapter;

impl StdinAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdinAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> Adapter<M> for StdinAdapter {
    fn ack(&self, _message: &M) -> Result<(), SwitchyardError> {
        Ok(())
    }

    fn nack(&self, _message: &M) -> Result<(), SwitchyardError> {
        Err(SwitchyardError::Transport {
            reason: "stdin adapter has no concept of nack".into(),
        })
    }
}

/// Reads lines from `stdin` until EOF or `shutdown` is signalled, dispatching
/// each as a message through `processor`. Logs and continues past
/// per-message dispatch faults rather than aborting the whole run.
pub fn run<M, PS, HS>(
    processor: Arc<Processor<M, PS, HS>>,
    shutdown: &ShutdownCoordinator,
) -> std::io::Result<()>
where
    M: FromRawData,
    PS: Default,
    HS: Default,
{
    let adapter: Arc<dyn Adapter<M>> = Arc::new(StdinAdapter::new());
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        if shutdown.should_exit() {
            break;
        }
        let line = line?;
        let message = M::from_raw_data(line.into_bytes());
        if let Err(e) = processor.process(Arc::clone(&adapter), message) {
            tracing::error!(reason = %e, "stdin dispatch failed");
        }
    }
    Ok(())
}
