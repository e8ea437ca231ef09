//! Cooperative shutdown.
//!
//! Adapters poll [`ShutdownCoordinator::should_exit`] between deliveries
//! rather than being torn down from a signal handler directly — signal
//! handlers only set a flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared exit flag, settable from a SIGINT/SIGTERM handler or directly by
/// a caller (e.g. in tests).
#[derive(Clone, Default)]
pub struct ShutdownCoordinator {
    flag: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers SIGINT/SIGTERM handlers via the `ctrlc` crate that set
    /// this coordinator's flag. `on_signal`, if provided, runs once as the
    /// first thing the handler does, before the flag is set — useful for
    /// flushing in-flight state before the adapter loop observes
    /// `should_exit()`.
    ///
    /// Fails if a handler is already installed for this process (`ctrlc`
    /// only allows one registration process-wide).
    pub fn enable(
        &self,
        on_signal: Option<Box<dyn Fn() + Send + 'static>>,
    ) -> Result<(), ctrlc::Error> {
        let flag = Arc::clone(&self.flag);
        ctrlc::set_handler(move || {
            if let Some(callback) = on_signal.as_ref() {
                callback();
            }
            flag.store(true, Ordering::SeqCst);
        })
    }

    /// Sets the flag directly, without going through a signal.
    pub fn set_flag(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once the flag has been set.
    pub fn should_exit(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Blocks the calling thread until the flag is set, polling at
    /// `poll_interval`. Intended for adapters whose delivery loop has no
    /// natural blocking point to interleave the check into (e.g. a
    /// background-thread pub/sub subscriber).
    pub fn wait_for_flag(&self, poll_interval: std::time::Duration) {
        while !self.should_exit() {
            std::thread::sleep(poll_interval);
        }
    }
}
