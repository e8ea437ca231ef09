//! Lifecycle hooks.
//!
//! Four append-only, registration-order lists. Both "before" and "after"
//! lists run in registration order — deliberately symmetric rather than
//! reversed, so ordering teardown correctly is the caller's
//! responsibility.

use crate::context::{HandlingContext, ProcessingContext};
use crate::SwitchyardError;

pub type ProcessingHook<M, PS, HS> =
    Box<dyn Fn(&ProcessingContext<M, PS, HS>) -> Result<(), SwitchyardError> + Send + Sync>;

pub type HandlingHook<M, PS, HS> = Box<
    dyn Fn(&ProcessingContext<M, PS, HS>, &HandlingContext<'_, M, PS, HS>) -> Result<(), SwitchyardError>
        + Send
        + Sync,
>;

pub struct Hooks<M, PS, HS> {
    pub(crate) before_processing: Vec<ProcessingHook<M, PS, HS>>,
    pub(crate) after_processing: Vec<ProcessingHook<M, PS, HS>>,
    pub(crate) before_handling: Vec<HandlingHook<M, PS, HS>>,
    pub(crate) after_handling: Vec<HandlingHook<M, PS, HS>>,
}

impl<M, PS, HS> Default for Hooks<M, PS, HS> {
    fn default() -> Self {
        Self {
            before_processing: Vec::new(),
            after_processing: Vec::new(),
            before_handling: Vec::new(),
            after_handling: Vec::new(),
        }
    }
}

impl<M, PS, HS> Hooks<M, PS, HS> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_processing(&mut self, hook: ProcessingHook<M, PS, HS>) {
        self.before_processing.push(hook);
    }

    pub fn after_processing(&mut self, hook: ProcessingHook<M, PS, HS>) {
        self.after_processing.push(hook);
    }

    pub fn before_handling(&mut self, hook: HandlingHook<M, PS, HS>) {
        self.before_handling.push(hook);
    }

    pub fn after_handling(&mut self, hook: HandlingHook<M, PS, HS>) {
        self.after_handling.push(hook);
    }
}
