//! The top-level entry point: registry + hooks + optional DLQ, bound
//! together and driven through a scoped [`ProcessingContext`] per message.

use std::sync::{Arc, Mutex};

use crate::adapter::Adapter;
use crate::context::ProcessingContext;
use crate::dlq::Dlq;
use crate::hooks::Hooks;
use crate::message::Message;
use crate::registry::{Handler, Registry};
use crate::matcher::Matcher;
use crate::SwitchyardError;

/// Owns the handler registry, the lifecycle hooks, and (optionally) a DLQ
/// for `M`-typed messages. `PS`/`HS` are the caller-supplied
/// processing-scoped and handling-scoped state types.
///
/// A `Processor` is typically built once at startup and shared (via
/// [`Arc`]) across every message an adapter delivers.
pub struct Processor<M: Message, PS, HS> {
    pub(crate) registry: Registry<M, PS, HS>,
    pub(crate) hooks: Hooks<M, PS, HS>,
    pub(crate) dlq: Option<Mutex<Box<dyn Dlq<M>>>>,
}

impl<M: Message, PS, HS> Default for Processor<M, PS, HS> {
    fn default() -> Self {
        Self {
            registry: Registry::new(),
            hooks: Hooks::new(),
            dlq: None,
        }
    }
}

impl<M: Message, PS, HS> Processor<M, PS, HS> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for messages matching `matcher`, named `name`
    /// for diagnostics. See [`Registry::register`].
    pub fn register(
        &mut self,
        name: &'static str,
        matcher: Matcher<M>,
        handler: Handler<M, PS, HS>,
    ) -> Result<(), SwitchyardError> {
        self.registry.register(name, matcher, handler)
    }

    /// Installs a DLQ backend. Replaces any previously-installed one.
    pub fn set_dlq(&mut self, dlq: Box<dyn Dlq<M>>) {
        self.dlq = Some(Mutex::new(dlq));
    }

    /// Registers a `before_processing` hook.
    pub fn before_processing(&mut self, hook: crate::hooks::ProcessingHook<M, PS, HS>) {
        self.hooks.before_processing(hook);
    }

    /// Registers an `after_processing` hook.
    pub fn after_processing(&mut self, hook: crate::hooks::ProcessingHook<M, PS, HS>) {
        self.hooks.after_processing(hook);
    }

    /// Registers a `before_handling` hook.
    pub fn before_handling(&mut self, hook: crate::hooks::HandlingHook<M, PS, HS>) {
        self.hooks.before_handling(hook);
    }

    /// Registers an `after_handling` hook.
    pub fn after_handling(&mut self, hook: crate::hooks::HandlingHook<M, PS, HS>) {
        self.hooks.after_handling(hook);
    }
}

impl<M: Message, PS: Default, HS: Default> Processor<M, PS, HS> {
    /// Dispatches one message through a freshly-entered [`ProcessingContext`]
    /// bound to `adapter`. This is the primary entry point every
    /// adapter-hosting binary drives its delivery loop through.
    pub fn process(
        self: &Arc<Self>,
        adapter: Arc<dyn Adapter<M>>,
        message: M,
    ) -> Result<(), SwitchyardError> {
        let ctx = ProcessingContext::enter(Arc::clone(self), adapter)?;
        let body_result = ctx.handle(message);
        let exit_result = ctx.exit();
        match body_result {
            Err(e) => Err(e),
            Ok(()) => exit_result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::RawMessage;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
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

    fn processor() -> Arc<Processor<RawMessage, (), ()>> {
        Arc::new(Processor::new())
    }

    #[test]
    fn a_single_matching_handler_runs_and_acks() {
        let mut p: Processor<RawMessage, (), ()> = Processor::new();
        p.register(
            "echo",
            crate::matcher::matcher(|_| true),
            Box::new(|_m, ctx| ctx.ack()),
        )
        .unwrap();
        let p = Arc::new(p);
        let adapter = Arc::new(RecordingAdapter::default());
        let message = RawMessage::new(b"hello".to_vec());
        p.process(adapter.clone(), message).unwrap();
        assert_eq!(adapter.acked.lock().unwrap().len(), 1);
    }

    #[test]
    fn no_matching_handler_without_dlq_propagates() {
        let p = processor();
        let adapter = Arc::new(RecordingAdapter::default());
        let err = p
            .process(adapter.clone(), RawMessage::new(b"x".to_vec()))
            .unwrap_err();
        assert_eq!(err.code(), "dispatch.no_handler");
        assert!(adapter.acked.lock().unwrap().is_empty());
    }

    #[test]
    fn no_matching_handler_with_dlq_is_acked_and_recorded() {
        let mut p: Processor<RawMessage, (), ()> = Processor::new();
        p.set_dlq(Box::new(crate::dlq::InMemoryDlq::new()));
        let p = Arc::new(p);
        let adapter = Arc::new(RecordingAdapter::default());
        p.process(adapter.clone(), RawMessage::new(b"x".to_vec()))
            .unwrap();
        assert_eq!(adapter.acked.lock().unwrap().len(), 1);
        let guard = p.dlq.as_ref().unwrap().lock().unwrap();
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn ambiguous_handlers_without_dlq_propagate() {
        let mut p: Processor<RawMessage, (), ()> = Processor::new();
        p.register(
            "first",
            crate::matcher::matcher(|_| true),
            Box::new(|_m, ctx| ctx.ack()),
        )
        .unwrap();
        p.register(
            "second",
            crate::matcher::matcher(|_| true),
            Box::new(|_m, ctx| ctx.ack()),
        )
        .unwrap();
        let p = Arc::new(p);
        let adapter = Arc::new(RecordingAdapter::default());
        let err = p
            .process(adapter, RawMessage::new(b"x".to_vec()))
            .unwrap_err();
        assert_eq!(err.code(), "dispatch.ambiguous_handler");
    }

    #[test]
    fn ambiguous_handlers_with_dlq_records_the_standard_reason() {
        let mut p: Processor<RawMessage, (), ()> = Processor::new();
        p.set_dlq(Box::new(crate::dlq::InMemoryDlq::new()));
        p.register(
            "first",
            crate::matcher::matcher(|_| true),
            Box::new(|_m, ctx| ctx.ack()),
        )
        .unwrap();
        p.register(
            "second",
            crate::matcher::matcher(|_| true),
            Box::new(|_m, ctx| ctx.ack()),
        )
        .unwrap();
        let p = Arc::new(p);
        let adapter = Arc::new(RecordingAdapter::default());
        let message = RawMessage::new(b"x".to_vec());
        let message_id = message.message_id();
        p.process(adapter.clone(), message).unwrap();
        assert_eq!(adapter.acked.lock().unwrap().len(), 1);
        let guard = p.dlq.as_ref().unwrap().lock().unwrap();
        let entry = guard.get(&message_id).unwrap();
        assert_eq!(entry.reason, "multiple matching handlers");
    }

    #[test]
    fn handler_fault_without_dlq_propagates_without_acking() {
        let mut p: Processor<RawMessage, (), ()> = Processor::new();
        p.register(
            "boom",
            crate::matcher::matcher(|_| true),
            Box::new(|m: &RawMessage, _ctx| {
                Err(SwitchyardError::Handler {
                    message_id: m.message_id(),
                    reason: "boom".into(),
                })
            }),
        )
        .unwrap();
        let p = Arc::new(p);
        let adapter = Arc::new(RecordingAdapter::default());
        let err = p
            .process(adapter.clone(), RawMessage::new(b"x".to_vec()))
            .unwrap_err();
        assert_eq!(err.code(), "dispatch.handler_fault");
        assert!(adapter.acked.lock().unwrap().is_empty());
    }

    #[test]
    fn handler_fault_with_dlq_is_recorded_and_acked() {
        let mut p: Processor<RawMessage, (), ()> = Processor::new();
        p.set_dlq(Box::new(crate::dlq::InMemoryDlq::new()));
        p.register(
            "boom",
            crate::matcher::matcher(|_| true),
            Box::new(|m: &RawMessage, _ctx| {
                Err(SwitchyardError::Handler {
                    message_id: m.message_id(),
                    reason: "boom".into(),
                })
            }),
        )
        .unwrap();
        let p = Arc::new(p);
        let adapter = Arc::new(RecordingAdapter::default());
        p.process(adapter.clone(), RawMessage::new(b"x".to_vec()))
            .unwrap();
        assert_eq!(adapter.acked.lock().unwrap().len(), 1);
    }

    #[test]
    fn a_failing_before_handling_hook_still_runs_after_handling_hooks() {
        let mut p: Processor<RawMessage, (), ()> = Processor::new();
        p.set_dlq(Box::new(crate::dlq::InMemoryDlq::new()));
        let after_ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let after_ran_clone = Arc::clone(&after_ran);
        p.before_handling(Box::new(|_pctx, ctx| {
            Err(SwitchyardError::Handler {
                message_id: ctx.message().message_id(),
                reason: "before-handling raised".into(),
            })
        }));
        p.after_handling(Box::new(move |_pctx, _ctx| {
            after_ran_clone.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }));
        p.register(
            "anything",
            crate::matcher::matcher(|_| true),
            Box::new(|_m, ctx| ctx.ack()),
        )
        .unwrap();
        let p = Arc::new(p);
        let adapter = Arc::new(RecordingAdapter::default());
        p.process(adapter.clone(), RawMessage::new(b"x".to_vec()))
            .unwrap();
        assert!(after_ran.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(adapter.acked.lock().unwrap().len(), 1);
        let guard = p.dlq.as_ref().unwrap().lock().unwrap();
        assert_eq!(guard.len(), 1);
    }
}
