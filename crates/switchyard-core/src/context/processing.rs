//! Per-"process one message" scope and the dispatch algorithm that runs
//! inside it.

use std::sync::Arc;

use super::handling::HandlingContext;
use crate::adapter::Adapter;
use crate::message::Message;
use crate::processor::Processor;
use crate::state::ScopedState;
use crate::SwitchyardError;

/// The scope a single call to [`Processor::process`] runs in: one message,
/// one adapter, one processing-scoped state value, and the before/after
/// processing hooks wrapped around it.
///
/// Entering a `ProcessingContext` runs `before_processing` hooks; leaving
/// it runs `after_processing` hooks unconditionally, in registration
/// order, even when the body raised — the original error, if any,
/// propagates once the after-hooks have all run.
pub struct ProcessingContext<M: Message, PS, HS> {
    processor: Arc<Processor<M, PS, HS>>,
    adapter: Arc<dyn Adapter<M>>,
    state: ScopedState<PS>,
}

impl<M: Message, PS: Default, HS: Default> ProcessingContext<M, PS, HS> {
    pub(crate) fn enter(
        processor: Arc<Processor<M, PS, HS>>,
        adapter: Arc<dyn Adapter<M>>,
    ) -> Result<Self, SwitchyardError> {
        let ctx = Self {
            processor,
            adapter,
            state: ScopedState::new(),
        };
        for hook in &ctx.processor.hooks.before_processing {
            hook(&ctx).map_err(|e| SwitchyardError::ProcessingHook {
                reason: e.to_string(),
            })?;
        }
        Ok(ctx)
    }

    /// Runs every `after_processing` hook regardless of earlier failures,
    /// returning the first error encountered (if any) after all of them
    /// have run.
    pub(crate) fn exit(&self) -> Result<(), SwitchyardError> {
        let mut first_error = None;
        for hook in &self.processor.hooks.after_processing {
            if let Err(e) = hook(self) {
                tracing::error!(reason = %e, "after_processing hook failed");
                if first_error.is_none() {
                    first_error = Some(SwitchyardError::ProcessingHook {
                        reason: e.to_string(),
                    });
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Processing-scoped state, shared by every handling attempt within
    /// this single `process` call.
    pub fn state(&self) -> &ScopedState<PS> {
        &self.state
    }

    /// Dispatches `message` against the registry:
    ///
    /// - A matcher raising is folded into the handler-fault path below
    ///   (point 1).
    /// - Zero matches -> [`SwitchyardError::NoHandler`], or DLQ-and-ack
    ///   if a DLQ is configured.
    /// - Exactly one match -> the handler runs, wrapped by before/after
    ///   handling hooks.
    /// - More than one match -> [`SwitchyardError::AmbiguousHandler`], or
    ///   DLQ-and-ack if a DLQ is configured.
    pub fn handle(&self, message: M) -> Result<(), SwitchyardError> {
        let matched = match self.processor.registry.matching(&message) {
            Ok(matched) => matched,
            Err(fault) => return self.route_fault(message, fault),
        };
        match matched.len() {
            0 => self.route_unmatched(message, UnmatchReason::NoHandler),
            1 => {
                let (_name, handler) = matched[0];
                let outcome = self.run_handling_scope(&message, handler);
                match outcome {
                    Ok(()) => Ok(()),
                    Err(fault) => self.route_fault(message, fault),
                }
            }
            count => self.route_unmatched(message, UnmatchReason::Ambiguous(count)),
        }
    }

    fn run_handling_scope(
        &self,
        message: &M,
        handler: &crate::registry::Handler<M, PS, HS>,
    ) -> Result<(), SwitchyardError> {
        let ctx: HandlingContext<'_, M, PS, HS> =
            HandlingContext::new(message, self.adapter.as_ref());

        let before_result = self.run_before_handling(&ctx);
        let handler_result = match before_result {
            Ok(()) => handler(ctx.message(), &ctx),
            Err(e) => Err(e),
        };
        let after_result = self.run_after_handling(&ctx);

        match handler_result {
            Err(e) => Err(e),
            Ok(()) => after_result,
        }
    }

    fn run_before_handling(
        &self,
        ctx: &HandlingContext<'_, M, PS, HS>,
    ) -> Result<(), SwitchyardError> {
        for hook in &self.processor.hooks.before_handling {
            hook(self, ctx)?;
        }
        Ok(())
    }

    /// Runs every `after_handling` hook regardless of what came before,
    /// returning the first error encountered.
    fn run_after_handling(
        &self,
        ctx: &HandlingContext<'_, M, PS, HS>,
    ) -> Result<(), SwitchyardError> {
        let mut first_error = None;
        for hook in &self.processor.hooks.after_handling {
            if let Err(e) = hook(self, ctx) {
                tracing::error!(reason = %e, "after_handling hook failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Zero- or many-match outcome: without a DLQ, propagate; with one,
    /// record and ack.
    fn route_unmatched(&self, message: M, reason: UnmatchReason) -> Result<(), SwitchyardError> {
        let message_id = message.message_id();
        match self.processor.dlq.as_ref() {
            Some(dlq) => {
                let description = reason.description();
                let mut guard = dlq.lock().expect("dlq mutex poisoned");
                guard.insert(&message, description.clone())?;
                drop(guard);
                self.adapter.ack(&message)?;
                tracing::warn!(%message_id, reason = %description, "routed unmatched message to dlq");
                Ok(())
            }
            None => Err(reason.into_error(message_id)),
        }
    }

    /// Handler- or matcher-fault outcome: without a DLQ, propagate without
    /// acking, so the transport can redeliver; with a DLQ, insert then
    /// ack.
    fn route_fault(&self, message: M, fault: SwitchyardError) -> Result<(), SwitchyardError> {
        let message_id = message.message_id();
        match self.processor.dlq.as_ref() {
            Some(dlq) => {
                let reason = fault.to_string();
                let mut guard = dlq.lock().expect("dlq mutex poisoned");
                guard.insert(&message, reason.clone())?;
                drop(guard);
                self.adapter.ack(&message)?;
                tracing::warn!(%message_id, reason, "routed faulted message to dlq");
                Ok(())
            }
            None => {
                tracing::error!(%message_id, reason = %fault, "no dlq configured, propagating fault");
                Err(fault)
            }
        }
    }
}

enum UnmatchReason {
    NoHandler,
    Ambiguous(usize),
}

impl UnmatchReason {
    fn description(&self) -> String {
        match self {
            UnmatchReason::NoHandler => "no matching handlers".to_string(),
            UnmatchReason::Ambiguous(_count) => "multiple matching handlers".to_string(),
        }
    }

    fn into_error(self, message_id: crate::message::MessageId) -> SwitchyardError {
        match self {
            UnmatchReason::NoHandler => SwitchyardError::NoHandler { message_id },
            UnmatchReason::Ambiguous(count) => SwitchyardError::AmbiguousHandler { message_id, count },
        }
    }
}
