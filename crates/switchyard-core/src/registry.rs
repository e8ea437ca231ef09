//! Handler registry.
//!
//! Ordered, insertion-preserving mapping from `(matcher, handler)` to a
//! caller-supplied name. Each matcher may appear at most once; violating
//! that is a registration-time fault, never something the dispatch engine
//! discovers at message-handling time.

use crate::context::HandlingContext;
use crate::matcher::{matcher_id, Matcher};
use crate::message::Message;
use crate::SwitchyardError;

/// A handler invoked for exactly one matching message.
///
/// Takes the message and the per-message [`HandlingContext`]; the handler
/// is expected to call `ctx.ack()`/`ctx.nack()` exactly once. The core does
/// not enforce this on the *handler* itself, but the `HandlingContext`
/// enforces it on the ack/nack calls themselves.
pub type Handler<M, PS, HS> =
    Box<dyn Fn(&M, &HandlingContext<'_, M, PS, HS>) -> Result<(), SwitchyardError> + Send + Sync>;

struct Entry<M, PS, HS> {
    name: &'static str,
    matcher: Matcher<M>,
    handler: Handler<M, PS, HS>,
}

/// Ordered insertion-preserving `(matcher, handler)` table.
pub struct Registry<M, PS, HS> {
    entries: Vec<Entry<M, PS, HS>>,
}

impl<M, PS, HS> Default for Registry<M, PS, HS> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<M: Message, PS, HS> Registry<M, PS, HS> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler`, named `name` for logging/error messages, to
    /// `matcher`. Fails synchronously if `matcher`'s pointer identity is
    /// already registered.
    pub fn register(
        &mut self,
        name: &'static str,
        matcher: Matcher<M>,
        handler: Handler<M, PS, HS>,
    ) -> Result<(), SwitchyardError> {
        let incoming_id = matcher_id(&matcher);
        if let Some(existing) = self
            .entries
            .iter()
            .find(|entry| matcher_id(&entry.matcher) == incoming_id)
        {
            return Err(SwitchyardError::Registration {
                existing_handler: existing.name.to_string(),
                new_handler: name.to_string(),
            });
        }
        self.entries.push(Entry {
            name,
            matcher,
            handler,
        });
        Ok(())
    }

    /// Returns the handlers (in registration order) whose matcher returns
    /// true for `message`. A matcher that returns an error folds into the
    /// same path as a handler exception: the whole dispatch short-circuits
    /// and returns that error.
    pub(crate) fn matching(
        &self,
        message: &M,
    ) -> Result<Vec<(&'static str, &Handler<M, PS, HS>)>, SwitchyardError> {
        let mut matched = Vec::new();
        for entry in &self.entries {
            if (entry.matcher)(message)? {
                matched.push((entry.name, &entry.handler));
            }
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::matcher;
    use crate::message::RawMessage;
    use std::sync::Arc;

    fn noop_handler<PS, HS>() -> Handler<RawMessage, PS, HS> {
        Box::new(|_m, ctx| ctx.ack())
    }

    #[test]
    fn duplicate_matcher_registration_fails() {
        let mut registry: Registry<RawMessage, (), ()> = Registry::new();
        let always: Matcher<RawMessage> = matcher(|_| true);
        registry
            .register("first", Arc::clone(&always), noop_handler())
            .unwrap();
        let err = registry
            .register("second", always, noop_handler())
            .unwrap_err();
        assert_eq!(err.code(), "dispatch.registration_fault");
    }

    #[test]
    fn distinct_matcher_instances_do_not_collide() {
        let mut registry: Registry<RawMessage, (), ()> = Registry::new();
        registry
            .register("first", matcher(|_: &RawMessage| true), noop_handler())
            .unwrap();
        registry
            .register("second", matcher(|_: &RawMessage| true), noop_handler())
            .unwrap();
        let message = RawMessage::new(b"x".to_vec());
        assert_eq!(registry.matching(&message).unwrap().len(), 2);
    }
}
