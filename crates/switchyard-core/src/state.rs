//! Per-scope state.
//!
//! [`ScopedState`] parameterises scopes over a caller-provided state
//! struct rather than a dynamic, string-keyed attribute bag:
//! `ProcessingContext<M, PS, HS>` holds one `ScopedState<PS>` for the life
//! of a session, and each `HandlingContext` holds a fresh `ScopedState<HS>`
//! for the life of one message. Access is through `get`/`with`/`with_mut`,
//! which give hooks and handlers free read/write access to the state
//! without a string-keyed bag.

use std::cell::RefCell;

/// Holds the `PS`/`HS` state struct for one processing or handling scope.
///
/// Not `Sync` by construction (`RefCell`) — a single
/// `ProcessingContext`/`HandlingContext` is only ever touched from the one
/// thread driving it through `handle`.
pub struct ScopedState<T>(RefCell<T>);

impl<T: Default> ScopedState<T> {
    pub(crate) fn new() -> Self {
        Self(RefCell::new(T::default()))
    }
}

impl<T> ScopedState<T> {
    /// Runs `f` with shared access to the state.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.borrow())
    }

    /// Runs `f` with exclusive access to the state.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

impl<T: Clone> ScopedState<T> {
    /// Clones the current state out of the scope.
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Clone)]
    struct Counter {
        value: i32,
    }

    #[test]
    fn mutation_through_with_mut_is_visible_to_later_reads() {
        let state = ScopedState::<Counter>::new();
        state.with_mut(|c| c.value += 1);
        state.with_mut(|c| c.value += 1);
        assert_eq!(state.get().value, 2);
    }
}
