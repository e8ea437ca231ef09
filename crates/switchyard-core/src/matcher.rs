//! Matcher predicates.
//!
//! A [`Matcher`] is a pure predicate over a message. Duplicate-registration
//! detection is by pointer identity: registering the *same* `Arc` twice is
//! a duplicate, registering two structurally-identical-but-distinct
//! closures is not.
//!
//! Matchers return `Result<bool, SwitchyardError>` rather than a bare
//! `bool` so that a matcher raising has a direct Rust expression: return
//! `Err`. The dispatch engine folds that `Err` into the same path as a
//! handler exception.

use std::sync::Arc;

use crate::error::SwitchyardError;

/// A predicate `Message -> Result<bool, SwitchyardError>`. Matchers are
/// assumed cheap in the common case; the dispatch engine makes no
/// ordering guarantee across matcher evaluation.
pub type Matcher<M> = Arc<dyn Fn(&M) -> Result<bool, SwitchyardError> + Send + Sync>;

/// Stable identity for a registered matcher, derived from the `Arc`'s
/// backing allocation address. Two `Arc` clones of the same matcher share
/// an id; two independently-constructed matchers never do, even if their
/// closures are behaviourally identical.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MatcherId(usize);

pub(crate) fn matcher_id<M>(matcher: &Matcher<M>) -> MatcherId {
    MatcherId(Arc::as_ptr(matcher) as *const () as usize)
}

/// Wraps an infallible predicate as a [`Matcher`]. This is the common
/// case — most matchers never fail.
pub fn matcher<M, F>(f: F) -> Matcher<M>
where
    F: Fn(&M) -> bool + Send + Sync + 'static,
{
    Arc::new(move |message: &M| Ok(f(message)))
}

/// Wraps a predicate that may itself fail (e.g. a matcher that decodes the
/// message body to inspect a field) as a [`Matcher`].
pub fn fallible_matcher<M, F>(f: F) -> Matcher<M>
where
    F: Fn(&M) -> Result<bool, SwitchyardError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Composes matchers with logical AND, short-circuiting on the first
/// `false` or `Err`. Exposed as explicit composition rather than an
/// alternate registration API accepting a sequence of predicates
/// directly.
pub fn all_of<M: 'static>(matchers: Vec<Matcher<M>>) -> Matcher<M> {
    Arc::new(move |message: &M| {
        for m in &matchers {
            if !m(message)? {
                return Ok(false);
            }
        }
        Ok(true)
    })
}

/// Composes matchers with logical OR, short-circuiting on the first
/// `true` or `Err`.
pub fn any_of<M: 'static>(matchers: Vec<Matcher<M>>) -> Matcher<M> {
    Arc::new(move |message: &M| {
        for m in &matchers {
            if m(message)? {
                return Ok(true);
            }
        }
        Ok(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_of_the_same_matcher_share_an_id() {
        let m: Matcher<()> = matcher(|_| true);
        let clone = Arc::clone(&m);
        assert_eq!(matcher_id(&m), matcher_id(&clone));
    }

    #[test]
    fn distinct_matchers_have_distinct_ids() {
        let a: Matcher<()> = matcher(|_| true);
        let b: Matcher<()> = matcher(|_| true);
        assert_ne!(matcher_id(&a), matcher_id(&b));
    }

    #[test]
    fn all_of_is_a_conjunction() {
        let always: Matcher<i32> = matcher(|_| true);
        let positive: Matcher<i32> = matcher(|n: &i32| *n > 0);
        let both = all_of(vec![always, positive]);
        assert!(both(&1).unwrap());
        assert!(!both(&-1).unwrap());
    }

    #[test]
    fn fallible_matcher_error_propagates() {
        use crate::message::{Message, RawMessage};
        let id = RawMessage::new(Vec::new()).message_id();
        let m: Matcher<i32> = fallible_matcher(move |_| {
            Err(SwitchyardError::Handler {
                message_id: id,
                reason: "bad".into(),
            })
        });
        assert!(m(&1).is_err());
    }
}
