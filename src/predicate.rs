//! Failure classification for retry decisions.
//!
//! A `RetryPredicate` decides whether a failure qualifies for another
//! attempt. The default matches every failure; restricted predicates are
//! built from an arbitrary closure or from a set of failure-kind tags.
//!
//! Kind matching works on enumerable tags rather than type hierarchies: a
//! failure type exposes its tag through [`Kinded`], and an overridable
//! `is_subkind` relation (equality by default) lets callers model "retry on
//! this kind and everything beneath it".

use std::fmt;
use std::sync::Arc;

/// Failure types that expose an enumerable kind tag.
pub trait Kinded {
    /// Tag identifying a failure's kind.
    type Kind: Copy + PartialEq + Send + Sync + 'static;

    /// The kind of this particular failure.
    fn kind(&self) -> Self::Kind;

    /// Whether `kind` counts as `ancestor` when matching a retry-on set.
    ///
    /// Defaults to tag equality; override to model a hierarchy among kinds.
    fn is_subkind(kind: Self::Kind, ancestor: Self::Kind) -> bool {
        kind == ancestor
    }
}

/// Decides whether a failure qualifies for another attempt.
pub struct RetryPredicate<E> {
    test: Arc<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E> RetryPredicate<E> {
    /// Retry on every failure. This is the default predicate.
    pub fn any() -> Self {
        Self { test: Arc::new(|_| true) }
    }

    /// Arbitrary predicate over the failure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self { test: Arc::new(f) }
    }

    /// Whether `failure` qualifies for retry.
    pub fn test(&self, failure: &E) -> bool {
        (self.test)(failure)
    }
}

impl<E: Kinded> RetryPredicate<E> {
    /// Retry when the failure's kind matches, or is a sub-kind of, any entry
    /// in `kinds`.
    ///
    /// An empty set places no restriction at all and behaves like
    /// [`RetryPredicate::any`].
    pub fn for_kinds<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = E::Kind>,
    {
        let kinds: Vec<E::Kind> = kinds.into_iter().collect();
        if kinds.is_empty() {
            return Self::any();
        }
        Self::from_fn(move |failure| {
            let kind = failure.kind();
            kinds.iter().any(|ancestor| E::is_subkind(kind, *ancestor))
        })
    }
}

impl<E> Clone for RetryPredicate<E> {
    fn clone(&self) -> Self {
        Self { test: self.test.clone() }
    }
}

impl<E> Default for RetryPredicate<E> {
    fn default() -> Self {
        Self::any()
    }
}

impl<E> fmt::Debug for RetryPredicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryPredicate(<predicate>)")
    }
}
