//! Outcome callbacks.
//!
//! Every invocation ends through exactly one terminal callback — success or
//! failure — with zero or more retry notifications along the way. The
//! success callback is a single tagged slot, so "value-consuming and
//! value-less handler both configured" is unrepresentable.

use std::fmt;
use std::sync::Arc;

/// Observer for retry transitions: the zero-based attempt index and the
/// failure that triggered the re-run.
pub type OnRetry<E> = Arc<dyn Fn(usize, E) + Send + Sync>;

/// Observer for the terminal failure of an invocation.
pub type OnFailure<E> = Arc<dyn Fn(E) + Send + Sync>;

/// The success callback, tagged by whether it consumes a produced value.
///
/// Computations deliver through `WithValue`, actions through `NoValue`. A
/// handler whose shape does not match the invocation path is skipped and
/// reported, never fired with a lossy conversion.
pub enum SuccessHandler<T> {
    /// Receives the value a computation produced.
    WithValue(Arc<dyn Fn(T) + Send + Sync>),
    /// Runs after an action that produces no value.
    NoValue(Arc<dyn Fn() + Send + Sync>),
}

impl<T> SuccessHandler<T> {
    /// Handler that consumes the produced value.
    pub fn with_value<F>(f: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        SuccessHandler::WithValue(Arc::new(f))
    }

    /// Handler for work that produces no value.
    pub fn no_value<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        SuccessHandler::NoValue(Arc::new(f))
    }
}

impl<T> Clone for SuccessHandler<T> {
    fn clone(&self) -> Self {
        match self {
            SuccessHandler::WithValue(f) => SuccessHandler::WithValue(f.clone()),
            SuccessHandler::NoValue(f) => SuccessHandler::NoValue(f.clone()),
        }
    }
}

impl<T> fmt::Debug for SuccessHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessHandler::WithValue(_) => f.write_str("SuccessHandler::WithValue(<callback>)"),
            SuccessHandler::NoValue(_) => f.write_str("SuccessHandler::NoValue(<callback>)"),
        }
    }
}
