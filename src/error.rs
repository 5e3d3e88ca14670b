//! Configuration-misuse diagnostics.
//!
//! Misuse never aborts an invocation and never panics: the offending
//! callback or invocation mode is skipped, the error is reported through
//! `tracing`, and everything else proceeds. This keeps the fire-and-forget
//! modes usable even when misconfigured.

use thiserror::Error;

/// Caller misconfiguration detected at the point of use.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// An asynchronous mode was requested with no task runner configured.
    #[error("no task runner configured; `{mode}` needs one")]
    MissingRunner {
        /// The invocation mode that was requested.
        mode: &'static str,
    },
    /// A scheduling mode was requested on a runner without the scheduler
    /// capability.
    #[error("task runner cannot schedule; `{mode}` needs a scheduler-capable runner")]
    MissingScheduler {
        /// The invocation mode that was requested.
        mode: &'static str,
    },
    /// A value-consuming success callback was configured for work that
    /// produces no value.
    #[error("success callback expects a value but the task produces none; callback skipped")]
    ValueCallbackOnAction,
    /// A value-less success callback was configured for a computation; firing
    /// it would silently discard the produced value.
    #[error("success callback takes no value and would discard the produced one; callback skipped")]
    UnitCallbackOnComputation,
}

pub(crate) fn report(error: ConfigError) {
    tracing::error!(%error, "retry configuration misuse");
}
