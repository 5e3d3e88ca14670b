//! Convenient re-exports for common Reprise types.
pub use crate::{
    budget::RetryBudget,
    callbacks::{OnFailure, OnRetry, SuccessHandler},
    clock::{Clock, ManualClock, MonotonicClock},
    error::ConfigError,
    executor::{RetryExecutor, RetryExecutorBuilder},
    predicate::{Kinded, RetryPredicate},
    runner::{Scheduler, TaskFactory, TaskRunner, TokioRunner, TokioScheduler},
    sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper},
};
