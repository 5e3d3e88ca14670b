#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Reprise
//!
//! A retry-execution engine for fallible work: run an action or a
//! value-producing computation, and when it fails decide — by failure kind
//! and retry budget — whether to run it again, notifying observer callbacks
//! at every transition.
//!
//! ## Features
//!
//! - **Retry budgets** with an unlimited sentinel; negative counts normalize
//!   to their absolute value
//! - **Failure-kind predicates** with sub-kind matching, or arbitrary
//!   closures
//! - **Outcome callbacks**: `on_success` (value or unit shape), `on_retry`,
//!   `on_failure` — every invocation ends through exactly one terminal
//!   callback
//! - **Pluggable task runners**: immediate on the calling task,
//!   fire-and-forget or submitted on a background worker, or scheduled
//!   once/periodically over a caller-owned tokio runtime
//!
//! Retries re-run immediately; there is no backoff between attempts. Pacing
//! whole invocations is the scheduler's job.
//!
//! ## Quick Start
//!
//! ```rust
//! use reprise::RetryExecutor;
//!
//! #[tokio::main]
//! async fn main() {
//!     let executor = RetryExecutor::<(), std::io::Error>::builder()
//!         .retry_count(3)
//!         .on_success_unit(|| println!("done"))
//!         .on_retry(|attempt, error| eprintln!("attempt {attempt} failed: {error}"))
//!         .on_failure(|error| eprintln!("giving up: {error}"))
//!         .build();
//!
//!     executor.run(|| async { Ok(()) }).await;
//! }
//! ```

pub mod budget;
pub mod callbacks;
pub mod clock;
pub mod error;
pub mod executor;
pub mod predicate;
pub mod prelude;
pub mod runner;
pub mod sleeper;

// Re-exports
pub use budget::RetryBudget;
pub use callbacks::{OnFailure, OnRetry, SuccessHandler};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::ConfigError;
pub use executor::{RetryExecutor, RetryExecutorBuilder};
pub use predicate::{Kinded, RetryPredicate};
pub use runner::{Scheduler, TaskFactory, TaskRunner, TokioRunner, TokioScheduler};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
