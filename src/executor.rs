//! The retry engine: configuration plus the run-retry-terminate loop.
//!
//! Semantics:
//! - Work comes in two shapes: an *action* (no value, may fail) and a
//!   *computation* (produces a value, may fail).
//! - A failed attempt is re-run when the predicate approves the failure and
//!   the budget still has room; otherwise the invocation terminates.
//! - A budget of `N` permits exactly `N` retries after the initial attempt
//!   (`N + 1` invocations of the work); `on_retry` observes the zero-based
//!   attempt index before it advances.
//! - Retries re-run immediately. There is no delay between attempts; pacing
//!   belongs to the scheduler modes, which space whole invocations.
//! - Outcomes are delivered exclusively through callbacks. Work failures
//!   never propagate out of an invocation mode, and exactly one terminal
//!   callback (success or failure) concludes each invocation.
//!
//! Invariants:
//! - Attempts within one invocation are strictly sequential.
//! - Configuration is frozen at [`RetryExecutorBuilder::build`]; invocations
//!   share it read-only, so a single executor is reusable and, with a
//!   multi-threaded runner and reentrant callbacks, safely concurrent.
//!
//! Example
//! ```rust
//! use reprise::RetryExecutor;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let calls = Arc::new(AtomicUsize::new(0));
//! let calls_in_work = calls.clone();
//!
//! let executor = RetryExecutor::<u32, std::io::Error>::builder()
//!     .retry_count(3)
//!     .on_success(|value| println!("produced {value}"))
//!     .on_retry(|attempt, error| eprintln!("attempt {attempt} failed: {error}"))
//!     .on_failure(|error| eprintln!("giving up: {error}"))
//!     .build();
//!
//! executor
//!     .call(move || {
//!         let calls = calls_in_work.clone();
//!         async move {
//!             if calls.fetch_add(1, Ordering::SeqCst) < 2 {
//!                 Err(std::io::Error::new(std::io::ErrorKind::Other, "flaky"))
//!             } else {
//!                 Ok(7)
//!             }
//!         }
//!     })
//!     .await;
//!
//! assert_eq!(calls.load(Ordering::SeqCst), 3);
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::budget::RetryBudget;
use crate::callbacks::{OnFailure, OnRetry, SuccessHandler};
use crate::error::{report, ConfigError};
use crate::predicate::{Kinded, RetryPredicate};
use crate::runner::{Scheduler, TaskFactory, TaskRunner};

/// Retry-execution engine: budget, predicate, callbacks, optional runner.
///
/// Built once via [`RetryExecutor::builder`], then invoked any number of
/// times through the immediate (`run`/`call`), background
/// (`execute`/`submit`), or scheduled (`schedule*`) modes. Each invocation
/// starts a fresh attempt counter.
pub struct RetryExecutor<T, E> {
    budget: RetryBudget,
    predicate: RetryPredicate<E>,
    on_success: Option<SuccessHandler<T>>,
    on_retry: Option<OnRetry<E>>,
    on_failure: Option<OnFailure<E>>,
    runner: Option<Arc<dyn TaskRunner>>,
}

impl<T, E> Clone for RetryExecutor<T, E> {
    fn clone(&self) -> Self {
        Self {
            budget: self.budget,
            predicate: self.predicate.clone(),
            on_success: self.on_success.clone(),
            on_retry: self.on_retry.clone(),
            on_failure: self.on_failure.clone(),
            runner: self.runner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for RetryExecutor<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("budget", &self.budget)
            .field("predicate", &self.predicate)
            .field("on_success", &self.on_success)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<callback>"))
            .field("on_failure", &self.on_failure.as_ref().map(|_| "<callback>"))
            .field("runner", &self.runner)
            .finish()
    }
}

impl<T, E> RetryExecutor<T, E>
where
    T: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    /// Construct a new builder with defaults: unlimited budget, retry on
    /// every failure, no callbacks, no runner.
    pub fn builder() -> RetryExecutorBuilder<T, E> {
        RetryExecutorBuilder::new()
    }

    /// Run an action through the retry loop on the calling task, returning
    /// once a terminal callback has fired.
    pub async fn run<Op, Fut>(&self, mut op: Op)
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        self.drive_action(&mut op).await;
    }

    /// Run a computation through the retry loop on the calling task. The
    /// produced value is delivered through the value-consuming success
    /// callback.
    pub async fn call<Op, Fut>(&self, mut op: Op)
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.drive_computation(&mut op).await;
    }

    /// Fire-and-forget: hand the retry-wrapped action to the runner and
    /// return immediately, with no result handle.
    ///
    /// Without a configured runner the misuse is reported and the action is
    /// not run.
    pub fn execute<Op, Fut>(&self, op: Op)
    where
        Op: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let Some(runner) = self.runner_for("execute") else { return };
        let this = self.clone();
        runner.spawn(Box::pin(async move {
            let mut op = op;
            this.drive_action(&mut op).await;
        }));
    }

    /// Submit a computation for background execution.
    ///
    /// The returned handle resolves when the retry loop terminates and
    /// carries no value; results reach the caller through the
    /// value-consuming success callback. Without a configured runner the
    /// misuse is reported, nothing runs, and `None` is returned.
    pub fn submit<Op, Fut>(&self, op: Op) -> Option<JoinHandle<()>>
    where
        Op: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let runner = self.runner_for("submit")?;
        let this = self.clone();
        Some(runner.spawn(Box::pin(async move {
            let mut op = op;
            this.drive_computation(&mut op).await;
        })))
    }

    /// Run an action once after `delay`, retry-wrapped.
    ///
    /// Aborting the returned handle before the delay elapses cancels the
    /// run. Requires a scheduler-capable runner.
    pub fn schedule<Op, Fut>(&self, op: Op, delay: Duration) -> Option<JoinHandle<()>>
    where
        Op: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let scheduler = self.scheduler_for("schedule")?;
        let this = self.clone();
        Some(scheduler.schedule_once(
            delay,
            Box::pin(async move {
                let mut op = op;
                this.drive_action(&mut op).await;
            }),
        ))
    }

    /// Run a computation once after `delay`, retry-wrapped.
    ///
    /// Requires a scheduler-capable runner.
    pub fn schedule_call<Op, Fut>(&self, op: Op, delay: Duration) -> Option<JoinHandle<()>>
    where
        Op: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let scheduler = self.scheduler_for("schedule_call")?;
        let this = self.clone();
        Some(scheduler.schedule_once(
            delay,
            Box::pin(async move {
                let mut op = op;
                this.drive_computation(&mut op).await;
            }),
        ))
    }

    /// Run an action periodically at `initial_delay`, `initial_delay +
    /// period`, … measured start-to-start. Each tick runs the full retry
    /// loop with a fresh attempt counter; the schedule runs until the
    /// returned handle is aborted.
    ///
    /// Periodic modes take actions only: a per-tick value has nowhere to
    /// surface. Requires a scheduler-capable runner.
    pub fn schedule_at_fixed_rate<Op, Fut>(
        &self,
        op: Op,
        initial_delay: Duration,
        period: Duration,
    ) -> Option<JoinHandle<()>>
    where
        Op: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let scheduler = self.scheduler_for("schedule_at_fixed_rate")?;
        Some(scheduler.schedule_at_fixed_rate(initial_delay, period, self.periodic_task(op)))
    }

    /// Run an action periodically, waiting `delay` between the end of one
    /// tick and the start of the next. Otherwise as
    /// [`schedule_at_fixed_rate`](Self::schedule_at_fixed_rate).
    pub fn schedule_with_fixed_delay<Op, Fut>(
        &self,
        op: Op,
        initial_delay: Duration,
        delay: Duration,
    ) -> Option<JoinHandle<()>>
    where
        Op: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let scheduler = self.scheduler_for("schedule_with_fixed_delay")?;
        Some(scheduler.schedule_with_fixed_delay(initial_delay, delay, self.periodic_task(op)))
    }

    fn runner_for(&self, mode: &'static str) -> Option<&Arc<dyn TaskRunner>> {
        let runner = self.runner.as_ref();
        if runner.is_none() {
            report(ConfigError::MissingRunner { mode });
        }
        runner
    }

    fn scheduler_for(&self, mode: &'static str) -> Option<&dyn Scheduler> {
        let scheduler = self.runner_for(mode)?.scheduler();
        if scheduler.is_none() {
            report(ConfigError::MissingScheduler { mode });
        }
        scheduler
    }

    /// One factory invocation per tick. The shared work closure sits behind
    /// an async mutex because each tick's loop holds it across awaits; ticks
    /// of one schedule never overlap, so the lock is uncontended.
    fn periodic_task<Op, Fut>(&self, op: Op) -> TaskFactory
    where
        Op: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let this = self.clone();
        let op = Arc::new(tokio::sync::Mutex::new(op));
        Box::new(move || {
            let this = this.clone();
            let op = Arc::clone(&op);
            Box::pin(async move {
                let mut op = op.lock().await;
                this.drive_action(&mut *op).await;
            })
        })
    }

    /// The retry state machine for value-producing work.
    async fn drive_computation<Op, Fut>(&self, op: &mut Op)
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: usize = 0;
        loop {
            match op().await {
                Ok(value) => {
                    match &self.on_success {
                        Some(SuccessHandler::WithValue(on_success)) => on_success(value),
                        Some(SuccessHandler::NoValue(_)) => {
                            report(ConfigError::UnitCallbackOnComputation);
                        }
                        None => {}
                    }
                    return;
                }
                Err(failure) => {
                    if !self.next_attempt(attempt, failure) {
                        return;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// The retry state machine for side-effecting work.
    async fn drive_action<Op, Fut>(&self, op: &mut Op)
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let mut attempt: usize = 0;
        loop {
            match op().await {
                Ok(()) => {
                    match &self.on_success {
                        Some(SuccessHandler::NoValue(on_success)) => on_success(),
                        Some(SuccessHandler::WithValue(_)) => {
                            report(ConfigError::ValueCallbackOnAction);
                        }
                        None => {}
                    }
                    return;
                }
                Err(failure) => {
                    if !self.next_attempt(attempt, failure) {
                        return;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Decide the fate of a failed attempt. Terminal failures are delivered
    /// here; `true` means the loop should run the work again.
    fn next_attempt(&self, attempt: usize, failure: E) -> bool {
        if !self.predicate.test(&failure) {
            tracing::debug!(%failure, "failure not retryable");
            self.fail(failure);
            return false;
        }
        if !self.budget.allows(attempt) {
            tracing::debug!(%failure, attempt, "retry budget exhausted");
            self.fail(failure);
            return false;
        }
        tracing::debug!(%failure, attempt, "retrying");
        if let Some(on_retry) = &self.on_retry {
            on_retry(attempt, failure);
        }
        true
    }

    fn fail(&self, failure: E) {
        if let Some(on_failure) = &self.on_failure {
            on_failure(failure);
        }
    }
}

/// Fluent, order-independent configuration for [`RetryExecutor`].
pub struct RetryExecutorBuilder<T, E> {
    budget: RetryBudget,
    predicate: RetryPredicate<E>,
    on_success: Option<SuccessHandler<T>>,
    on_retry: Option<OnRetry<E>>,
    on_failure: Option<OnFailure<E>>,
    runner: Option<Arc<dyn TaskRunner>>,
}

impl<T, E> RetryExecutorBuilder<T, E>
where
    T: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    /// Create a builder with defaults.
    pub fn new() -> Self {
        Self {
            budget: RetryBudget::Unlimited,
            predicate: RetryPredicate::any(),
            on_success: None,
            on_retry: None,
            on_failure: None,
            runner: None,
        }
    }

    /// Retry at most `count` times after the initial attempt.
    ///
    /// The absolute value is taken; negative counts have no meaning of their
    /// own.
    pub fn retry_count(mut self, count: i32) -> Self {
        self.budget = RetryBudget::limited(count);
        self
    }

    /// Set the budget directly, e.g. [`RetryBudget::Unlimited`].
    pub fn retry_budget(mut self, budget: RetryBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Retry only failures whose kind matches, or is a sub-kind of, an entry
    /// in `kinds`. An empty set retries on everything.
    pub fn retry_on<I>(self, kinds: I) -> Self
    where
        E: Kinded,
        I: IntoIterator<Item = E::Kind>,
    {
        self.predicate(RetryPredicate::for_kinds(kinds))
    }

    /// Retry only failures the closure approves.
    pub fn retry_if<F>(self, f: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicate(RetryPredicate::from_fn(f))
    }

    /// Set the retry predicate directly.
    pub fn predicate(mut self, predicate: RetryPredicate<E>) -> Self {
        self.predicate = predicate;
        self
    }

    /// Success callback for computations; receives the produced value.
    /// Replaces any previously set success callback.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.on_success = Some(SuccessHandler::with_value(f));
        self
    }

    /// Success callback for actions; receives nothing. Replaces any
    /// previously set success callback.
    pub fn on_success_unit<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_success = Some(SuccessHandler::no_value(f));
        self
    }

    /// Callback fired before each re-run with the zero-based attempt index
    /// and the failure that triggered it.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, E) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(f));
        self
    }

    /// Callback fired with the terminal failure, whether non-retryable or
    /// budget-exhausted.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(f));
        self
    }

    /// Execution context for the background and scheduled modes.
    pub fn with_runner(mut self, runner: Arc<dyn TaskRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Freeze the configuration.
    ///
    /// Infallible: budgets are pre-normalized and the predicate always has a
    /// default.
    pub fn build(self) -> RetryExecutor<T, E> {
        RetryExecutor {
            budget: self.budget,
            predicate: self.predicate,
            on_success: self.on_success,
            on_retry: self.on_retry,
            on_failure: self.on_failure,
            runner: self.runner,
        }
    }
}

impl<T, E> Default for RetryExecutorBuilder<T, E>
where
    T: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Transport,
        Timeout,
        Protocol,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TestError {
        kind: Kind,
        message: &'static str,
    }

    impl TestError {
        fn new(kind: Kind, message: &'static str) -> Self {
            Self { kind, message }
        }
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "TestError: {}", self.message)
        }
    }

    impl std::error::Error for TestError {}

    impl Kinded for TestError {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            self.kind
        }

        // Timeout counts as a kind of transport trouble.
        fn is_subkind(kind: Kind, ancestor: Kind) -> bool {
            kind == ancestor || (ancestor == Kind::Transport && kind == Kind::Timeout)
        }
    }

    /// Capture of every callback firing across one or more invocations.
    #[derive(Default)]
    struct Observed {
        values: Mutex<Vec<u32>>,
        unit_successes: AtomicUsize,
        retries: Mutex<Vec<usize>>,
        failures: Mutex<Vec<TestError>>,
    }

    fn observed_executor(
        budget: RetryBudget,
        observed: &Arc<Observed>,
    ) -> RetryExecutor<u32, TestError> {
        let on_success = observed.clone();
        let on_retry = observed.clone();
        let on_failure = observed.clone();
        RetryExecutor::builder()
            .retry_budget(budget)
            .on_success(move |value| on_success.values.lock().unwrap().push(value))
            .on_retry(move |attempt, _| on_retry.retries.lock().unwrap().push(attempt))
            .on_failure(move |failure| on_failure.failures.lock().unwrap().push(failure))
            .build()
    }

    #[tokio::test]
    async fn success_on_first_attempt_runs_once() {
        let observed = Arc::new(Observed::default());
        let executor = observed_executor(RetryBudget::limited(3), &observed);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        executor
            .call(move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*observed.values.lock().unwrap(), vec![42]);
        assert!(observed.retries.lock().unwrap().is_empty());
        assert!(observed.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn budget_bounds_total_invocations() {
        let observed = Arc::new(Observed::default());
        let executor = observed_executor(RetryBudget::limited(3), &observed);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        executor
            .call(move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(TestError::new(Kind::Transport, "always down"))
                }
            })
            .await;

        // Budget 3: initial attempt plus exactly 3 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(*observed.retries.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(observed.failures.lock().unwrap().len(), 1);
        assert!(observed.values.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_budget_means_single_attempt() {
        let observed = Arc::new(Observed::default());
        let executor = observed_executor(RetryBudget::limited(0), &observed);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        executor
            .call(move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(TestError::new(Kind::Transport, "down"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(observed.retries.lock().unwrap().is_empty());
        assert_eq!(observed.failures.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn negative_budget_behaves_like_its_absolute_value() {
        let observed = Arc::new(Observed::default());
        let on_retry = observed.clone();
        let executor = RetryExecutor::<u32, TestError>::builder()
            .retry_count(-3)
            .on_retry(move |attempt, _| on_retry.retries.lock().unwrap().push(attempt))
            .build();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        executor
            .call(move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(TestError::new(Kind::Transport, "down"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(*observed.retries.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn unlimited_budget_retries_until_success() {
        let observed = Arc::new(Observed::default());
        let executor = observed_executor(RetryBudget::Unlimited, &observed);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        executor
            .call(move || {
                let calls = calls_clone.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 5 {
                        Err(TestError::new(Kind::Transport, "warming up"))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(*observed.retries.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(*observed.values.lock().unwrap(), vec![7]);
        assert!(observed.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_retryable_failure_short_circuits() {
        let observed = Arc::new(Observed::default());
        let on_retry = observed.clone();
        let on_failure = observed.clone();
        let executor = RetryExecutor::<u32, TestError>::builder()
            .retry_count(5)
            .retry_on([Kind::Transport])
            .on_retry(move |attempt, _| on_retry.retries.lock().unwrap().push(attempt))
            .on_failure(move |failure| on_failure.failures.lock().unwrap().push(failure))
            .build();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        executor
            .call(move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(TestError::new(Kind::Protocol, "bad frame"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(observed.retries.lock().unwrap().is_empty());
        let failures = observed.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, Kind::Protocol);
    }

    #[tokio::test]
    async fn subkind_failures_are_retried() {
        let observed = Arc::new(Observed::default());
        let on_retry = observed.clone();
        let executor = RetryExecutor::<u32, TestError>::builder()
            .retry_count(2)
            .retry_on([Kind::Transport])
            .on_retry(move |attempt, _| on_retry.retries.lock().unwrap().push(attempt))
            .build();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        executor
            .call(move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(TestError::new(Kind::Timeout, "slow peer"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*observed.retries.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn retry_if_predicate_gates_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let executor = RetryExecutor::<u32, TestError>::builder()
            .retry_count(5)
            .retry_if(|failure| failure.message.contains("transient"))
            .build();

        executor
            .call(move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(TestError::new(Kind::Transport, "fatal"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1, "should not retry");
    }

    #[tokio::test]
    async fn produced_value_arrives_unchanged() {
        let observed = Arc::new(Observed::default());
        let executor = observed_executor(RetryBudget::limited(1), &observed);

        executor.call(|| async { Ok(31_337) }).await;

        assert_eq!(*observed.values.lock().unwrap(), vec![31_337]);
    }

    #[tokio::test]
    async fn unit_callback_never_sees_a_computation() {
        let observed = Arc::new(Observed::default());
        let on_success = observed.clone();
        let executor = RetryExecutor::<u32, TestError>::builder()
            .on_success_unit(move || {
                on_success.unit_successes.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        executor.call(|| async { Ok(42) }).await;

        // The wrong-shaped callback is skipped rather than losing the value.
        assert_eq!(observed.unit_successes.load(Ordering::SeqCst), 0);
        assert!(observed.values.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn value_callback_never_fires_for_an_action() {
        let observed = Arc::new(Observed::default());
        let on_success = observed.clone();
        let executor = RetryExecutor::<u32, TestError>::builder()
            .on_success(move |value| on_success.values.lock().unwrap().push(value))
            .build();

        executor.run(|| async { Ok(()) }).await;

        assert!(observed.values.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn action_success_fires_unit_callback() {
        let observed = Arc::new(Observed::default());
        let on_success = observed.clone();
        let on_retry = observed.clone();
        let executor = RetryExecutor::<u32, TestError>::builder()
            .retry_count(3)
            .on_success_unit(move || {
                on_success.unit_successes.fetch_add(1, Ordering::SeqCst);
            })
            .on_retry(move |attempt, _| on_retry.retries.lock().unwrap().push(attempt))
            .build();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        executor
            .run(move || {
                let calls = calls_clone.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError::new(Kind::Transport, "not yet"))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(observed.unit_successes.load(Ordering::SeqCst), 1);
        assert_eq!(*observed.retries.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn last_success_callback_wins() {
        let observed = Arc::new(Observed::default());
        let on_unit = observed.clone();
        let on_value = observed.clone();
        let executor = RetryExecutor::<u32, TestError>::builder()
            .on_success_unit(move || {
                on_unit.unit_successes.fetch_add(1, Ordering::SeqCst);
            })
            .on_success(move |value| on_value.values.lock().unwrap().push(value))
            .build();

        executor.call(|| async { Ok(9) }).await;

        assert_eq!(*observed.values.lock().unwrap(), vec![9]);
        assert_eq!(observed.unit_successes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn executor_is_reusable_with_fresh_counters() {
        let observed = Arc::new(Observed::default());
        let executor = observed_executor(RetryBudget::limited(1), &observed);

        for _ in 0..2 {
            let calls = Arc::new(AtomicUsize::new(0));
            let calls_clone = calls.clone();
            executor
                .call(move || {
                    let calls = calls_clone.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err::<u32, _>(TestError::new(Kind::Transport, "down"))
                    }
                })
                .await;
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }

        // Two invocations, each: one retry at index 0, one terminal failure.
        assert_eq!(*observed.retries.lock().unwrap(), vec![0, 0]);
        assert_eq!(observed.failures.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn terminal_failure_carries_the_last_error() {
        let observed = Arc::new(Observed::default());
        let executor = observed_executor(RetryBudget::limited(1), &observed);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        executor
            .call(move || {
                let calls = calls_clone.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    let message = if n == 0 { "first" } else { "second" };
                    Err::<u32, _>(TestError::new(Kind::Transport, message))
                }
            })
            .await;

        let failures = observed.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].message, "second");
    }
}
