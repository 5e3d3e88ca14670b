//! Task runners: where and when retry-wrapped work executes.
//!
//! The engine wraps a unit of work into a self-contained retry loop and
//! hands it to a runner. The runner decides thread-of-control and timing
//! only; retry logic never leaks into it. The runtime behind a runner is
//! created and shut down by the caller, not by this crate.
//!
//! Capabilities split in two: every runner can [`spawn`](TaskRunner::spawn),
//! and some additionally implement [`Scheduler`] for delayed and periodic
//! execution. Since `Scheduler: TaskRunner`, a scheduler is always also a
//! general-purpose worker.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::clock::{Clock, MonotonicClock};
use crate::sleeper::{Sleeper, TokioSleeper};

/// Builds one retry-wrapped run per periodic tick.
pub type TaskFactory = Box<dyn FnMut() -> BoxFuture<'static, ()> + Send>;

/// Base capability: run a wrapped task on some worker.
pub trait TaskRunner: Send + Sync + fmt::Debug {
    /// Hand the task to a worker and return its handle.
    ///
    /// The handle carries no value; outcomes are delivered through the
    /// executor's callbacks.
    fn spawn(&self, task: BoxFuture<'static, ()>) -> JoinHandle<()>;

    /// The scheduling extension, when this runner has one.
    fn scheduler(&self) -> Option<&dyn Scheduler> {
        None
    }
}

/// Extension capability: delayed and periodic execution.
pub trait Scheduler: TaskRunner {
    /// Run `task` once after `delay`. Aborting the handle before the delay
    /// elapses cancels the run.
    fn schedule_once(&self, delay: Duration, task: BoxFuture<'static, ()>) -> JoinHandle<()>;

    /// Run a fresh task per tick at `initial_delay`, `initial_delay +
    /// period`, `initial_delay + 2 * period`, … measured start-to-start,
    /// regardless of how long each run takes. Runs until the returned handle
    /// is aborted.
    fn schedule_at_fixed_rate(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: TaskFactory,
    ) -> JoinHandle<()>;

    /// Run a fresh task per tick, waiting `delay` between the end of one run
    /// and the start of the next. Runs until the returned handle is aborted.
    fn schedule_with_fixed_delay(
        &self,
        initial_delay: Duration,
        delay: Duration,
        task: TaskFactory,
    ) -> JoinHandle<()>;
}

/// Worker over a caller-owned tokio runtime.
///
/// Whether that runtime is single-threaded or a pool is the caller's choice;
/// the runner is indifferent.
#[derive(Debug, Clone)]
pub struct TokioRunner {
    handle: Handle,
}

impl TokioRunner {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Runner over the runtime of the calling context.
    ///
    /// Panics outside a tokio runtime, like [`Handle::current`].
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl TaskRunner for TokioRunner {
    fn spawn(&self, task: BoxFuture<'static, ()>) -> JoinHandle<()> {
        self.handle.spawn(task)
    }
}

/// Scheduler-capable worker over a caller-owned tokio runtime.
///
/// Waits go through a [`Sleeper`] and fixed-rate pacing through a [`Clock`],
/// both swappable so schedules can be exercised in tests without real time.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(MonotonicClock::default()),
        }
    }

    /// Scheduler over the runtime of the calling context.
    ///
    /// Panics outside a tokio runtime, like [`Handle::current`].
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Provide a custom pacing clock.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }
}

impl TaskRunner for TokioScheduler {
    fn spawn(&self, task: BoxFuture<'static, ()>) -> JoinHandle<()> {
        self.handle.spawn(task)
    }

    fn scheduler(&self) -> Option<&dyn Scheduler> {
        Some(self)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, delay: Duration, task: BoxFuture<'static, ()>) -> JoinHandle<()> {
        let sleeper = self.sleeper.clone();
        self.handle.spawn(async move {
            sleeper.sleep(delay).await;
            task.await;
        })
    }

    fn schedule_at_fixed_rate(
        &self,
        initial_delay: Duration,
        period: Duration,
        mut task: TaskFactory,
    ) -> JoinHandle<()> {
        let sleeper = self.sleeper.clone();
        let clock = self.clock.clone();
        self.handle.spawn(async move {
            let start = clock.now();
            let mut tick: u32 = 0;
            loop {
                // Absolute target keeps the start-to-start cadence even when
                // a run overshoots its slot.
                let target = start + initial_delay + period.saturating_mul(tick);
                sleeper.sleep(target.saturating_sub(clock.now())).await;
                task().await;
                tick = tick.saturating_add(1);
            }
        })
    }

    fn schedule_with_fixed_delay(
        &self,
        initial_delay: Duration,
        delay: Duration,
        mut task: TaskFactory,
    ) -> JoinHandle<()> {
        let sleeper = self.sleeper.clone();
        self.handle.spawn(async move {
            sleeper.sleep(initial_delay).await;
            loop {
                task().await;
                sleeper.sleep(delay).await;
            }
        })
    }
}
