//! Timer-driven pass runner.
//!
//! A [`Scheduler`] runs one pass as soon as it starts, then one pass per
//! interval until its [`CancellationToken`] fires. Passes run inline on the
//! scheduler task, so two passes never overlap. Ticks that come due while a
//! pass is still running collapse into a single catch-up pass instead of
//! queueing up.
//!
//! Cancellation is only observed between passes. A pass that is in flight
//! when the token fires runs to completion first.

use std::fmt;
use std::time::Duration;

use mdc_dataset::RecordSource;
use mdc_queue::Publisher;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::coordinator::BatchCoordinator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Running,
    /// Terminal. A stopped scheduler is never restarted.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerState {
    pub interval: Duration,
    pub phase: SchedulerPhase,
}

/// What caused a pass to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTrigger {
    Startup,
    Timer,
}

impl fmt::Display for PassTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassTrigger::Startup => write!(f, "startup"),
            PassTrigger::Timer => write!(f, "timer"),
        }
    }
}

/// Totals over the scheduler's lifetime, returned when it stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerReport {
    pub state: SchedulerState,
    pub passes: usize,
    pub failed_passes: usize,
    pub records_published: usize,
    pub publish_failures: usize,
}

pub struct Scheduler<S, P> {
    coordinator: BatchCoordinator<S, P>,
    state: SchedulerState,
}

impl<S, P> Scheduler<S, P>
where
    S: RecordSource + 'static,
    P: Publisher,
{
    /// Creates an idle scheduler.
    ///
    /// A zero `interval` cannot drive a timer and is replaced with
    /// [`mdc_core::DEFAULT_SCHEDULER_INTERVAL`].
    pub fn new(coordinator: BatchCoordinator<S, P>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            tracing::warn!(
                default = ?mdc_core::DEFAULT_SCHEDULER_INTERVAL,
                "scheduler: zero interval requested; using default"
            );
            mdc_core::DEFAULT_SCHEDULER_INTERVAL
        } else {
            interval
        };

        Self {
            coordinator,
            state: SchedulerState {
                interval,
                phase: SchedulerPhase::Idle,
            },
        }
    }

    #[must_use]
    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Runs passes until `cancel` fires, then returns the lifetime totals.
    ///
    /// The startup pass always runs, even if `cancel` has already fired.
    pub async fn run(mut self, cancel: CancellationToken) -> SchedulerReport {
        let period = self.state.interval;
        tracing::info!(interval = ?period, "scheduler: starting");
        self.transition(SchedulerPhase::Running);

        let mut report = SchedulerReport {
            state: self.state.clone(),
            passes: 0,
            failed_passes: 0,
            records_published: 0,
            publish_failures: 0,
        };

        self.run_pass(PassTrigger::Startup, &mut report).await;

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_pass(PassTrigger::Timer, &mut report).await;
                }
            }
        }

        drop(ticker);
        self.transition(SchedulerPhase::Stopped);
        tracing::info!(
            passes = report.passes,
            failed_passes = report.failed_passes,
            "scheduler: stopped"
        );

        report.state = self.state;
        report
    }

    async fn run_pass(&self, trigger: PassTrigger, report: &mut SchedulerReport) {
        tracing::info!(%trigger, "scheduler: triggered data processing");
        report.passes += 1;

        match self.coordinator.run_once().await {
            Ok(result) => {
                report.records_published += result.succeeded;
                report.publish_failures += result.failed();
            }
            Err(e) => {
                report.failed_passes += 1;
                tracing::error!(%trigger, error = %e, "scheduler: data processing failed");
            }
        }
    }

    fn transition(&mut self, next: SchedulerPhase) {
        tracing::debug!(from = ?self.state.phase, to = ?next, "scheduler: phase change");
        self.state.phase = next;
    }
}

impl<S, P> Scheduler<S, P>
where
    S: RecordSource + 'static,
    P: Publisher + 'static,
{
    /// Starts the scheduler on a background task.
    ///
    /// The returned handle owns the task; the host must await
    /// [`SchedulerHandle::shutdown`] (or [`SchedulerHandle::join`]) so the
    /// last in-flight pass is observed to completion.
    pub fn spawn(self, cancel: CancellationToken) -> SchedulerHandle {
        let task = tokio::spawn(self.run(cancel.clone()));
        SchedulerHandle { cancel, task }
    }
}

/// Owned handle to a running [`Scheduler`] task.
#[derive(Debug)]
pub struct SchedulerHandle {
    cancel: CancellationToken,
    task: JoinHandle<SchedulerReport>,
}

impl SchedulerHandle {
    /// Requests a stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Requests a stop and waits for the in-flight pass, if any, to finish.
    ///
    /// # Errors
    ///
    /// Returns [`JoinError`] if the scheduler task panicked.
    pub async fn shutdown(self) -> Result<SchedulerReport, JoinError> {
        self.cancel.cancel();
        self.task.await
    }

    /// Waits for the scheduler to stop on its own token.
    ///
    /// # Errors
    ///
    /// Returns [`JoinError`] if the scheduler task panicked.
    pub async fn join(self) -> Result<SchedulerReport, JoinError> {
        self.task.await
    }
}
