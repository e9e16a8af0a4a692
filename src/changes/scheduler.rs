//! Polling loop: tick, sleep, repeat.
//!
//! One tokio task per running period. A tick checks every registered category
//! in order and holds the detector lock throughout, so no two ticks ever
//! overlap, even across a fast stop/start. The next sleep only begins once the
//! current tick has fully published.

use super::bus::NotificationBus;
use super::category::EntityCategory;
use super::detector::ChangeDetector;
use super::types::TickReport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Scheduler run state.
#[derive(Debug, Default)]
pub(crate) enum RunState {
    #[default]
    Stopped,
    Running {
        token: CancellationToken,
        generation: u64,
    },
}

/// State shared between the service handle and its polling task.
pub(crate) struct Shared {
    pub(crate) detector: tokio::sync::Mutex<ChangeDetector>,
    pub(crate) bus: NotificationBus,
    pub(crate) categories: Vec<EntityCategory>,
    pub(crate) interval: watch::Sender<Duration>,
    pub(crate) run: Mutex<RunState>,
    pub(crate) prime_on_start: bool,
    pub(crate) primed: AtomicBool,
}

impl Shared {
    pub(crate) fn run_state(&self) -> MutexGuard<'_, RunState> {
        self.run.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check every registered category once and publish non-empty batches.
    ///
    /// With a `gate`, detection stops at the first category after the gate is
    /// cancelled, and a batch detected while it was being cancelled is
    /// dropped rather than published.
    pub(crate) async fn tick(&self, gate: Option<&CancellationToken>) -> TickReport {
        let started = Instant::now();
        let is_stopped = || gate.is_some_and(CancellationToken::is_cancelled);

        let mut detector = self.detector.lock().await;
        let mut report = TickReport::default();

        for &category in &self.categories {
            if is_stopped() {
                break;
            }
            let batch = detector.detect(category).await;
            report.checked += 1;

            if batch.is_empty() {
                continue;
            }
            if is_stopped() {
                tracing::debug!(category = %category, rows = batch.len(), "Polling stopped, discarding batch");
                report.discarded += 1;
                continue;
            }
            report.changed += 1;
            report.rows += batch.len();
            self.bus.publish(&batch);
        }
        drop(detector);

        metrics::counter!("agentwatch_ticks_total").increment(1);
        metrics::histogram!("agentwatch_tick_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        report
    }

    async fn prime_once(&self) {
        if !self.prime_on_start || self.primed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut detector = self.detector.lock().await;
        for &category in &self.categories {
            detector.prime(category).await;
        }
    }
}

/// Returns the service to `Stopped` if the task ends without `stop()`,
/// e.g. when the runtime is torn down.
struct StopOnExit {
    shared: Arc<Shared>,
    generation: u64,
}

impl Drop for StopOnExit {
    fn drop(&mut self) {
        let mut run = self.shared.run_state();
        if matches!(*run, RunState::Running { generation, .. } if generation == self.generation) {
            *run = RunState::Stopped;
            tracing::debug!(generation = self.generation, "Polling task ended, marking stopped");
        }
    }
}

/// Body of the polling task for one running period.
pub(crate) async fn run_poll_loop(shared: Arc<Shared>, token: CancellationToken, generation: u64) {
    let _exit = StopOnExit {
        shared: Arc::clone(&shared),
        generation,
    };
    let mut interval_rx = shared.interval.subscribe();

    shared.prime_once().await;

    loop {
        if token.is_cancelled() {
            break;
        }

        let report = shared.tick(Some(&token)).await;
        tracing::debug!(
            checked = report.checked,
            changed = report.changed,
            rows = report.rows,
            discarded = report.discarded,
            "Poll tick completed"
        );

        let period = *interval_rx.borrow_and_update();
        let sleep = tokio::time::sleep(period);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = &mut sleep => break,
                changed = interval_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let period = *interval_rx.borrow_and_update();
                    tracing::debug!(interval_ms = period.as_millis() as u64, "Rescheduling next tick");
                    sleep.as_mut().reset(tokio::time::Instant::now() + period);
                }
            }
        }
    }
}
