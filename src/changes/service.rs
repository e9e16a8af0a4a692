//! Owned change-notification service: lifecycle and subscriptions.

use super::bus::{NotificationBus, SubscriptionId};
use super::category::{Channel, EntityCategory};
use super::config::{clamp_interval, PollingConfig};
use super::detector::{ChangeDetector, Clock, SystemClock};
use super::error::ServiceError;
use super::scheduler::{run_poll_loop, RunState, Shared};
use super::types::{ChangeBatch, ConnectionStatus, TickReport};
use super::watermark::Watermark;
use crate::store::QueryExecutor;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Watches the registered categories and notifies subscribers of new rows.
///
/// Construct one per process at startup and pass it to whatever needs it.
/// Dropping the service cancels any running polling task.
///
/// # Examples
///
/// ```no_run
/// use agentwatch::changes::{ChangeService, Channel, PollingConfig};
/// use agentwatch::store::SqliteExecutor;
/// use std::sync::Arc;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let executor = Arc::new(SqliteExecutor::open(std::path::Path::new("agentwatch.db"))?);
/// let service = ChangeService::new(executor, &PollingConfig::default());
///
/// service.subscribe(Channel::All, |batch| {
///     println!("{} new {} rows", batch.len(), batch.category);
/// });
/// service.start()?;
/// # Ok(())
/// # }
/// ```
pub struct ChangeService {
    shared: Arc<Shared>,
    generation: AtomicU64,
}

impl ChangeService {
    pub fn new(executor: Arc<dyn QueryExecutor>, config: &PollingConfig) -> Self {
        Self::with_clock(executor, config, Arc::new(SystemClock))
    }

    /// Create a service with a custom time source (for testing).
    pub fn with_clock(
        executor: Arc<dyn QueryExecutor>,
        config: &PollingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let detector = ChangeDetector::new(executor, clock, config.batch_size);
        let (interval, _) = watch::channel(config.interval());

        Self {
            shared: Arc::new(Shared {
                detector: tokio::sync::Mutex::new(detector),
                bus: NotificationBus::new(),
                categories: config.ordered_categories(),
                interval,
                run: Mutex::new(RunState::Stopped),
                prime_on_start: config.prime_on_start,
                primed: AtomicBool::new(false),
            }),
            generation: AtomicU64::new(0),
        }
    }

    /// Begin polling. The first tick runs immediately.
    ///
    /// Calling `start` while already running does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NoRuntime`] when called outside a tokio runtime;
    /// the service stays stopped and `start` may be retried.
    pub fn start(&self) -> Result<(), ServiceError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ServiceError::NoRuntime)?;

        let (token, generation) = {
            let mut run = self.shared.run_state();
            if matches!(*run, RunState::Running { .. }) {
                return Ok(());
            }
            let token = CancellationToken::new();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *run = RunState::Running {
                token: token.clone(),
                generation,
            };
            (token, generation)
        };

        tracing::info!(
            interval_ms = self.interval().as_millis() as u64,
            categories = self.shared.categories.len(),
            "Change polling started"
        );
        self.shared.bus.publish_connectivity(ConnectionStatus::Connected);

        runtime.spawn(run_poll_loop(Arc::clone(&self.shared), token, generation));
        Ok(())
    }

    /// Stop polling.
    ///
    /// A detection already in flight is allowed to finish, but its batch is
    /// not published. Calling `stop` while stopped does nothing.
    pub fn stop(&self) {
        let token = {
            let mut run = self.shared.run_state();
            match std::mem::take(&mut *run) {
                RunState::Running { token, .. } => token,
                RunState::Stopped => return,
            }
        };
        token.cancel();

        tracing::info!("Change polling stopped");
        self.shared
            .bus
            .publish_connectivity(ConnectionStatus::Disconnected);
    }

    /// Change the polling interval.
    ///
    /// While running, the pending sleep is replaced by one of the new length;
    /// no extra tick is scheduled. Values below 100ms are clamped.
    pub fn set_interval(&self, interval: Duration) {
        let interval = clamp_interval(interval);
        self.shared.interval.send_replace(interval);
        tracing::info!(interval_ms = interval.as_millis() as u64, "Polling interval updated");
    }

    pub fn interval(&self) -> Duration {
        *self.shared.interval.borrow()
    }

    /// Whether polling is running.
    pub fn is_connected(&self) -> bool {
        matches!(*self.shared.run_state(), RunState::Running { .. })
    }

    /// Registered categories, in tick order.
    pub fn categories(&self) -> &[EntityCategory] {
        &self.shared.categories
    }

    pub fn subscribe<F>(&self, channel: impl Into<Channel>, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeBatch) + Send + Sync + 'static,
    {
        self.shared.bus.subscribe(channel, callback)
    }

    pub fn subscribe_connectivity<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.shared.bus.subscribe_connectivity(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.bus.unsubscribe(id)
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.shared.bus.subscriber_count(channel)
    }

    /// Current watermark for a category.
    ///
    /// Waits for any in-flight tick to finish.
    pub async fn watermark(&self, category: EntityCategory) -> Watermark {
        self.shared.detector.lock().await.watermark(category)
    }

    /// Run one tick now, regardless of run state, and publish what it finds.
    pub async fn tick_once(&self) -> TickReport {
        self.shared.tick(None).await
    }

    /// Stop polling and drop every subscription.
    pub fn shutdown(&self) {
        self.stop();
        self.shared.bus.clear();
        tracing::info!("Change service shut down");
    }
}

impl Drop for ChangeService {
    fn drop(&mut self) {
        if let RunState::Running { token, .. } = std::mem::take(&mut *self.shared.run_state()) {
            token.cancel();
        }
    }
}
