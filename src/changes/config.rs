//! Configuration for change polling.

use super::category::EntityCategory;
use super::detector::DEFAULT_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest accepted polling interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for the polling scheduler and change detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Whether polling starts with the process
    pub enabled: bool,
    /// Milliseconds between the end of one tick and the start of the next
    pub interval_ms: u64,
    /// Maximum rows returned per category per tick
    pub batch_size: usize,
    /// Skip rows that already exist when polling first starts
    pub prime_on_start: bool,
    /// Categories to watch; always checked in canonical order
    pub categories: Vec<EntityCategory>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 2000,
            batch_size: DEFAULT_BATCH_SIZE,
            prime_on_start: true,
            categories: EntityCategory::ALL.to_vec(),
        }
    }
}

impl PollingConfig {
    /// Configured interval, clamped to [`MIN_POLL_INTERVAL`].
    pub fn interval(&self) -> Duration {
        clamp_interval(Duration::from_millis(self.interval_ms))
    }

    /// Registered categories, deduplicated, in tick order.
    pub fn ordered_categories(&self) -> Vec<EntityCategory> {
        let mut categories = self.categories.clone();
        categories.sort();
        categories.dedup();
        categories
    }
}

pub(crate) fn clamp_interval(interval: Duration) -> Duration {
    if interval < MIN_POLL_INTERVAL {
        tracing::warn!(
            requested_ms = interval.as_millis() as u64,
            interval_ms = MIN_POLL_INTERVAL.as_millis() as u64,
            "Polling interval too short, clamping"
        );
        MIN_POLL_INTERVAL
    } else {
        interval
    }
}
