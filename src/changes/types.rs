//! Type definitions for change notifications

use super::category::EntityCategory;
use crate::store::Row;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rows newly observed for one category during one detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub category: EntityCategory,
    /// Rows in the detector's query order
    pub rows: Vec<Row>,
    pub observed_at: DateTime<Utc>,
}

impl ChangeBatch {
    pub fn empty(category: EntityCategory, observed_at: DateTime<Utc>) -> Self {
        Self {
            category,
            rows: Vec::new(),
            observed_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Live/stale signal emitted when polling starts or stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Outcome of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Categories queried
    pub checked: usize,
    /// Categories with a non-empty batch
    pub changed: usize,
    /// Rows across all batches
    pub rows: usize,
    /// Batches dropped because polling stopped mid-tick
    pub discarded: usize,
}
