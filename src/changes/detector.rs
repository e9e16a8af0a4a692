//! Watermark-bounded polling queries, one category at a time.

use super::category::{DetectionStrategy, EntityCategory};
use super::types::ChangeBatch;
use super::watermark::{Watermark, WatermarkStore};
use crate::store::{Params, QueryExecutor, Row, SqlValue};
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;

/// Default cap on rows returned by one detection query.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Source of "now" for timestamp watermarks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Finds rows past each category's watermark and advances it.
pub struct ChangeDetector {
    executor: Arc<dyn QueryExecutor>,
    clock: Arc<dyn Clock>,
    watermarks: WatermarkStore,
    batch_size: usize,
}

impl ChangeDetector {
    pub fn new(executor: Arc<dyn QueryExecutor>, clock: Arc<dyn Clock>, batch_size: usize) -> Self {
        let watermarks = WatermarkStore::new(clock.now());
        Self {
            executor,
            clock,
            watermarks,
            batch_size: batch_size.max(1),
        }
    }

    pub fn watermarks(&self) -> &WatermarkStore {
        &self.watermarks
    }

    pub fn watermark(&self, category: EntityCategory) -> Watermark {
        self.watermarks.get(category)
    }

    /// Return the rows that are new since the last call and advance the watermark.
    ///
    /// A failing query (missing table, bad SQL, lost connection) is logged and
    /// reported as an empty batch so other categories keep being checked.
    pub async fn detect(&mut self, category: EntityCategory) -> ChangeBatch {
        // Read before querying: rows written while the query runs are newer than this
        let observed_at = self.clock.now();
        let watermark = self.watermarks.get(category);
        let (sql, params) = detection_query(category, watermark, self.batch_size);

        let rows = match self.executor.query_many(&sql, &params).await {
            Ok(rows) => rows,
            Err(e) => {
                metrics::counter!("agentwatch_query_failures_total",
                    "category" => category.table()
                )
                .increment(1);
                tracing::warn!(
                    category = %category,
                    table = category.table(),
                    error = %e,
                    "Change query failed, reporting no changes"
                );
                Vec::new()
            }
        };

        if rows.is_empty() {
            return ChangeBatch::empty(category, observed_at);
        }

        let next = match category.strategy() {
            // Row timestamps are heterogeneous, so the boundary is simply "now"
            DetectionStrategy::Timestamp => Some(Watermark::Timestamp(observed_at)),
            DetectionStrategy::Identifier => max_id(&rows).map(Watermark::Identifier),
        };
        if let Some(next) = next {
            if self.watermarks.advance(category, next) {
                tracing::trace!(category = %category, watermark = %next, "Watermark advanced");
            }
        }

        metrics::counter!("agentwatch_detected_rows_total",
            "category" => category.table()
        )
        .increment(rows.len() as u64);
        tracing::debug!(category = %category, rows = rows.len(), "Detected changes");

        ChangeBatch {
            category,
            rows,
            observed_at,
        }
    }

    /// Move the watermark to the store's present state so existing rows are
    /// never reported.
    ///
    /// Timestamp categories jump to now; identifier categories jump to the
    /// table's current `MAX(id)`. If the table can't be read, or is empty, the
    /// identifier watermark is left as it was.
    pub async fn prime(&mut self, category: EntityCategory) {
        match category.strategy() {
            DetectionStrategy::Timestamp => {
                self.watermarks
                    .reset(category, Watermark::Timestamp(self.clock.now()));
            }
            DetectionStrategy::Identifier => {
                let sql = format!("SELECT MAX(id) AS max_id FROM {}", category.table());
                match self.executor.query_one(&sql, &Params::new()).await {
                    Ok(Some(row)) => {
                        if let Some(max) = row.get("max_id").and_then(serde_json::Value::as_i64) {
                            self.watermarks.reset(category, Watermark::Identifier(max));
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            category = %category,
                            table = category.table(),
                            error = %e,
                            "Could not prime watermark, keeping current value"
                        );
                    }
                }
            }
        }
        tracing::debug!(
            category = %category,
            watermark = %self.watermarks.get(category),
            "Primed watermark"
        );
    }
}

/// Build the bounded query for one category.
///
/// Timestamp columns are compared through `julianday()`, so space- and
/// `T`-separated layouts with or without fractional seconds all order
/// correctly. The watermark is floored to the whole second and compared
/// inclusively: a column stamped with second precision (`CURRENT_TIMESTAMP`)
/// cannot tell whether its write came before or after a sub-second
/// watermark, so such rows are reported again rather than lost.
pub fn detection_query(
    category: EntityCategory,
    watermark: Watermark,
    batch_size: usize,
) -> (String, Params) {
    let table = category.table();
    let limit = SqlValue::Integer(i64::try_from(batch_size).unwrap_or(i64::MAX));
    match watermark {
        Watermark::Timestamp(ts) => (
            format!(
                "SELECT * FROM {table} \
                 WHERE julianday(created_at) >= julianday(:watermark) \
                 OR julianday(updated_at) >= julianday(:watermark) \
                 ORDER BY id DESC LIMIT :limit"
            ),
            vec![
                (":watermark", SqlValue::Timestamp(ts.trunc_subsecs(0))),
                (":limit", limit),
            ],
        ),
        Watermark::Identifier(id) => (
            format!("SELECT * FROM {table} WHERE id > :watermark ORDER BY id ASC LIMIT :limit"),
            vec![(":watermark", SqlValue::Integer(id)), (":limit", limit)],
        ),
    }
}

fn max_id(rows: &[Row]) -> Option<i64> {
    rows.iter()
        .filter_map(|row| row.get("id").and_then(serde_json::Value::as_i64))
        .max()
}
