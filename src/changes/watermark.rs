//! Per-category "already observed" boundaries.

use super::category::{DetectionStrategy, EntityCategory};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

/// Boundary below which rows count as already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watermark {
    Timestamp(DateTime<Utc>),
    Identifier(i64),
}

impl Watermark {
    /// Starting boundary for a strategy: the present for timestamps, zero for ids.
    pub fn initial(strategy: DetectionStrategy, now: DateTime<Utc>) -> Self {
        match strategy {
            DetectionStrategy::Timestamp => Watermark::Timestamp(now),
            DetectionStrategy::Identifier => Watermark::Identifier(0),
        }
    }

    /// `Some(true)` if `self` is strictly past `other`; `None` when the kinds differ.
    fn is_past(&self, other: &Watermark) -> Option<bool> {
        match (self, other) {
            (Watermark::Timestamp(a), Watermark::Timestamp(b)) => Some(a > b),
            (Watermark::Identifier(a), Watermark::Identifier(b)) => Some(a > b),
            _ => None,
        }
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Watermark::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Watermark::Identifier(id) => write!(f, "#{}", id),
        }
    }
}

/// Watermarks for every category, seeded at construction.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    marks: HashMap<EntityCategory, Watermark>,
}

impl WatermarkStore {
    pub fn new(now: DateTime<Utc>) -> Self {
        let marks = EntityCategory::ALL
            .into_iter()
            .map(|c| (c, Watermark::initial(c.strategy(), now)))
            .collect();
        Self { marks }
    }

    pub fn get(&self, category: EntityCategory) -> Watermark {
        self.marks
            .get(&category)
            .copied()
            .unwrap_or_else(|| Watermark::initial(category.strategy(), Utc::now()))
    }

    /// Move the watermark forward to `observed`.
    ///
    /// Returns `true` only when it actually moved; an equal or older value, or
    /// one of the wrong kind, leaves it untouched.
    pub fn advance(&mut self, category: EntityCategory, observed: Watermark) -> bool {
        let current = self.get(category);
        match observed.is_past(&current) {
            Some(true) => {
                self.marks.insert(category, observed);
                true
            }
            Some(false) => false,
            None => {
                tracing::warn!(
                    category = %category,
                    current = %current,
                    observed = %observed,
                    "Ignoring watermark of mismatched kind"
                );
                false
            }
        }
    }

    /// Overwrite the watermark, bypassing the monotonic rule.
    ///
    /// Only used when priming a category to the store's present state.
    pub(crate) fn reset(&mut self, category: EntityCategory, value: Watermark) {
        self.marks.insert(category, value);
    }
}
