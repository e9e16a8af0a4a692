//! Data-access contract for the change-notification engine.
//!
//! The engine never talks to a database directly. It hands parameterized SQL to a
//! [`QueryExecutor`] and gets back rows as JSON maps. [`SqliteExecutor`] is the
//! embedded implementation used by the CLI; anything else (an HTTP-backed proxy,
//! a pooled client) only has to implement the trait.

mod error;
mod sqlite;

pub use error::*;
pub use sqlite::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A single result row: column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Ordered named parameters, e.g. `[(":watermark", ..), (":limit", ..)]`.
pub type Params = Vec<(&'static str, SqlValue)>;

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    /// Rendered by each executor in the textual format its tables use
    Timestamp(DateTime<Utc>),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

/// Runs read statements against the relational store.
///
/// Implementations must report a statement against a missing table as an
/// `Err` rather than panicking; the change detector recovers from it per
/// category.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run `sql` and return every row.
    async fn query_many(&self, sql: &str, params: &Params) -> Result<Vec<Row>, QueryError>;

    /// Run `sql` and return the first row, if any.
    async fn query_one(&self, sql: &str, params: &Params) -> Result<Option<Row>, QueryError> {
        Ok(self.query_many(sql, params).await?.into_iter().next())
    }
}
