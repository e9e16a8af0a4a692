//! Embedded SQLite implementation of [`QueryExecutor`].

use super::{Params, QueryError, QueryExecutor, Row, SqlValue};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, ToSql};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Text layout used for timestamp parameters.
///
/// Matches `strftime('%Y-%m-%d %H:%M:%f', 'now')`. Only compares lexically
/// with columns stored in the same layout; detection queries wrap both sides
/// in `julianday()` instead.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Render a timestamp the way [`SqliteExecutor`] binds it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// SQLite-backed executor.
///
/// Statements run on tokio's blocking pool so the polling task only yields
/// while a query is in flight.
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    /// Open (or create) a database file.
    pub fn open(path: &Path) -> Result<Self, QueryError> {
        let conn = Connection::open(path)
            .map_err(|e| QueryError::Connection(format!("{}: {}", path.display(), e)))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        tracing::debug!(path = %path.display(), "Opened SQLite store");
        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, QueryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| QueryError::Connection(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a write statement and return the number of affected rows.
    pub async fn execute(&self, sql: &str, params: &Params) -> Result<usize, QueryError> {
        let sql = sql.to_string();
        let params = params.clone();
        self.with_connection(move |conn| {
            let bound = bind(&params);
            Ok(conn.execute(&sql, as_named(&bound).as_slice())?)
        })
        .await
    }

    /// Run several `;`-separated statements without parameters.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), QueryError> {
        let sql = sql.to_string();
        self.with_connection(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T, QueryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, QueryError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| QueryError::Connection("connection lock poisoned".to_string()))?;
            f(&*guard)
        })
        .await
        .map_err(|e| QueryError::Worker(e.to_string()))?
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn query_many(&self, sql: &str, params: &Params) -> Result<Vec<Row>, QueryError> {
        let sql = sql.to_string();
        let params = params.clone();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let columns: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();
            let bound = bind(&params);
            let mut rows = stmt.query(as_named(&bound).as_slice())?;

            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Row::new();
                for (i, name) in columns.iter().enumerate() {
                    record.insert(name.clone(), to_json(row.get_ref(i)?));
                }
                out.push(record);
            }
            Ok(out)
        })
        .await
    }
}

fn bind(params: &Params) -> Vec<(&'static str, Value)> {
    params
        .iter()
        .map(|(name, value)| {
            let value = match value {
                SqlValue::Null => Value::Null,
                SqlValue::Integer(i) => Value::Integer(*i),
                SqlValue::Real(f) => Value::Real(*f),
                SqlValue::Text(s) => Value::Text(s.clone()),
                SqlValue::Timestamp(ts) => Value::Text(format_timestamp(*ts)),
            };
            (*name, value)
        })
        .collect()
}

fn as_named<'a>(bound: &'a [(&'static str, Value)]) -> Vec<(&'static str, &'a dyn ToSql)> {
    bound
        .iter()
        .map(|(name, value)| (*name, value as &dyn ToSql))
        .collect()
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
        ValueRef::Blob(bytes) => {
            serde_json::Value::Array(bytes.iter().map(|b| serde_json::Value::from(*b)).collect())
        }
    }
}
