//! Error types for query execution.

use thiserror::Error;

/// Errors surfaced by a [`QueryExecutor`](super::QueryExecutor).
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// The statement referenced a table that does not exist
    #[error("no such table: {0}")]
    MissingTable(String),

    /// The statement failed to prepare or execute
    #[error("SQL error: {0}")]
    Sql(String),

    /// The store could not be opened or the connection is unusable
    #[error("connection error: {0}")]
    Connection(String),

    /// The blocking worker running the statement failed
    #[error("query worker failed: {0}")]
    Worker(String),
}

impl From<rusqlite::Error> for QueryError {
    fn from(e: rusqlite::Error) -> Self {
        let message = e.to_string();
        match message.strip_prefix("no such table: ") {
            Some(table) => QueryError::MissingTable(table.to_string()),
            None => QueryError::Sql(message),
        }
    }
}
