//! Shared helpers for AgentWatch integration tests.
//!
//! Builds a file-backed telemetry store with all six watched tables and
//! provides writers, a manual clock and subscriber collectors.

#![allow(dead_code)]

use agentwatch::changes::{ChangeBatch, ChangeService, Channel, Clock};
use agentwatch::store::{Params, SqlValue, SqliteExecutor};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// =============================================================================
// Store
// =============================================================================

pub const SCHEMA: &str = "
    CREATE TABLE agents (
        id TEXT PRIMARY KEY, name TEXT NOT NULL, status TEXT,
        created_at TEXT NOT NULL, updated_at TEXT NOT NULL
    );
    CREATE TABLE sessions (
        id TEXT PRIMARY KEY, agent_id TEXT NOT NULL, state TEXT,
        created_at TEXT NOT NULL, updated_at TEXT NOT NULL
    );
    CREATE TABLE events (
        id INTEGER PRIMARY KEY AUTOINCREMENT, session_id TEXT NOT NULL, kind TEXT NOT NULL
    );
    CREATE TABLE llm_usage (
        id INTEGER PRIMARY KEY AUTOINCREMENT, session_id TEXT NOT NULL,
        model TEXT NOT NULL, prompt_tokens INTEGER, completion_tokens INTEGER, cost REAL
    );
    CREATE TABLE tool_executions (
        id INTEGER PRIMARY KEY AUTOINCREMENT, session_id TEXT NOT NULL,
        tool TEXT NOT NULL, duration_ms INTEGER
    );
    CREATE TABLE security_alerts (
        id INTEGER PRIMARY KEY AUTOINCREMENT, severity TEXT NOT NULL, message TEXT,
        created_at TEXT NOT NULL, updated_at TEXT NOT NULL
    );
";

/// Telemetry database in a temporary directory.
pub struct TestStore {
    pub dir: TempDir,
    pub db: SqliteExecutor,
}

impl TestStore {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = SqliteExecutor::open(&dir.path().join("telemetry.db")).unwrap();
        db.execute_batch(SCHEMA).await.unwrap();
        Self { dir, db }
    }

    pub fn path(&self) -> std::path::PathBuf {
        self.dir.path().join("telemetry.db")
    }

    pub fn executor(&self) -> Arc<SqliteExecutor> {
        Arc::new(self.db.clone())
    }

    pub async fn add_events(&self, count: usize) {
        for _ in 0..count {
            self.db
                .execute(
                    "INSERT INTO events (session_id, kind) VALUES ('s1', 'step')",
                    &Vec::new(),
                )
                .await
                .unwrap();
        }
    }

    pub async fn add_usage(&self, model: &str, tokens: i64) {
        let params: Params = vec![
            (":model", SqlValue::from(model)),
            (":tokens", SqlValue::from(tokens)),
        ];
        self.db
            .execute(
                "INSERT INTO llm_usage (session_id, model, prompt_tokens, completion_tokens, cost)
                 VALUES ('s1', :model, :tokens, :tokens, 0.25)",
                &params,
            )
            .await
            .unwrap();
    }

    pub async fn add_tool_execution(&self, tool: &str) {
        let params: Params = vec![(":tool", SqlValue::from(tool))];
        self.db
            .execute(
                "INSERT INTO tool_executions (session_id, tool, duration_ms) VALUES ('s1', :tool, 12)",
                &params,
            )
            .await
            .unwrap();
    }

    pub async fn upsert_agent(&self, id: &str, created: DateTime<Utc>, updated: DateTime<Utc>) {
        let params: Params = vec![
            (":id", SqlValue::from(id)),
            (":created", SqlValue::from(created)),
            (":updated", SqlValue::from(updated)),
        ];
        self.db
            .execute(
                "INSERT INTO agents (id, name, status, created_at, updated_at)
                 VALUES (:id, :id, 'idle', :created, :updated)
                 ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at",
                &params,
            )
            .await
            .unwrap();
    }

    pub async fn raise_alert(&self, severity: &str, at: DateTime<Utc>) {
        let params: Params = vec![
            (":severity", SqlValue::from(severity)),
            (":at", SqlValue::from(at)),
        ];
        self.db
            .execute(
                "INSERT INTO security_alerts (severity, message, created_at, updated_at)
                 VALUES (:severity, 'prompt injection', :at, :at)",
                &params,
            )
            .await
            .unwrap();
    }
}

// =============================================================================
// Clock
// =============================================================================

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

// =============================================================================
// Subscribers
// =============================================================================

pub type Seen = Arc<Mutex<Vec<ChangeBatch>>>;

pub fn collect(service: &ChangeService, channel: impl Into<Channel>) -> Seen {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    service.subscribe(channel, move |batch| sink.lock().unwrap().push(batch.clone()));
    seen
}

pub fn ids(batch: &ChangeBatch) -> Vec<i64> {
    batch.rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
}

pub fn text_ids(batch: &ChangeBatch) -> Vec<String> {
    batch
        .rows
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}

/// Poll `condition` every 10ms for up to two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
