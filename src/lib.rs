//! AgentWatch - change notifications for LLM-agent telemetry
//!
//! Polls an embedded SQL store of agent telemetry (agents, sessions, events,
//! LLM usage, tool executions, security alerts) and pushes batches of new or
//! updated rows to in-process subscribers.

pub mod changes;
pub mod cli;
pub mod config;
pub mod logging;
pub mod store;
