//! Incremental change detection and notification.
//!
//! The store offers no change feed, so changes are found by polling: every
//! tick, each watched category is queried for rows past its watermark, the
//! watermark advances, and non-empty batches are pushed to subscribers.
//!
//! ```text
//! tick ─► ChangeDetector::detect(category) ─► QueryExecutor
//!              │                                   │
//!              ▼                                   ▼
//!        WatermarkStore::advance  ◄──────────── rows
//!              │
//!              ▼
//!   NotificationBus::publish ─► category subscribers ─► catch-all subscribers
//! ```

mod bus;
mod category;
mod config;
mod detector;
mod error;
mod scheduler;
mod service;
mod types;
mod watermark;


pub use bus::*;
pub use category::*;
pub use config::{PollingConfig, MIN_POLL_INTERVAL};
pub use detector::*;
pub use error::*;
pub use service::*;
pub use types::*;
pub use watermark::*;
