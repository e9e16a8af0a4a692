//! Error types for the change service.

use thiserror::Error;

/// Errors returned by [`ChangeService`](super::ChangeService) control calls.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// `start` was called outside a tokio runtime, so no timer is available
    #[error("no async runtime available to schedule polling")]
    NoRuntime,
}
