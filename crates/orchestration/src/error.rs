//! Orchestration error types.

use providers::ProviderError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during orchestration operations.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The operation is illegal given current order/request state.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown order or request id.
    #[error("not found: {0}")]
    NotFound(String),

    /// A vendor call failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for orchestration results.
pub type Result<T> = std::result::Result<T, OrchestrationError>;
