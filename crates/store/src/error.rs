//! Store error types.

use common::RequestId;
use domain::FulfillmentStatus;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted value could not be decoded into its domain type.
    #[error("corrupt row: {0}")]
    Decode(String),

    /// The fulfillment request does not exist.
    #[error("fulfillment request not found: {0}")]
    RequestNotFound(RequestId),

    /// The provider event does not exist.
    #[error("provider event not found")]
    EventNotFound,

    /// A status update outside the lifecycle table was rejected.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: FulfillmentStatus,
        to: FulfillmentStatus,
    },

    /// An attempt to overwrite an already-assigned external id.
    #[error("external id already set for request {0}")]
    ExternalIdAlreadySet(RequestId),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
