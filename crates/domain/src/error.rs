//! Domain error types.

use thiserror::Error;

/// Errors raised when parsing domain vocabulary from the wire.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An unrecognized provider identifier.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// An unrecognized status string.
    #[error("unknown status: {0}")]
    UnknownStatus(String),
}
