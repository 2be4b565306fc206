//! Shared types used across the fulfillment platform.

mod money;
mod types;

pub use money::Money;
pub use types::{EventId, OrderId, RequestId, StoreId, UserId};
