//! The order as seen by fulfillment orchestration.

use chrono::{DateTime, Utc};
use common::{OrderId, StoreId, UserId};
use serde::{Deserialize, Serialize};

use crate::order_status::OrderStatus;

/// The slice of the externally-owned order aggregate this core reads.
///
/// Orchestration checks ownership and status for cancellation
/// preconditions, and writes status through order aggregation; nothing
/// else about the order is visible here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub store_id: StoreId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn new(id: OrderId, store_id: StoreId, user_id: UserId, status: OrderStatus) -> Self {
        Self {
            id,
            store_id,
            user_id,
            status,
            updated_at: Utc::now(),
        }
    }
}
