//! Order repository collaborator.
//!
//! The order aggregate is owned by the wider commerce platform; the
//! fulfillment core only reads it for cancellation preconditions and
//! writes its status through aggregation. Only the in-memory
//! implementation ships here.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;
use domain::{OrderRecord, OrderStatus};
use tokio::sync::RwLock;

use crate::error::Result;

/// Read/write access to the externally-owned order aggregate.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find(&self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()>;
}

/// In-memory order repository for testing and local runs.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, OrderRecord>>>,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an order record.
    pub async fn insert(&self, order: OrderRecord) {
        self.orders.write().await.insert(order.id, order);
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        let mut orders = self.orders.write().await;
        if let Some(order) = orders.get_mut(&order_id) {
            order.status = status;
            order.updated_at = Utc::now();
        }
        Ok(())
    }
}
