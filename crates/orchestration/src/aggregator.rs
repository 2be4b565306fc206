//! Order-level status aggregation.

use common::OrderId;
use domain::{FulfillmentStatus, OrderStatus};
use store::{FulfillmentStore, OrderRepository};

use crate::error::Result;

/// Folds a set of fulfillment request statuses into one order status.
///
/// Precedence: all delivered, then all shipped-or-delivered, then all
/// cancelled, otherwise processing. There are no partial-credit states;
/// a single `failed` or `pending` request holds the whole order at
/// `processing`. Returns `None` for an empty set (no-op).
pub fn aggregate(statuses: &[FulfillmentStatus]) -> Option<OrderStatus> {
    if statuses.is_empty() {
        return None;
    }

    use FulfillmentStatus::*;
    if statuses.iter().all(|s| *s == Delivered) {
        Some(OrderStatus::Delivered)
    } else if statuses.iter().all(|s| matches!(s, Shipped | Delivered)) {
        Some(OrderStatus::Shipped)
    } else if statuses.iter().all(|s| *s == Cancelled) {
        Some(OrderStatus::Cancelled)
    } else {
        Some(OrderStatus::Processing)
    }
}

/// Re-derives and writes an order's status from its current requests.
#[derive(Clone)]
pub struct OrderAggregator<S, O> {
    store: S,
    orders: O,
}

impl<S, O> OrderAggregator<S, O>
where
    S: FulfillmentStore,
    O: OrderRepository,
{
    pub fn new(store: S, orders: O) -> Self {
        Self { store, orders }
    }

    /// Recomputes the order status from the full request set and writes
    /// it through the order repository. No-op for an order with zero
    /// fulfillment requests.
    pub async fn recompute(&self, order_id: OrderId) -> Result<Option<OrderStatus>> {
        let requests = self.store.find_by_order(order_id).await?;
        let statuses: Vec<FulfillmentStatus> = requests.iter().map(|r| r.status).collect();

        let Some(status) = aggregate(&statuses) else {
            return Ok(None);
        };

        self.orders.update_status(order_id, status).await?;
        tracing::debug!(%order_id, %status, "order status aggregated");
        Ok(Some(status))
    }
}
