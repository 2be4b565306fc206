//! Fulfillment request and line item records.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, RequestId, StoreId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::provider::Provider;
use crate::status::FulfillmentStatus;

/// One provider-bound shipment unit fulfilling part or all of an order.
///
/// Created once at order placement in `pending` status; mutated only
/// through validated status transitions and the cost/external-id/error
/// updates tied to them. Immutable once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentRequest {
    pub id: RequestId,
    pub store_id: StoreId,
    pub order_id: OrderId,
    pub provider: Provider,
    /// The provider-side account/mapping id for this store, if any.
    pub provider_mapping_id: Option<String>,
    /// The provider's order id, assigned once on submission and never
    /// cleared. Idempotency key for all later lookups and webhook
    /// matching on (provider, external_id).
    pub external_id: Option<String>,
    pub status: FulfillmentStatus,
    /// Snapshot of the order line quantities submitted to the provider.
    pub items: Vec<FulfillmentRequestItem>,
    pub cost_estimate: Option<Money>,
    pub cost_actual: Option<Money>,
    pub shipping_cost: Option<Money>,
    pub tax: Option<Money>,
    pub currency: String,
    pub refund_id: Option<String>,
    pub refund_amount: Option<Money>,
    pub refund_status: Option<String>,
    pub error_message: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FulfillmentRequest {
    /// The amount to accrue into a refund for this request: actual cost
    /// when known, otherwise the estimate, otherwise zero.
    pub fn refundable_amount(&self) -> Money {
        self.cost_actual
            .or(self.cost_estimate)
            .unwrap_or_else(Money::zero)
    }
}

/// One order line quantity assigned to a fulfillment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentRequestItem {
    pub id: Uuid,
    pub request_id: RequestId,
    /// The order item this line fulfills.
    pub order_item_id: Uuid,
    /// The provider-side line id, once the provider has assigned one.
    pub provider_line_id: Option<String>,
    pub sku: String,
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(cost_actual: Option<Money>, cost_estimate: Option<Money>) -> FulfillmentRequest {
        let now = Utc::now();
        FulfillmentRequest {
            id: RequestId::new(),
            store_id: StoreId::new(),
            order_id: OrderId::new(),
            provider: Provider::Printful,
            provider_mapping_id: None,
            external_id: None,
            status: FulfillmentStatus::Pending,
            items: vec![],
            cost_estimate,
            cost_actual,
            shipping_cost: None,
            tax: None,
            currency: "USD".to_string(),
            refund_id: None,
            refund_amount: None,
            refund_status: None,
            error_message: None,
            submitted_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn refundable_prefers_actual_cost() {
        let r = request(Some(Money::from_cents(1200)), Some(Money::from_cents(1000)));
        assert_eq!(r.refundable_amount(), Money::from_cents(1200));
    }

    #[test]
    fn refundable_falls_back_to_estimate_then_zero() {
        let r = request(None, Some(Money::from_cents(1000)));
        assert_eq!(r.refundable_amount(), Money::from_cents(1000));

        let r = request(None, None);
        assert_eq!(r.refundable_amount(), Money::zero());
    }
}
