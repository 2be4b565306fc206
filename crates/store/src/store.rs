//! The fulfillment store trait and its input types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventId, Money, OrderId, RequestId, StoreId};
use domain::{
    FulfillmentRequest, FulfillmentStatus, Provider, ProviderEvent, Shipment,
};
use uuid::Uuid;

use crate::error::Result;

/// Input for creating a fulfillment request with its items.
#[derive(Debug, Clone)]
pub struct NewFulfillmentRequest {
    pub store_id: StoreId,
    pub order_id: OrderId,
    pub provider: Provider,
    pub provider_mapping_id: Option<String>,
    pub items: Vec<NewRequestItem>,
    pub cost_estimate: Option<Money>,
    pub currency: String,
}

/// One order line quantity to assign to a new request.
#[derive(Debug, Clone)]
pub struct NewRequestItem {
    pub order_item_id: Uuid,
    pub sku: String,
    pub quantity: u32,
}

/// Extra fields written together with a status transition.
///
/// Only the fields a transition legitimately touches are here; anything
/// else on the request is immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    /// Assigns the provider's order id. Set at most once; a second
    /// assignment with a different value is rejected.
    pub external_id: Option<String>,
    /// Records an error message on the request.
    pub error_message: Option<String>,
    /// Clears any recorded error message (used on retry back to pending).
    pub clear_error: bool,
    pub cost_actual: Option<Money>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    /// A transition with no extra fields.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn clearing_error(mut self) -> Self {
        self.clear_error = true;
        self
    }

    pub fn with_cost_actual(mut self, cost: Money) -> Self {
        self.cost_actual = Some(cost);
        self
    }

    pub fn with_submitted_at(mut self, at: DateTime<Utc>) -> Self {
        self.submitted_at = Some(at);
        self
    }
}

/// Input for recording an inbound provider event.
#[derive(Debug, Clone)]
pub struct NewProviderEvent {
    pub provider: Provider,
    pub external_event_id: Option<String>,
    pub external_order_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
}

/// Input for recording a shipment.
#[derive(Debug, Clone)]
pub struct NewShipment {
    pub request_id: RequestId,
    pub order_id: OrderId,
    pub carrier: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub raw: Option<serde_json::Value>,
}

/// Persistence operations for fulfillment requests and their events.
#[async_trait]
pub trait FulfillmentStore: Send + Sync {
    /// Persists a request together with its items as one logical unit.
    /// The request starts in `pending`.
    async fn create_request(&self, new: NewFulfillmentRequest) -> Result<FulfillmentRequest>;

    async fn find_by_id(&self, id: RequestId) -> Result<Option<FulfillmentRequest>>;

    async fn find_by_order(&self, order_id: OrderId) -> Result<Vec<FulfillmentRequest>>;

    /// Looks up the request a provider event belongs to, by the
    /// provider's own order id.
    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> Result<Option<FulfillmentRequest>>;

    /// All requests for `provider` that are not in a terminal state,
    /// across stores. Used by the polling reconciler.
    async fn list_active_for_provider(&self, provider: Provider)
    -> Result<Vec<FulfillmentRequest>>;

    /// All requests in `status`, optionally filtered by provider.
    async fn list_by_status(
        &self,
        status: FulfillmentStatus,
        provider: Option<Provider>,
    ) -> Result<Vec<FulfillmentRequest>>;

    /// Applies a validated status transition.
    ///
    /// Rejects transitions outside the lifecycle table. Always stamps
    /// `updated_at`; stamps `completed_at` when the new status is
    /// `shipped` or `delivered`.
    async fn update_status(
        &self,
        id: RequestId,
        new_status: FulfillmentStatus,
        update: StatusUpdate,
    ) -> Result<FulfillmentRequest>;

    /// Records an inbound event. Returns `None` when an event with the
    /// same `(provider, external_event_id)` was already recorded; the
    /// insert is a no-op on conflict, never an overwrite.
    async fn insert_provider_event(&self, event: NewProviderEvent)
    -> Result<Option<ProviderEvent>>;

    /// Stamps `processed_at` on a recorded event.
    async fn mark_event_processed(&self, event_id: EventId) -> Result<()>;

    /// Records a shipment. Idempotent on `(request_id, tracking_number)`:
    /// re-inserting the same tracking number for a request returns the
    /// existing record instead of creating a second row. Webhooks without
    /// an event id bypass event dedup, so this is the shipment path's own
    /// at-most-once guard.
    async fn insert_shipment(&self, shipment: NewShipment) -> Result<Shipment>;
}
