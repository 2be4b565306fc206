use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{EventId, OrderId, RequestId};
use domain::{
    FulfillmentRequest, FulfillmentRequestItem, FulfillmentStatus, Provider, ProviderEvent,
    Shipment,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{
    FulfillmentStore, NewFulfillmentRequest, NewProviderEvent, NewShipment, StatusUpdate,
};

#[derive(Default)]
struct State {
    requests: HashMap<RequestId, FulfillmentRequest>,
    events: HashMap<EventId, ProviderEvent>,
    // Mirrors the partial unique index on (provider, external_event_id).
    event_dedup: HashSet<(Provider, String)>,
    shipments: Vec<Shipment>,
}

/// In-memory fulfillment store for testing and local runs.
///
/// Provides the same interface and invariants as the PostgreSQL
/// implementation, including event dedup semantics.
#[derive(Clone, Default)]
pub struct InMemoryFulfillmentStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryFulfillmentStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of recorded provider events.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    /// Returns the total number of recorded shipments.
    pub async fn shipment_count(&self) -> usize {
        self.state.read().await.shipments.len()
    }

    /// Returns a recorded event by id.
    pub async fn get_event(&self, event_id: EventId) -> Option<ProviderEvent> {
        self.state.read().await.events.get(&event_id).cloned()
    }

    /// Returns all recorded shipments.
    pub async fn shipments(&self) -> Vec<Shipment> {
        self.state.read().await.shipments.clone()
    }
}

#[async_trait]
impl FulfillmentStore for InMemoryFulfillmentStore {
    async fn create_request(&self, new: NewFulfillmentRequest) -> Result<FulfillmentRequest> {
        let now = Utc::now();
        let id = RequestId::new();

        let items = new
            .items
            .into_iter()
            .map(|item| FulfillmentRequestItem {
                id: Uuid::new_v4(),
                request_id: id,
                order_item_id: item.order_item_id,
                provider_line_id: None,
                sku: item.sku,
                quantity: item.quantity,
            })
            .collect();

        let request = FulfillmentRequest {
            id,
            store_id: new.store_id,
            order_id: new.order_id,
            provider: new.provider,
            provider_mapping_id: new.provider_mapping_id,
            external_id: None,
            status: FulfillmentStatus::Pending,
            items,
            cost_estimate: new.cost_estimate,
            cost_actual: None,
            shipping_cost: None,
            tax: None,
            currency: new.currency,
            refund_id: None,
            refund_amount: None,
            refund_status: None,
            error_message: None,
            submitted_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.write().await;
        state.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<FulfillmentRequest>> {
        Ok(self.state.read().await.requests.get(&id).cloned())
    }

    async fn find_by_order(&self, order_id: OrderId) -> Result<Vec<FulfillmentRequest>> {
        let state = self.state.read().await;
        let mut requests: Vec<_> = state
            .requests
            .values()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> Result<Option<FulfillmentRequest>> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .values()
            .find(|r| r.provider == provider && r.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn list_active_for_provider(
        &self,
        provider: Provider,
    ) -> Result<Vec<FulfillmentRequest>> {
        let state = self.state.read().await;
        let mut requests: Vec<_> = state
            .requests
            .values()
            .filter(|r| r.provider == provider && !r.status.is_terminal())
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn list_by_status(
        &self,
        status: FulfillmentStatus,
        provider: Option<Provider>,
    ) -> Result<Vec<FulfillmentRequest>> {
        let state = self.state.read().await;
        let mut requests: Vec<_> = state
            .requests
            .values()
            .filter(|r| r.status == status && provider.is_none_or(|p| r.provider == p))
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn update_status(
        &self,
        id: RequestId,
        new_status: FulfillmentStatus,
        update: StatusUpdate,
    ) -> Result<FulfillmentRequest> {
        let mut state = self.state.write().await;
        let request = state
            .requests
            .get_mut(&id)
            .ok_or(StoreError::RequestNotFound(id))?;

        if !request.status.can_transition(new_status) {
            return Err(StoreError::InvalidTransition {
                from: request.status,
                to: new_status,
            });
        }

        if let Some(external_id) = update.external_id {
            match &request.external_id {
                None => request.external_id = Some(external_id),
                Some(existing) if *existing == external_id => {}
                Some(_) => return Err(StoreError::ExternalIdAlreadySet(id)),
            }
        }

        if update.clear_error {
            request.error_message = None;
        }
        if let Some(message) = update.error_message {
            request.error_message = Some(message);
        }
        if let Some(cost) = update.cost_actual {
            request.cost_actual = Some(cost);
        }
        if let Some(at) = update.submitted_at {
            request.submitted_at = Some(at);
        }

        request.status = new_status;
        request.updated_at = Utc::now();
        if matches!(
            new_status,
            FulfillmentStatus::Shipped | FulfillmentStatus::Delivered
        ) {
            request.completed_at = Some(request.updated_at);
        }

        Ok(request.clone())
    }

    async fn insert_provider_event(
        &self,
        event: NewProviderEvent,
    ) -> Result<Option<ProviderEvent>> {
        let mut state = self.state.write().await;

        if let Some(ref external_event_id) = event.external_event_id
            && !state
                .event_dedup
                .insert((event.provider, external_event_id.clone()))
        {
            return Ok(None);
        }

        let record = ProviderEvent {
            id: EventId::new(),
            provider: event.provider,
            external_event_id: event.external_event_id,
            external_order_id: event.external_order_id,
            event_type: event.event_type,
            payload: event.payload,
            received_at: Utc::now(),
            processed_at: None,
        };
        state.events.insert(record.id, record.clone());
        Ok(Some(record))
    }

    async fn mark_event_processed(&self, event_id: EventId) -> Result<()> {
        let mut state = self.state.write().await;
        let event = state
            .events
            .get_mut(&event_id)
            .ok_or(StoreError::EventNotFound)?;
        event.processed_at = Some(Utc::now());
        Ok(())
    }

    async fn insert_shipment(&self, shipment: NewShipment) -> Result<Shipment> {
        let mut state = self.state.write().await;

        if let Some(existing) = state.shipments.iter().find(|s| {
            s.request_id == shipment.request_id && s.tracking_number == shipment.tracking_number
        }) {
            tracing::debug!(request_id = %shipment.request_id, "shipment already recorded, skipping");
            return Ok(existing.clone());
        }

        let record = Shipment {
            id: Uuid::new_v4(),
            request_id: shipment.request_id,
            order_id: shipment.order_id,
            carrier: shipment.carrier,
            tracking_number: shipment.tracking_number,
            tracking_url: shipment.tracking_url,
            status: "shipped".to_string(),
            shipped_at: shipment.shipped_at,
            delivered_at: None,
            raw: shipment.raw,
            created_at: Utc::now(),
        };
        state.shipments.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use common::StoreId;

    use super::*;

    fn new_request(provider: Provider) -> NewFulfillmentRequest {
        NewFulfillmentRequest {
            store_id: StoreId::new(),
            order_id: OrderId::new(),
            provider,
            provider_mapping_id: None,
            items: vec![crate::store::NewRequestItem {
                order_item_id: Uuid::new_v4(),
                sku: "SKU-001".to_string(),
                quantity: 2,
            }],
            cost_estimate: Some(common::Money::from_cents(1500)),
            currency: "USD".to_string(),
        }
    }

    fn new_event(provider: Provider, event_id: &str, order_id: &str) -> NewProviderEvent {
        NewProviderEvent {
            provider,
            external_event_id: Some(event_id.to_string()),
            external_order_id: order_id.to_string(),
            event_type: "order_updated".to_string(),
            payload: serde_json::json!({"status": "Shipped"}),
        }
    }

    #[tokio::test]
    async fn create_starts_pending_with_items() {
        let store = InMemoryFulfillmentStore::new();
        let request = store
            .create_request(new_request(Provider::Printful))
            .await
            .unwrap();

        assert_eq!(request.status, FulfillmentStatus::Pending);
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].request_id, request.id);
        assert!(request.external_id.is_none());

        let found = store.find_by_id(request.id).await.unwrap().unwrap();
        assert_eq!(found.id, request.id);
    }

    #[tokio::test]
    async fn update_status_rejects_illegal_transition() {
        let store = InMemoryFulfillmentStore::new();
        let request = store
            .create_request(new_request(Provider::Printful))
            .await
            .unwrap();

        let result = store
            .update_status(request.id, FulfillmentStatus::Delivered, StatusUpdate::none())
            .await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidTransition {
                from: FulfillmentStatus::Pending,
                to: FulfillmentStatus::Delivered,
            })
        ));

        // Unchanged after the rejection.
        let found = store.find_by_id(request.id).await.unwrap().unwrap();
        assert_eq!(found.status, FulfillmentStatus::Pending);
    }

    #[tokio::test]
    async fn update_status_stamps_completed_at_on_shipped() {
        let store = InMemoryFulfillmentStore::new();
        let request = store
            .create_request(new_request(Provider::Printful))
            .await
            .unwrap();

        store
            .update_status(
                request.id,
                FulfillmentStatus::Submitted,
                StatusUpdate::none().with_external_id("PF-1"),
            )
            .await
            .unwrap();
        store
            .update_status(request.id, FulfillmentStatus::Processing, StatusUpdate::none())
            .await
            .unwrap();
        let shipped = store
            .update_status(request.id, FulfillmentStatus::Shipped, StatusUpdate::none())
            .await
            .unwrap();

        assert!(shipped.completed_at.is_some());
        assert_eq!(shipped.external_id.as_deref(), Some("PF-1"));
    }

    #[tokio::test]
    async fn external_id_is_set_at_most_once() {
        let store = InMemoryFulfillmentStore::new();
        let request = store
            .create_request(new_request(Provider::Gooten))
            .await
            .unwrap();

        store
            .update_status(
                request.id,
                FulfillmentStatus::Submitted,
                StatusUpdate::none().with_external_id("G-1"),
            )
            .await
            .unwrap();

        let result = store
            .update_status(
                request.id,
                FulfillmentStatus::Processing,
                StatusUpdate::none().with_external_id("G-2"),
            )
            .await;
        assert!(matches!(result, Err(StoreError::ExternalIdAlreadySet(_))));

        // Re-asserting the same value is a no-op, not a conflict.
        let updated = store
            .update_status(
                request.id,
                FulfillmentStatus::Processing,
                StatusUpdate::none().with_external_id("G-1"),
            )
            .await
            .unwrap();
        assert_eq!(updated.external_id.as_deref(), Some("G-1"));
    }

    #[tokio::test]
    async fn find_by_external_id_matches_provider_and_id() {
        let store = InMemoryFulfillmentStore::new();
        let request = store
            .create_request(new_request(Provider::Prodigi))
            .await
            .unwrap();
        store
            .update_status(
                request.id,
                FulfillmentStatus::Submitted,
                StatusUpdate::none().with_external_id("PRO-9"),
            )
            .await
            .unwrap();

        let found = store
            .find_by_external_id(Provider::Prodigi, "PRO-9")
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, request.id);

        // Same external id under a different provider does not match.
        let missing = store
            .find_by_external_id(Provider::Printful, "PRO-9")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn duplicate_event_insert_is_a_noop() {
        let store = InMemoryFulfillmentStore::new();

        let first = store
            .insert_provider_event(new_event(Provider::Printful, "evt-1", "PF-1"))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .insert_provider_event(new_event(Provider::Printful, "evt-1", "PF-1"))
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(store.event_count().await, 1);

        // Same event id under a different provider is a distinct event.
        let other = store
            .insert_provider_event(new_event(Provider::Gooten, "evt-1", "G-1"))
            .await
            .unwrap();
        assert!(other.is_some());
    }

    #[tokio::test]
    async fn events_without_external_id_are_never_deduped() {
        let store = InMemoryFulfillmentStore::new();
        let mut event = new_event(Provider::Gooten, "ignored", "G-1");
        event.external_event_id = None;

        assert!(store
            .insert_provider_event(event.clone())
            .await
            .unwrap()
            .is_some());
        assert!(store.insert_provider_event(event).await.unwrap().is_some());
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn repeated_shipment_insert_returns_existing_record() {
        let store = InMemoryFulfillmentStore::new();
        let request = store
            .create_request(new_request(Provider::Printful))
            .await
            .unwrap();

        let shipment = NewShipment {
            request_id: request.id,
            order_id: request.order_id,
            carrier: "USPS".to_string(),
            tracking_number: "9400-1".to_string(),
            tracking_url: None,
            shipped_at: None,
            raw: None,
        };
        let first = store.insert_shipment(shipment.clone()).await.unwrap();
        let second = store.insert_shipment(shipment).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(store.shipment_count().await, 1);

        // A different tracking number for the same request is a new row.
        store
            .insert_shipment(NewShipment {
                request_id: request.id,
                order_id: request.order_id,
                carrier: "USPS".to_string(),
                tracking_number: "9400-2".to_string(),
                tracking_url: None,
                shipped_at: None,
                raw: None,
            })
            .await
            .unwrap();
        assert_eq!(store.shipment_count().await, 2);
    }

    #[tokio::test]
    async fn mark_event_processed_stamps_timestamp() {
        let store = InMemoryFulfillmentStore::new();
        let event = store
            .insert_provider_event(new_event(Provider::Printful, "evt-2", "PF-2"))
            .await
            .unwrap()
            .unwrap();
        assert!(event.processed_at.is_none());

        store.mark_event_processed(event.id).await.unwrap();
        let stored = store.get_event(event.id).await.unwrap();
        assert!(stored.processed_at.is_some());
    }

    #[tokio::test]
    async fn list_by_status_filters_by_provider() {
        let store = InMemoryFulfillmentStore::new();
        let a = store
            .create_request(new_request(Provider::Printful))
            .await
            .unwrap();
        let b = store
            .create_request(new_request(Provider::Gooten))
            .await
            .unwrap();

        store
            .update_status(
                a.id,
                FulfillmentStatus::Failed,
                StatusUpdate::none().with_error("submit failed"),
            )
            .await
            .unwrap();
        store
            .update_status(
                b.id,
                FulfillmentStatus::Failed,
                StatusUpdate::none().with_error("submit failed"),
            )
            .await
            .unwrap();

        let all = store
            .list_by_status(FulfillmentStatus::Failed, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let gooten_only = store
            .list_by_status(FulfillmentStatus::Failed, Some(Provider::Gooten))
            .await
            .unwrap();
        assert_eq!(gooten_only.len(), 1);
        assert_eq!(gooten_only[0].id, b.id);
    }

    #[tokio::test]
    async fn list_active_excludes_terminal_requests() {
        let store = InMemoryFulfillmentStore::new();
        let active = store
            .create_request(new_request(Provider::Gooten))
            .await
            .unwrap();
        let done = store
            .create_request(new_request(Provider::Gooten))
            .await
            .unwrap();
        store
            .update_status(done.id, FulfillmentStatus::Cancelled, StatusUpdate::none())
            .await
            .unwrap();

        let listed = store
            .list_active_for_provider(Provider::Gooten)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, active.id);
    }
}
