//! Provider event records and the inbound event shape.

use chrono::{DateTime, Utc};
use common::EventId;
use serde::{Deserialize, Serialize};

use crate::provider::Provider;
use crate::status::FulfillmentStatus;

/// A recorded inbound webhook or synthesized poll event.
///
/// `(provider, external_event_id)` is unique when the external id is
/// present; insertion is a no-op on conflict, which gives the router its
/// at-most-once processing guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub id: EventId,
    pub provider: Provider,
    /// The provider's event id, or a deterministically synthesized id
    /// for poll-derived events.
    pub external_event_id: Option<String>,
    pub external_order_id: String,
    pub event_type: String,
    /// The raw payload as received.
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
    /// Set once the router has finished acting on the event.
    pub processed_at: Option<DateTime<Utc>>,
}

/// An event entering the webhook router, before it is recorded.
///
/// Real webhooks and synthesized poll events use the same shape; only
/// their construction differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub provider: Provider,
    pub external_event_id: Option<String>,
    pub external_order_id: String,
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// The canonical status this event maps to, if any. An event with no
    /// mapped status (an unrecognized vendor code, say) is recorded but
    /// changes nothing.
    pub mapped_status: Option<FulfillmentStatus>,
    pub shipment: Option<ShipmentData>,
}

/// Shipment details carried on a shipping event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentData {
    pub carrier: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub raw: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_event_deserializes_with_optional_fields_absent() {
        let json = serde_json::json!({
            "provider": "printful",
            "external_order_id": "PF-100",
            "event_type": "package_shipped",
        });
        let event: InboundEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.provider, Provider::Printful);
        assert!(event.external_event_id.is_none());
        assert!(event.mapped_status.is_none());
        assert!(event.shipment.is_none());
        assert!(event.payload.is_null());
    }

    #[test]
    fn mapped_status_parses_canonical_names() {
        let json = serde_json::json!({
            "provider": "gooten",
            "external_event_id": "evt-1",
            "external_order_id": "G-7",
            "event_type": "status",
            "mapped_status": "cancel_requested",
        });
        let event: InboundEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.mapped_status, Some(FulfillmentStatus::CancelRequested));
    }
}
