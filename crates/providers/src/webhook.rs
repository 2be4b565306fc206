//! Normalizes raw vendor webhook payloads into inbound events.
//!
//! Each vendor posts a different JSON shape; this module extracts the
//! event id, the vendor's order id, and the status/tracking fields, and
//! maps the status through the same tables the polling clients use. The
//! raw payload travels along untouched for the event ledger.

use chrono::{DateTime, Utc};
use domain::{InboundEvent, Provider, ShipmentData};
use serde_json::Value;

use crate::error::ProviderError;
use crate::{gooten, printful, prodigi, shapeways};

fn missing(provider: Provider, field: &str) -> ProviderError {
    ProviderError::UnexpectedResponse {
        provider,
        message: format!("webhook payload missing {field}"),
    }
}

fn str_or_number(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(String::from)
        .or_else(|| value.as_i64().map(|n| n.to_string()))
}

/// Parses one raw webhook payload into the canonical inbound event.
///
/// Fails only when the vendor's order id cannot be found; an
/// unrecognized status or event type still yields an event (with no
/// mapped status) so it lands in the ledger.
pub fn parse(provider: Provider, payload: Value) -> Result<InboundEvent, ProviderError> {
    match provider {
        Provider::Printful => parse_printful(payload),
        Provider::Gooten => parse_gooten(payload),
        Provider::Prodigi => parse_prodigi(payload),
        Provider::Shapeways => parse_shapeways(payload),
    }
}

/// Printful: `{"type": "...", "data": {"order": {...}, "shipment": {...}}}`.
/// Printful webhooks carry no event id; dedup falls back to nothing and
/// re-deliveries are absorbed by the transition table instead.
fn parse_printful(payload: Value) -> Result<InboundEvent, ProviderError> {
    let provider = Provider::Printful;
    let order = &payload["data"]["order"];
    let external_order_id =
        str_or_number(&order["id"]).ok_or_else(|| missing(provider, "data.order.id"))?;
    let event_type = payload["type"].as_str().unwrap_or("unknown").to_string();

    let mapped_status = match event_type.as_str() {
        "package_shipped" => Some(domain::FulfillmentStatus::Shipped),
        "order_canceled" => Some(domain::FulfillmentStatus::Cancelled),
        "order_failed" => Some(domain::FulfillmentStatus::Failed),
        _ => order["status"].as_str().and_then(printful::map_status),
    };

    let shipment = payload["data"]["shipment"].as_object().and_then(|s| {
        Some(ShipmentData {
            carrier: s.get("carrier")?.as_str()?.to_string(),
            tracking_number: s.get("tracking_number")?.as_str()?.to_string(),
            tracking_url: s
                .get("tracking_url")
                .and_then(|v| v.as_str())
                .map(String::from),
            shipped_at: parse_timestamp(s.get("ship_date")),
            raw: Some(Value::Object(s.clone())),
        })
    });

    Ok(InboundEvent {
        provider,
        external_event_id: None,
        external_order_id,
        event_type,
        payload,
        mapped_status,
        shipment,
    })
}

/// Gooten: `{"Id": "...", "OrderId": "...", "Status": "...", ...}`.
fn parse_gooten(payload: Value) -> Result<InboundEvent, ProviderError> {
    let provider = Provider::Gooten;
    let external_order_id =
        str_or_number(&payload["OrderId"]).ok_or_else(|| missing(provider, "OrderId"))?;
    let status = payload["Status"].as_str();

    let shipment = payload["TrackingNumber"].as_str().map(|tracking| ShipmentData {
        carrier: payload["Carrier"].as_str().unwrap_or_default().to_string(),
        tracking_number: tracking.to_string(),
        tracking_url: payload["TrackingUrl"].as_str().map(String::from),
        shipped_at: None,
        raw: None,
    });

    Ok(InboundEvent {
        provider,
        external_event_id: str_or_number(&payload["Id"]),
        external_order_id,
        event_type: status.unwrap_or("unknown").to_string(),
        mapped_status: status.and_then(gooten::map_status),
        payload,
        shipment,
    })
}

/// Prodigi: `{"id": "...", "type": "...", "data": {"order": {"id": "...",
/// "status": {"stage": "..."}}}}` in their CloudEvents-style envelope.
fn parse_prodigi(payload: Value) -> Result<InboundEvent, ProviderError> {
    let provider = Provider::Prodigi;
    let order = &payload["data"]["order"];
    let external_order_id =
        str_or_number(&order["id"]).ok_or_else(|| missing(provider, "data.order.id"))?;
    let stage = order["status"]["stage"].as_str();

    let shipment = order["shipments"][0].as_object().and_then(|s| {
        Some(ShipmentData {
            carrier: s
                .get("carrier")
                .and_then(|c| c["name"].as_str())
                .unwrap_or_default()
                .to_string(),
            tracking_number: s.get("tracking")?.get("number")?.as_str()?.to_string(),
            tracking_url: s
                .get("tracking")
                .and_then(|t| t["url"].as_str())
                .map(String::from),
            shipped_at: parse_timestamp(s.get("dispatchDate")),
            raw: Some(Value::Object(s.clone())),
        })
    });

    Ok(InboundEvent {
        provider,
        external_event_id: payload["id"].as_str().map(String::from),
        external_order_id,
        event_type: payload["type"].as_str().unwrap_or("unknown").to_string(),
        mapped_status: stage.and_then(prodigi::map_status),
        payload,
        shipment,
    })
}

/// Shapeways: `{"id": "...", "event": "...", "order_id": "...",
/// "status": "...", "tracking": {...}}`.
fn parse_shapeways(payload: Value) -> Result<InboundEvent, ProviderError> {
    let provider = Provider::Shapeways;
    let external_order_id =
        str_or_number(&payload["order_id"]).ok_or_else(|| missing(provider, "order_id"))?;
    let status = payload["status"].as_str();

    let shipment = payload["tracking"].as_object().and_then(|t| {
        Some(ShipmentData {
            carrier: t
                .get("carrier")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            tracking_number: t.get("number")?.as_str()?.to_string(),
            tracking_url: t.get("url").and_then(|v| v.as_str()).map(String::from),
            shipped_at: None,
            raw: Some(Value::Object(t.clone())),
        })
    });

    Ok(InboundEvent {
        provider,
        external_event_id: str_or_number(&payload["id"]),
        external_order_id,
        event_type: payload["event"].as_str().unwrap_or("unknown").to_string(),
        mapped_status: status.and_then(shapeways::map_status),
        payload,
        shipment,
    })
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use domain::FulfillmentStatus;

    use super::*;

    #[test]
    fn printful_shipped_webhook() {
        let payload = serde_json::json!({
            "type": "package_shipped",
            "data": {
                "order": {"id": 12345, "status": "fulfilled"},
                "shipment": {
                    "carrier": "USPS",
                    "tracking_number": "9400-1",
                    "tracking_url": "https://tools.usps.com/9400-1",
                    "ship_date": "2026-03-01T12:00:00Z"
                }
            }
        });

        let event = parse(Provider::Printful, payload).unwrap();
        assert_eq!(event.external_order_id, "12345");
        assert_eq!(event.event_type, "package_shipped");
        assert_eq!(event.mapped_status, Some(FulfillmentStatus::Shipped));
        assert!(event.external_event_id.is_none());

        let shipment = event.shipment.unwrap();
        assert_eq!(shipment.carrier, "USPS");
        assert_eq!(shipment.tracking_number, "9400-1");
        assert!(shipment.shipped_at.is_some());
    }

    #[test]
    fn printful_status_webhook_maps_through_the_table() {
        let payload = serde_json::json!({
            "type": "order_updated",
            "data": {"order": {"id": "12345", "status": "inprocess"}}
        });

        let event = parse(Provider::Printful, payload).unwrap();
        assert_eq!(event.mapped_status, Some(FulfillmentStatus::Processing));
        assert!(event.shipment.is_none());
    }

    #[test]
    fn gooten_webhook_carries_event_id() {
        let payload = serde_json::json!({
            "Id": "evt-100",
            "OrderId": "G-42",
            "Status": "Shipped",
            "Carrier": "FedEx",
            "TrackingNumber": "FX-7",
        });

        let event = parse(Provider::Gooten, payload).unwrap();
        assert_eq!(event.external_event_id.as_deref(), Some("evt-100"));
        assert_eq!(event.external_order_id, "G-42");
        assert_eq!(event.mapped_status, Some(FulfillmentStatus::Shipped));
        assert_eq!(event.shipment.unwrap().tracking_number, "FX-7");
    }

    #[test]
    fn prodigi_stage_webhook() {
        let payload = serde_json::json!({
            "id": "evt-55",
            "type": "com.prodigi.order.status.stage.changed#InProgress",
            "data": {"order": {"id": "ord_9", "status": {"stage": "InProgress"}}}
        });

        let event = parse(Provider::Prodigi, payload).unwrap();
        assert_eq!(event.external_event_id.as_deref(), Some("evt-55"));
        assert_eq!(event.mapped_status, Some(FulfillmentStatus::Processing));
    }

    #[test]
    fn shapeways_webhook_with_tracking() {
        let payload = serde_json::json!({
            "id": 808,
            "event": "order.shipped",
            "order_id": 5150,
            "status": "shipped",
            "tracking": {"carrier": "UPS", "number": "1Z-1", "url": "https://ups.com/1Z-1"}
        });

        let event = parse(Provider::Shapeways, payload).unwrap();
        assert_eq!(event.external_event_id.as_deref(), Some("808"));
        assert_eq!(event.external_order_id, "5150");
        assert_eq!(event.mapped_status, Some(FulfillmentStatus::Shipped));
        assert_eq!(event.shipment.unwrap().tracking_url.as_deref(), Some("https://ups.com/1Z-1"));
    }

    #[test]
    fn unknown_status_still_yields_an_event() {
        let payload = serde_json::json!({"Id": "evt-1", "OrderId": "G-1", "Status": "Archived"});
        let event = parse(Provider::Gooten, payload).unwrap();
        assert!(event.mapped_status.is_none());
        assert_eq!(event.event_type, "Archived");
    }

    #[test]
    fn missing_order_id_is_rejected() {
        let payload = serde_json::json!({"type": "order_updated", "data": {}});
        let err = parse(Provider::Printful, payload).unwrap_err();
        assert!(matches!(err, ProviderError::UnexpectedResponse { .. }));
    }
}
