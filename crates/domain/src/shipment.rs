//! Shipment records.

use chrono::{DateTime, Utc};
use common::{OrderId, RequestId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A carrier shipment created when a fulfillment request ships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub request_id: RequestId,
    pub order_id: OrderId,
    pub carrier: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
    pub status: String,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    /// Raw carrier payload for audit/debugging.
    pub raw: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
