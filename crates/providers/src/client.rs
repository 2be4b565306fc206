//! The provider capability trait and its wire-neutral types.

use std::time::Duration;

use async_trait::async_trait;
use domain::{FulfillmentStatus, Provider};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Per-call HTTP timeout for every vendor request. A hung provider call
/// fails into the normal error path instead of blocking a worker.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The shipping recipient submitted with an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state_code: Option<String>,
    pub country_code: String,
    pub zip: String,
}

/// One line item in an order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionItem {
    pub sku: String,
    pub quantity: u32,
    pub name: String,
}

/// A provider-neutral order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSubmission {
    /// Our fulfillment request id, passed to the vendor as the merchant
    /// reference so their records link back to ours.
    pub reference: String,
    pub recipient: Recipient,
    pub items: Vec<SubmissionItem>,
}

/// The vendor's view of an order, mapped to canonical vocabulary.
#[derive(Debug, Clone, Default)]
pub struct ProviderOrder {
    /// The canonical status, or `None` when the vendor code is
    /// unrecognized ("no change", never an invented state).
    pub status: Option<FulfillmentStatus>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
}

/// Uniform capability set over every fulfillment vendor.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// The vendor this client talks to.
    fn provider(&self) -> Provider;

    /// Submits an order; returns the vendor's order id.
    async fn submit_order(&self, submission: &OrderSubmission) -> Result<String, ProviderError>;

    /// Cancels a submitted order. Fails with a provider error on non-2xx.
    async fn cancel_order(&self, external_id: &str) -> Result<(), ProviderError>;

    /// Fetches the vendor's current view of an order.
    async fn get_order(&self, external_id: &str) -> Result<ProviderOrder, ProviderError>;
}

/// Converts a non-2xx response into an API error, reading the body for
/// the vendor's message.
pub(crate) async fn error_for_status(
    provider: Provider,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    tracing::warn!(%provider, status = status.as_u16(), %message, "vendor API error");
    Err(ProviderError::Api {
        provider,
        status: status.as_u16(),
        message,
    })
}

pub(crate) fn transport(provider: Provider) -> impl FnOnce(reqwest::Error) -> ProviderError {
    move |source| ProviderError::Transport { provider, source }
}

/// Extracts a required string or integer id from a vendor response body.
pub(crate) fn extract_id(
    provider: Provider,
    body: &serde_json::Value,
    pointer: &str,
) -> Result<String, ProviderError> {
    let value = body.pointer(pointer);
    value
        .and_then(|v| {
            v.as_str()
                .map(String::from)
                .or_else(|| v.as_i64().map(|n| n.to_string()))
        })
        .ok_or_else(|| ProviderError::UnexpectedResponse {
            provider,
            message: format!("missing {pointer} in {body}"),
        })
}
