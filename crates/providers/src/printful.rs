//! Printful REST API client (no SDK dependency).

use async_trait::async_trait;
use domain::{FulfillmentStatus, Provider};

use crate::client::{
    OrderSubmission, ProviderClient, ProviderOrder, REQUEST_TIMEOUT, error_for_status, extract_id,
    transport,
};
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.printful.com";

/// Maps Printful order statuses to the canonical vocabulary.
pub(crate) fn map_status(status: &str) -> Option<FulfillmentStatus> {
    match status {
        "draft" | "pending" => Some(FulfillmentStatus::Submitted),
        "inprocess" | "onhold" | "partial" => Some(FulfillmentStatus::Processing),
        "fulfilled" => Some(FulfillmentStatus::Shipped),
        "canceled" => Some(FulfillmentStatus::Cancelled),
        "failed" => Some(FulfillmentStatus::Failed),
        _ => None,
    }
}

pub struct PrintfulClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PrintfulClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Points the client at a different host (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ProviderClient for PrintfulClient {
    fn provider(&self) -> Provider {
        Provider::Printful
    }

    async fn submit_order(&self, submission: &OrderSubmission) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "external_id": submission.reference,
            "confirm": true,
            "recipient": {
                "name": submission.recipient.name,
                "address1": submission.recipient.address1,
                "address2": submission.recipient.address2,
                "city": submission.recipient.city,
                "state_code": submission.recipient.state_code,
                "country_code": submission.recipient.country_code,
                "zip": submission.recipient.zip,
            },
            "items": submission.items.iter().map(|item| serde_json::json!({
                "external_variant_id": item.sku,
                "quantity": item.quantity,
                "name": item.name,
            })).collect::<Vec<_>>(),
        });

        let response = self
            .http
            .post(format!("{}/orders", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(transport(Provider::Printful))?;
        let response = error_for_status(Provider::Printful, response).await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(transport(Provider::Printful))?;
        extract_id(Provider::Printful, &body, "/result/id")
    }

    async fn cancel_order(&self, external_id: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .delete(format!("{}/orders/{external_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(transport(Provider::Printful))?;
        error_for_status(Provider::Printful, response).await?;
        Ok(())
    }

    async fn get_order(&self, external_id: &str) -> Result<ProviderOrder, ProviderError> {
        let response = self
            .http
            .get(format!("{}/orders/{external_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(transport(Provider::Printful))?;
        let response = error_for_status(Provider::Printful, response).await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(transport(Provider::Printful))?;
        let result = &body["result"];

        Ok(ProviderOrder {
            status: result["status"].as_str().and_then(map_status),
            tracking_number: result["shipments"][0]["tracking_number"]
                .as_str()
                .map(String::from),
            tracking_url: result["shipments"][0]["tracking_url"]
                .as_str()
                .map(String::from),
        })
    }
}
