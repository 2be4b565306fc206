//! Shapeways 3D print API client.

use async_trait::async_trait;
use domain::{FulfillmentStatus, Provider};

use crate::client::{
    OrderSubmission, ProviderClient, ProviderOrder, REQUEST_TIMEOUT, error_for_status, extract_id,
    transport,
};
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.shapeways.com";

/// Maps Shapeways order statuses to the canonical vocabulary.
pub(crate) fn map_status(status: &str) -> Option<FulfillmentStatus> {
    match status {
        "received" => Some(FulfillmentStatus::Submitted),
        "in_production" => Some(FulfillmentStatus::Processing),
        "shipped" => Some(FulfillmentStatus::Shipped),
        "delivered" => Some(FulfillmentStatus::Delivered),
        "cancelled" => Some(FulfillmentStatus::Cancelled),
        _ => None,
    }
}

pub struct ShapewaysClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ShapewaysClient {
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
impl ProviderClient for ShapewaysClient {
    fn provider(&self) -> Provider {
        Provider::Shapeways
    }

    async fn submit_order(&self, submission: &OrderSubmission) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "externalId": submission.reference,
            "firstName": submission.recipient.name,
            "address1": submission.recipient.address1,
            "address2": submission.recipient.address2,
            "city": submission.recipient.city,
            "state": submission.recipient.state_code,
            "country": submission.recipient.country_code,
            "zipCode": submission.recipient.zip,
            "items": submission.items.iter().map(|item| serde_json::json!({
                "materialId": item.sku,
                "quantity": item.quantity,
            })).collect::<Vec<_>>(),
        });

        let response = self
            .http
            .post(format!("{}/orders/v1", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(transport(Provider::Shapeways))?;
        let response = error_for_status(Provider::Shapeways, response).await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(transport(Provider::Shapeways))?;
        extract_id(Provider::Shapeways, &body, "/orderId")
    }

    async fn cancel_order(&self, external_id: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .delete(format!("{}/orders/{external_id}/v1", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(transport(Provider::Shapeways))?;
        error_for_status(Provider::Shapeways, response).await?;
        Ok(())
    }

    async fn get_order(&self, external_id: &str) -> Result<ProviderOrder, ProviderError> {
        let response = self
            .http
            .get(format!("{}/orders/{external_id}/v1", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(transport(Provider::Shapeways))?;
        let response = error_for_status(Provider::Shapeways, response).await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(transport(Provider::Shapeways))?;

        Ok(ProviderOrder {
            status: body["status"].as_str().and_then(map_status),
            tracking_number: body["trackingNumber"].as_str().map(String::from),
            tracking_url: body["trackingUrl"].as_str().map(String::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(map_status("received"), Some(FulfillmentStatus::Submitted));
        assert_eq!(map_status("in_production"), Some(FulfillmentStatus::Processing));
        assert_eq!(map_status("shipped"), Some(FulfillmentStatus::Shipped));
        assert_eq!(map_status("delivered"), Some(FulfillmentStatus::Delivered));
        assert_eq!(map_status("cancelled"), Some(FulfillmentStatus::Cancelled));
        assert_eq!(map_status("refunded"), None);
    }
}
