//! Prodigi print API v4 client.

use async_trait::async_trait;
use domain::{FulfillmentStatus, Provider};

use crate::client::{
    OrderSubmission, ProviderClient, ProviderOrder, REQUEST_TIMEOUT, error_for_status, extract_id,
    transport,
};
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.prodigi.com/v4.0";

/// Maps Prodigi order stages to the canonical vocabulary.
pub(crate) fn map_status(stage: &str) -> Option<FulfillmentStatus> {
    match stage {
        "InProgress" => Some(FulfillmentStatus::Processing),
        "Complete" => Some(FulfillmentStatus::Shipped),
        "Cancelled" => Some(FulfillmentStatus::Cancelled),
        _ => None,
    }
}

pub struct ProdigiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ProdigiClient {
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
impl ProviderClient for ProdigiClient {
    fn provider(&self) -> Provider {
        Provider::Prodigi
    }

    async fn submit_order(&self, submission: &OrderSubmission) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "merchantReference": submission.reference,
            "shippingMethod": "Standard",
            "recipient": {
                "name": submission.recipient.name,
                "address": {
                    "line1": submission.recipient.address1,
                    "line2": submission.recipient.address2,
                    "townOrCity": submission.recipient.city,
                    "stateOrCounty": submission.recipient.state_code,
                    "countryCode": submission.recipient.country_code,
                    "postalOrZipCode": submission.recipient.zip,
                },
            },
            "items": submission.items.iter().map(|item| serde_json::json!({
                "sku": item.sku,
                "copies": item.quantity,
                "sizing": "fillPrintArea",
            })).collect::<Vec<_>>(),
        });

        let response = self
            .http
            .post(format!("{}/Orders", self.base_url))
            .header("X-API-Key", &self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(transport(Provider::Prodigi))?;
        let response = error_for_status(Provider::Prodigi, response).await?;

        let body: serde_json::Value =
            response.json().await.map_err(transport(Provider::Prodigi))?;
        extract_id(Provider::Prodigi, &body, "/order/id")
    }

    async fn cancel_order(&self, external_id: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(format!(
                "{}/Orders/{external_id}/actions/cancel",
                self.base_url
            ))
            .header("X-API-Key", &self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(transport(Provider::Prodigi))?;
        error_for_status(Provider::Prodigi, response).await?;
        Ok(())
    }

    async fn get_order(&self, external_id: &str) -> Result<ProviderOrder, ProviderError> {
        let response = self
            .http
            .get(format!("{}/Orders/{external_id}", self.base_url))
            .header("X-API-Key", &self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(transport(Provider::Prodigi))?;
        let response = error_for_status(Provider::Prodigi, response).await?;

        let body: serde_json::Value =
            response.json().await.map_err(transport(Provider::Prodigi))?;
        let order = &body["order"];
        let tracking = &order["shipments"][0]["tracking"];

        Ok(ProviderOrder {
            status: order["status"]["stage"].as_str().and_then(map_status),
            tracking_number: tracking["number"].as_str().map(String::from),
            tracking_url: tracking["url"].as_str().map(String::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(map_status("InProgress"), Some(FulfillmentStatus::Processing));
        assert_eq!(map_status("Complete"), Some(FulfillmentStatus::Shipped));
        assert_eq!(map_status("Cancelled"), Some(FulfillmentStatus::Cancelled));
        assert_eq!(map_status("Draft"), None);
        assert_eq!(map_status("OnHold"), None);
    }
}
