//! Gooten source API client.
//!
//! Gooten authenticates with a recipe id passed as a query parameter and
//! does not deliver dependable webhooks, so its orders are reconciled by
//! polling `get_order`.

use async_trait::async_trait;
use domain::{FulfillmentStatus, Provider};

use crate::client::{
    OrderSubmission, ProviderClient, ProviderOrder, REQUEST_TIMEOUT, error_for_status, extract_id,
    transport,
};
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.print.io/api";

/// Maps Gooten order statuses to the canonical vocabulary.
pub(crate) fn map_status(status: &str) -> Option<FulfillmentStatus> {
    match status {
        "InProduction" => Some(FulfillmentStatus::Processing),
        "Shipped" => Some(FulfillmentStatus::Shipped),
        "Delivered" => Some(FulfillmentStatus::Delivered),
        "Cancelled" => Some(FulfillmentStatus::Cancelled),
        _ => None,
    }
}

pub struct GootenClient {
    http: reqwest::Client,
    base_url: String,
    recipe_id: String,
}

impl GootenClient {
    pub fn new(recipe_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            recipe_id: recipe_id.into(),
        }
    }

    /// Points the client at a different host (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ProviderClient for GootenClient {
    fn provider(&self) -> Provider {
        Provider::Gooten
    }

    async fn submit_order(&self, submission: &OrderSubmission) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "SourceId": submission.reference,
            "ShipToAddress": {
                "FirstName": submission.recipient.name,
                "Line1": submission.recipient.address1,
                "Line2": submission.recipient.address2,
                "City": submission.recipient.city,
                "State": submission.recipient.state_code,
                "CountryCode": submission.recipient.country_code,
                "PostalCode": submission.recipient.zip,
            },
            "Items": submission.items.iter().map(|item| serde_json::json!({
                "SKU": item.sku,
                "Quantity": item.quantity,
            })).collect::<Vec<_>>(),
        });

        let response = self
            .http
            .post(format!("{}/v/5/source/api/orders/", self.base_url))
            .query(&[("recipeid", &self.recipe_id)])
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(transport(Provider::Gooten))?;
        let response = error_for_status(Provider::Gooten, response).await?;

        let body: serde_json::Value =
            response.json().await.map_err(transport(Provider::Gooten))?;
        extract_id(Provider::Gooten, &body, "/Id")
    }

    async fn cancel_order(&self, external_id: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(format!(
                "{}/v/5/source/api/orders/{external_id}/cancel",
                self.base_url
            ))
            .query(&[("recipeid", &self.recipe_id)])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(transport(Provider::Gooten))?;
        error_for_status(Provider::Gooten, response).await?;
        Ok(())
    }

    async fn get_order(&self, external_id: &str) -> Result<ProviderOrder, ProviderError> {
        let response = self
            .http
            .get(format!(
                "{}/v/5/source/api/orders/{external_id}",
                self.base_url
            ))
            .query(&[("recipeid", &self.recipe_id)])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(transport(Provider::Gooten))?;
        let response = error_for_status(Provider::Gooten, response).await?;

        let body: serde_json::Value =
            response.json().await.map_err(transport(Provider::Gooten))?;

        Ok(ProviderOrder {
            status: body["Status"].as_str().and_then(map_status),
            tracking_number: body["Items"][0]["TrackingNumber"].as_str().map(String::from),
            tracking_url: body["Items"][0]["TrackingUrl"].as_str().map(String::from),
        })
    }
}
