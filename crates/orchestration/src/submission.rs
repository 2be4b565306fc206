//! Submits pending fulfillment requests to their vendors.

use std::sync::Arc;

use chrono::Utc;
use common::RequestId;
use domain::FulfillmentStatus;
use providers::{ClientFactory, CredentialResolver, OrderSubmission, ProviderError, Recipient, SubmissionItem};
use store::{FulfillmentStore, StatusUpdate};

use crate::error::{OrchestrationError, Result};

/// Pushes a pending request to its vendor and records the outcome.
pub struct SubmissionService<S> {
    store: S,
    resolver: Arc<dyn CredentialResolver>,
    clients: Arc<dyn ClientFactory>,
}

impl<S> SubmissionService<S>
where
    S: FulfillmentStore,
{
    pub fn new(
        store: S,
        resolver: Arc<dyn CredentialResolver>,
        clients: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            store,
            resolver,
            clients,
        }
    }

    /// Submits one pending request to its vendor.
    ///
    /// Success moves the request to `submitted` with the vendor's order
    /// id and a submission timestamp. Any failure moves it to `failed`
    /// with the error recorded, where the retry sweep can pick it up.
    #[tracing::instrument(skip(self, recipient), fields(%request_id))]
    pub async fn submit(&self, request_id: RequestId, recipient: Recipient) -> Result<()> {
        let request = self
            .store
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("request {request_id}")))?;

        if request.status != FulfillmentStatus::Pending {
            return Err(OrchestrationError::Validation(format!(
                "request in status {} cannot be submitted",
                request.status
            )));
        }

        let Some(credential) = self
            .resolver
            .resolve(request.provider, Some(request.store_id))
        else {
            let err = ProviderError::MissingCredential(request.provider);
            self.store
                .update_status(
                    request_id,
                    FulfillmentStatus::Failed,
                    StatusUpdate::none().with_error(err.to_string()),
                )
                .await?;
            return Err(err.into());
        };

        let submission = OrderSubmission {
            reference: request.id.to_string(),
            recipient,
            items: request
                .items
                .iter()
                .map(|item| SubmissionItem {
                    sku: item.sku.clone(),
                    quantity: item.quantity,
                    name: item.sku.clone(),
                })
                .collect(),
        };

        let client = self.clients.client_for(request.provider, &credential);
        match client.submit_order(&submission).await {
            Ok(external_id) => {
                self.store
                    .update_status(
                        request_id,
                        FulfillmentStatus::Submitted,
                        StatusUpdate::none()
                            .with_external_id(external_id.clone())
                            .with_submitted_at(Utc::now()),
                    )
                    .await?;
                metrics::counter!("fulfillment_submissions_total").increment(1);
                tracing::info!(provider = %request.provider, %external_id, "order submitted");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(provider = %request.provider, error = %err, "submission failed");
                self.store
                    .update_status(
                        request_id,
                        FulfillmentStatus::Failed,
                        StatusUpdate::none().with_error(err.to_string()),
                    )
                    .await?;
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use common::{OrderId, StoreId};
    use domain::Provider;
    use providers::{Credential, LayeredCredentialResolver, MockClientFactory};
    use store::{InMemoryFulfillmentStore, NewFulfillmentRequest, NewRequestItem};
    use uuid::Uuid;

    use super::*;

    fn recipient() -> Recipient {
        Recipient {
            name: "Test Customer".to_string(),
            address1: "1 Main St".to_string(),
            address2: None,
            city: "Springfield".to_string(),
            state_code: Some("IL".to_string()),
            country_code: "US".to_string(),
            zip: "62704".to_string(),
        }
    }

    async fn pending_request(store: &InMemoryFulfillmentStore, provider: Provider) -> RequestId {
        store
            .create_request(NewFulfillmentRequest {
                store_id: StoreId::new(),
                order_id: OrderId::new(),
                provider,
                provider_mapping_id: None,
                items: vec![NewRequestItem {
                    order_item_id: Uuid::new_v4(),
                    sku: "TEE-M-BLK".to_string(),
                    quantity: 2,
                }],
                cost_estimate: None,
                currency: "USD".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    fn service(
        store: InMemoryFulfillmentStore,
        factory: MockClientFactory,
    ) -> SubmissionService<InMemoryFulfillmentStore> {
        let mut resolver = LayeredCredentialResolver::new();
        for provider in Provider::ALL {
            resolver = resolver.with_global_credential(provider, Credential::new("test-key"));
        }
        SubmissionService::new(store, Arc::new(resolver), Arc::new(factory))
    }

    #[tokio::test]
    async fn successful_submission_assigns_external_id() {
        let store = InMemoryFulfillmentStore::new();
        let factory = MockClientFactory::new();
        let request_id = pending_request(&store, Provider::Printful).await;

        let service = service(store.clone(), factory.clone());
        service.submit(request_id, recipient()).await.unwrap();

        let request = store.find_by_id(request_id).await.unwrap().unwrap();
        assert_eq!(request.status, FulfillmentStatus::Submitted);
        assert_eq!(request.external_id.as_deref(), Some("printful-0001"));
        assert!(request.submitted_at.is_some());
        assert_eq!(factory.client(Provider::Printful).submitted_count(), 1);
    }

    #[tokio::test]
    async fn vendor_rejection_fails_the_request() {
        let store = InMemoryFulfillmentStore::new();
        let factory = MockClientFactory::new();
        let request_id = pending_request(&store, Provider::Prodigi).await;
        factory.client(Provider::Prodigi).set_fail_on_submit(true);

        let service = service(store.clone(), factory);
        let result = service.submit(request_id, recipient()).await;
        assert!(matches!(result, Err(OrchestrationError::Provider(_))));

        let request = store.find_by_id(request_id).await.unwrap().unwrap();
        assert_eq!(request.status, FulfillmentStatus::Failed);
        assert!(request.error_message.is_some());
        assert!(request.external_id.is_none());
    }

    #[tokio::test]
    async fn missing_credential_fails_the_request() {
        let store = InMemoryFulfillmentStore::new();
        let factory = MockClientFactory::new();
        let request_id = pending_request(&store, Provider::Shapeways).await;

        let service = SubmissionService::new(
            store.clone(),
            Arc::new(LayeredCredentialResolver::new()),
            Arc::new(factory.clone()),
        );
        let result = service.submit(request_id, recipient()).await;
        assert!(matches!(result, Err(OrchestrationError::Provider(_))));

        let request = store.find_by_id(request_id).await.unwrap().unwrap();
        assert_eq!(request.status, FulfillmentStatus::Failed);
        assert_eq!(factory.client(Provider::Shapeways).submitted_count(), 0);
    }

    #[tokio::test]
    async fn non_pending_request_is_rejected() {
        let store = InMemoryFulfillmentStore::new();
        let factory = MockClientFactory::new();
        let request_id = pending_request(&store, Provider::Printful).await;

        let service = service(store.clone(), factory);
        service.submit(request_id, recipient()).await.unwrap();

        // A second submit against the now-submitted request.
        let result = service.submit(request_id, recipient()).await;
        assert!(matches!(result, Err(OrchestrationError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let store = InMemoryFulfillmentStore::new();
        let service = service(store, MockClientFactory::new());
        let result = service.submit(RequestId::new(), recipient()).await;
        assert!(matches!(result, Err(OrchestrationError::NotFound(_))));
    }
}
