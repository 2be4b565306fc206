//! End-to-end lifecycle: submission, webhook convergence, aggregation,
//! retry. Everything runs against the in-memory store and mock vendors.

use std::sync::Arc;

use common::{Money, OrderId, StoreId, UserId};
use domain::{FulfillmentStatus, InboundEvent, OrderRecord, OrderStatus, Provider};
use orchestration::{
    CancellationOrchestrator, InMemoryMessageSink, RetryOrchestrator, SubmissionService,
    WebhookRouter,
};
use providers::{Credential, LayeredCredentialResolver, MockClientFactory, Recipient};
use store::{
    FulfillmentStore, InMemoryFulfillmentStore, InMemoryOrderRepository, NewFulfillmentRequest,
    OrderRepository,
};

struct Platform {
    store: InMemoryFulfillmentStore,
    orders: InMemoryOrderRepository,
    factory: MockClientFactory,
    router: WebhookRouter<InMemoryFulfillmentStore, InMemoryOrderRepository>,
    submission: SubmissionService<InMemoryFulfillmentStore>,
}

fn platform() -> Platform {
    let store = InMemoryFulfillmentStore::new();
    let orders = InMemoryOrderRepository::new();
    let factory = MockClientFactory::new();

    let mut resolver = LayeredCredentialResolver::new();
    for provider in Provider::ALL {
        resolver = resolver.with_global_credential(provider, Credential::new("test-key"));
    }
    let resolver: Arc<dyn providers::CredentialResolver> = Arc::new(resolver);
    let clients: Arc<dyn providers::ClientFactory> = Arc::new(factory.clone());

    let router = WebhookRouter::new(store.clone(), orders.clone());
    let submission = SubmissionService::new(store.clone(), resolver.clone(), clients.clone());

    Platform {
        store,
        orders,
        factory,
        router,
        submission,
    }
}

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

async fn seed_order(p: &Platform) -> OrderRecord {
    let order = OrderRecord::new(
        OrderId::new(),
        StoreId::new(),
        UserId::new(),
        OrderStatus::Paid,
    );
    p.orders.insert(order.clone()).await;
    order
}

fn webhook(
    provider: Provider,
    event_id: &str,
    external_order_id: &str,
    status: FulfillmentStatus,
) -> InboundEvent {
    InboundEvent {
        provider,
        external_event_id: Some(event_id.to_string()),
        external_order_id: external_order_id.to_string(),
        event_type: "order_updated".to_string(),
        payload: serde_json::json!({"status": status.as_str()}),
        mapped_status: Some(status),
        shipment: None,
    }
}

#[tokio::test]
async fn full_lifecycle_pending_to_delivered() {
    let p = platform();
    let order = seed_order(&p).await;

    let request = p
        .store
        .create_request(NewFulfillmentRequest {
            store_id: order.store_id,
            order_id: order.id,
            provider: Provider::Printful,
            provider_mapping_id: None,
            items: vec![],
            cost_estimate: Some(Money::from_cents(1500)),
            currency: "USD".to_string(),
        })
        .await
        .unwrap();

    p.submission.submit(request.id, recipient()).await.unwrap();
    let submitted = p.store.find_by_id(request.id).await.unwrap().unwrap();
    let external_id = submitted.external_id.clone().unwrap();
    assert_eq!(submitted.status, FulfillmentStatus::Submitted);

    // Vendor webhooks walk the request to delivery.
    for (event_id, status) in [
        ("evt-1", FulfillmentStatus::Processing),
        ("evt-2", FulfillmentStatus::Shipped),
        ("evt-3", FulfillmentStatus::Delivered),
    ] {
        let outcome = p
            .router
            .process_event(webhook(Provider::Printful, event_id, &external_id, status))
            .await
            .unwrap();
        assert_eq!(outcome.status_applied, Some(status));
    }

    let finished = p.store.find_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(finished.status, FulfillmentStatus::Delivered);
    assert!(finished.completed_at.is_some());

    let order = p.orders.find(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn failed_submission_recovers_through_retry() {
    let p = platform();
    let order = seed_order(&p).await;

    let request = p
        .store
        .create_request(NewFulfillmentRequest {
            store_id: order.store_id,
            order_id: order.id,
            provider: Provider::Gooten,
            provider_mapping_id: None,
            items: vec![],
            cost_estimate: None,
            currency: "USD".to_string(),
        })
        .await
        .unwrap();

    p.factory.client(Provider::Gooten).set_fail_on_submit(true);
    assert!(p.submission.submit(request.id, recipient()).await.is_err());

    let failed = p.store.find_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(failed.status, FulfillmentStatus::Failed);
    assert!(failed.error_message.is_some());

    // The retry sweep resets the request and enqueues it.
    let sink = InMemoryMessageSink::new();
    let retry = RetryOrchestrator::new(p.store.clone(), sink.clone());
    let outcome = retry.retry_failed(Some(Provider::Gooten)).await.unwrap();
    assert_eq!(outcome.retried, vec![request.id]);
    assert_eq!(sink.len().await, 1);

    let reset = p.store.find_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(reset.status, FulfillmentStatus::Pending);
    assert!(reset.error_message.is_none());

    // With the vendor healthy again the resubmission goes through.
    p.factory.client(Provider::Gooten).set_fail_on_submit(false);
    p.submission.submit(request.id, recipient()).await.unwrap();
    let submitted = p.store.find_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(submitted.status, FulfillmentStatus::Submitted);
}

#[tokio::test]
async fn cancellation_after_submission_cancels_at_the_vendor() {
    let p = platform();
    let order = seed_order(&p).await;

    let request = p
        .store
        .create_request(NewFulfillmentRequest {
            store_id: order.store_id,
            order_id: order.id,
            provider: Provider::Prodigi,
            provider_mapping_id: None,
            items: vec![],
            cost_estimate: Some(Money::from_cents(2000)),
            currency: "USD".to_string(),
        })
        .await
        .unwrap();
    p.submission.submit(request.id, recipient()).await.unwrap();
    let external_id = p
        .store
        .find_by_id(request.id)
        .await
        .unwrap()
        .unwrap()
        .external_id
        .unwrap();

    let mut resolver = LayeredCredentialResolver::new();
    for provider in Provider::ALL {
        resolver = resolver.with_global_credential(provider, Credential::new("test-key"));
    }
    let cancellation = CancellationOrchestrator::new(
        p.store.clone(),
        p.orders.clone(),
        Arc::new(resolver),
        Arc::new(p.factory.clone()),
    );

    let outcome = cancellation
        .cancel_order(order.id, order.user_id, Some("customer request"))
        .await
        .unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.refund_total, Money::from_cents(2000));
    assert_eq!(
        p.factory.client(Provider::Prodigi).cancelled_ids(),
        vec![external_id]
    );

    let order = p.orders.find(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
}
