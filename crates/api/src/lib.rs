//! HTTP API server with observability for the fulfillment core.
//!
//! Exposes webhook ingestion, order-scoped fulfillment management,
//! cancellation, and retry endpoints, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use orchestration::{
    CancellationOrchestrator, InMemoryMessageSink, MessageSink, PollerConfig, PollingReconciler,
    RetryOrchestrator, SubmissionService, WebhookRouter,
};
use providers::{ClientFactory, CredentialResolver, HttpClientFactory, LayeredCredentialResolver};
use store::{FulfillmentStore, InMemoryFulfillmentStore, InMemoryOrderRepository, OrderRepository};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, O>(state: Arc<AppState<S, O>>, metrics_handle: PrometheusHandle) -> Router
where
    S: FulfillmentStore + Clone + 'static,
    O: OrderRepository + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/webhooks/{provider}", post(routes::webhooks::receive::<S, O>))
        .route(
            "/orders/{id}/fulfillments",
            post(routes::orders::create_fulfillment::<S, O>),
        )
        .route(
            "/orders/{id}/fulfillments",
            get(routes::orders::list_fulfillments::<S, O>),
        )
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S, O>))
        .route("/fulfillments/retry", post(routes::fulfillments::retry::<S, O>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the orchestrators over the given stores and vendor seams.
pub fn create_state<S, O>(
    store: S,
    orders: O,
    resolver: Arc<dyn CredentialResolver>,
    clients: Arc<dyn ClientFactory>,
    queue: Arc<dyn MessageSink>,
) -> Arc<AppState<S, O>>
where
    S: FulfillmentStore + Clone + 'static,
    O: OrderRepository + Clone + 'static,
{
    let router = WebhookRouter::new(store.clone(), orders.clone());
    let submission = SubmissionService::new(store.clone(), resolver.clone(), clients.clone());
    let cancellation =
        CancellationOrchestrator::new(store.clone(), orders.clone(), resolver, clients);
    let retry = RetryOrchestrator::new(store.clone(), queue);

    Arc::new(AppState {
        store,
        orders,
        router,
        submission,
        cancellation,
        retry,
    })
}

/// Default state for local runs: in-memory stores, env-resolved
/// credentials, real HTTP vendor clients, and one polling reconciler per
/// provider that lacks webhooks.
pub fn create_default_state(
    config: &Config,
) -> (
    Arc<AppState<InMemoryFulfillmentStore, InMemoryOrderRepository>>,
    Vec<PollingReconciler<InMemoryFulfillmentStore, InMemoryOrderRepository>>,
) {
    let store = InMemoryFulfillmentStore::new();
    let orders = InMemoryOrderRepository::new();
    let resolver: Arc<dyn CredentialResolver> = Arc::new(LayeredCredentialResolver::new());
    let clients: Arc<dyn ClientFactory> = Arc::new(HttpClientFactory::new());
    let queue: Arc<dyn MessageSink> = Arc::new(InMemoryMessageSink::new());

    let state = create_state(store.clone(), orders.clone(), resolver.clone(), clients.clone(), queue);

    let reconcilers = domain::Provider::ALL
        .into_iter()
        .filter(|provider| provider.requires_polling())
        .map(|provider| {
            PollingReconciler::new(
                store.clone(),
                WebhookRouter::new(store.clone(), orders.clone()),
                resolver.clone(),
                clients.clone(),
                PollerConfig {
                    provider,
                    max_calls_per_run: config.poll_max_calls,
                    call_delay: config.poll_call_delay,
                },
            )
        })
        .collect();

    (state, reconcilers)
}
