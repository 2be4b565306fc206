//! Order-scoped fulfillment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{Money, OrderId, UserId};
use domain::{FulfillmentRequest, Provider};
use orchestration::{
    CancellationOrchestrator, MessageSink, RetryOrchestrator, SubmissionService, WebhookRouter,
};
use providers::Recipient;
use serde::{Deserialize, Serialize};
use store::{FulfillmentStore, NewFulfillmentRequest, NewRequestItem, OrderRepository};
use uuid::Uuid;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: FulfillmentStore + Clone, O: OrderRepository + Clone> {
    pub store: S,
    pub orders: O,
    pub router: WebhookRouter<S, O>,
    pub submission: SubmissionService<S>,
    pub cancellation: CancellationOrchestrator<S, O>,
    pub retry: RetryOrchestrator<S, Arc<dyn MessageSink>>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateFulfillmentRequest {
    pub provider: String,
    #[serde(default)]
    pub items: Vec<FulfillmentItemRequest>,
    pub cost_estimate_cents: Option<i64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// When present, the request is submitted to the vendor immediately
    /// after creation.
    pub recipient: Option<Recipient>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Deserialize)]
pub struct FulfillmentItemRequest {
    pub order_item_id: Uuid,
    pub sku: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub user_id: Uuid,
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct FulfillmentResponse {
    pub id: String,
    pub order_id: String,
    pub provider: String,
    pub status: String,
    pub external_id: Option<String>,
    pub cost_estimate_cents: Option<i64>,
    pub cost_actual_cents: Option<i64>,
    pub currency: String,
    pub error_message: Option<String>,
    pub items: Vec<FulfillmentItemResponse>,
    pub submitted_at: Option<String>,
    pub completed_at: Option<String>,
}

#[derive(Serialize)]
pub struct FulfillmentItemResponse {
    pub order_item_id: String,
    pub sku: String,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct CancelOrderResponse {
    pub success: bool,
    pub cancelled: Vec<String>,
    pub failed: Vec<FailedCancellationResponse>,
    pub refund_total_cents: i64,
    pub message: String,
}

#[derive(Serialize)]
pub struct FailedCancellationResponse {
    pub request_id: String,
    pub reason: String,
}

impl From<FulfillmentRequest> for FulfillmentResponse {
    fn from(request: FulfillmentRequest) -> Self {
        Self {
            id: request.id.to_string(),
            order_id: request.order_id.to_string(),
            provider: request.provider.to_string(),
            status: request.status.to_string(),
            external_id: request.external_id,
            cost_estimate_cents: request.cost_estimate.map(|m| m.cents()),
            cost_actual_cents: request.cost_actual.map(|m| m.cents()),
            currency: request.currency,
            error_message: request.error_message,
            items: request
                .items
                .into_iter()
                .map(|item| FulfillmentItemResponse {
                    order_item_id: item.order_item_id.to_string(),
                    sku: item.sku,
                    quantity: item.quantity,
                })
                .collect(),
            submitted_at: request.submitted_at.map(|t| t.to_rfc3339()),
            completed_at: request.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

// -- Handlers --

/// POST /orders/:id/fulfillments — create a fulfillment request for an
/// order, optionally submitting it to the vendor straight away.
#[tracing::instrument(skip(state, req))]
pub async fn create_fulfillment<S, O>(
    State(state): State<Arc<AppState<S, O>>>,
    Path(id): Path<String>,
    Json(req): Json<CreateFulfillmentRequest>,
) -> Result<(axum::http::StatusCode, Json<FulfillmentResponse>), ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    O: OrderRepository + Clone + 'static,
{
    let order_id = parse_order_id(&id)?;
    let provider: Provider = req
        .provider
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown provider: {}", req.provider)))?;

    let order = state
        .orders
        .find(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    let request = state
        .store
        .create_request(NewFulfillmentRequest {
            store_id: order.store_id,
            order_id,
            provider,
            provider_mapping_id: None,
            items: req
                .items
                .iter()
                .map(|item| NewRequestItem {
                    order_item_id: item.order_item_id,
                    sku: item.sku.clone(),
                    quantity: item.quantity,
                })
                .collect(),
            cost_estimate: req.cost_estimate_cents.map(Money::from_cents),
            currency: req.currency,
        })
        .await?;

    if let Some(recipient) = req.recipient {
        state.submission.submit(request.id, recipient).await?;
    }

    let request = state
        .store
        .find_by_id(request.id)
        .await?
        .ok_or_else(|| ApiError::Internal("request vanished after creation".to_string()))?;

    Ok((axum::http::StatusCode::CREATED, Json(request.into())))
}

/// GET /orders/:id/fulfillments — list an order's fulfillment requests.
#[tracing::instrument(skip(state))]
pub async fn list_fulfillments<S, O>(
    State(state): State<Arc<AppState<S, O>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<FulfillmentResponse>>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    O: OrderRepository + Clone + 'static,
{
    let order_id = parse_order_id(&id)?;
    let requests = state.store.find_by_order(order_id).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// POST /orders/:id/cancel — cancel every cancellable fulfillment request
/// on the order. Partial failure returns 200 with the detail, not an error.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S, O>(
    State(state): State<Arc<AppState<S, O>>>,
    Path(id): Path<String>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<CancelOrderResponse>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    O: OrderRepository + Clone + 'static,
{
    let order_id = parse_order_id(&id)?;
    let user_id = UserId::from_uuid(req.user_id);

    let outcome = state
        .cancellation
        .cancel_order(order_id, user_id, req.reason.as_deref())
        .await?;

    Ok(Json(CancelOrderResponse {
        success: outcome.success,
        cancelled: outcome.cancelled.iter().map(ToString::to_string).collect(),
        failed: outcome
            .failed
            .into_iter()
            .map(|f| FailedCancellationResponse {
                request_id: f.request_id.to_string(),
                reason: f.reason,
            })
            .collect(),
        refund_total_cents: outcome.refund_total.cents(),
        message: outcome.message,
    }))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
