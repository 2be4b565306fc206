//! Inbound provider webhook endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::Provider;
use serde::Serialize;
use store::{FulfillmentStore, OrderRepository};

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub duplicate: bool,
    pub request_found: bool,
}

/// POST /webhooks/:provider — ingest one raw vendor webhook.
///
/// Always returns 200 for a parseable event, including duplicates and
/// events for unknown orders; vendors retry on anything else and these
/// are not retryable conditions.
#[tracing::instrument(skip(state, payload))]
pub async fn receive<S, O>(
    State(state): State<Arc<AppState<S, O>>>,
    Path(provider): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<WebhookResponse>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    O: OrderRepository + Clone + 'static,
{
    let provider: Provider = provider
        .parse()
        .map_err(|_| ApiError::NotFound(format!("Unknown provider: {provider}")))?;

    let event = providers::webhook::parse(provider, payload)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = state.router.process_event(event).await?;

    Ok(Json(WebhookResponse {
        received: true,
        duplicate: outcome.duplicate,
        request_found: outcome.request_found,
    }))
}
