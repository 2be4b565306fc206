//! Cross-order fulfillment operations.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::Provider;
use serde::{Deserialize, Serialize};
use store::{FulfillmentStore, OrderRepository};

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Deserialize, Default)]
pub struct RetryRequest {
    /// Limit the sweep to one provider.
    pub provider: Option<String>,
}

#[derive(Serialize)]
pub struct RetryResponse {
    pub retried: Vec<String>,
    pub count: usize,
}

/// POST /fulfillments/retry — reset failed requests to pending and
/// re-enqueue them for submission.
#[tracing::instrument(skip(state, req))]
pub async fn retry<S, O>(
    State(state): State<Arc<AppState<S, O>>>,
    Json(req): Json<RetryRequest>,
) -> Result<Json<RetryResponse>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    O: OrderRepository + Clone + 'static,
{
    let provider = match req.provider {
        Some(ref name) => Some(
            name.parse::<Provider>()
                .map_err(|_| ApiError::BadRequest(format!("Unknown provider: {name}")))?,
        ),
        None => None,
    };

    let outcome = state.retry.retry_failed(provider).await?;

    Ok(Json(RetryResponse {
        count: outcome.count(),
        retried: outcome.retried.iter().map(ToString::to_string).collect(),
    }))
}
