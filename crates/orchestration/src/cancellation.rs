//! Order-level cancellation with per-request failure isolation.

use std::sync::Arc;

use common::{Money, OrderId, RequestId, UserId};
use domain::{FulfillmentStatus, OrderStatus};
use providers::{ClientFactory, CredentialResolver};
use store::{FulfillmentStore, OrderRepository, StatusUpdate};

use crate::error::{OrchestrationError, Result};

/// One request that could not be cancelled, with the reason.
#[derive(Debug, Clone)]
pub struct FailedCancellation {
    pub request_id: RequestId,
    pub reason: String,
}

/// The result of an order cancellation attempt.
///
/// Partial failure is a first-class outcome, not an error: some
/// requests may cancel while others are past the point of no return or
/// hit a vendor failure. The caller renders `message` to the customer
/// and uses `refund_total` to size the refund.
#[derive(Debug, Clone)]
pub struct CancellationOutcome {
    /// True only when every fulfillment request ended up cancelled.
    pub success: bool,
    pub cancelled: Vec<RequestId>,
    pub failed: Vec<FailedCancellation>,
    /// Sum of refundable amounts over the requests cancelled in this run.
    pub refund_total: Money,
    pub message: String,
}

/// Cancels an order's fulfillment requests against their vendors.
pub struct CancellationOrchestrator<S, O> {
    store: S,
    orders: O,
    resolver: Arc<dyn CredentialResolver>,
    clients: Arc<dyn ClientFactory>,
}

impl<S, O> CancellationOrchestrator<S, O>
where
    S: FulfillmentStore,
    O: OrderRepository,
{
    pub fn new(
        store: S,
        orders: O,
        resolver: Arc<dyn CredentialResolver>,
        clients: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            store,
            orders,
            resolver,
            clients,
        }
    }

    /// Attempts to cancel every cancellable request on the order.
    ///
    /// Preconditions (order exists, caller owns it, order status allows
    /// cancellation) are checked before any request is touched; a
    /// precondition failure is an error with zero side effects. Past the
    /// preconditions the operation never fails as a whole: each request
    /// is attempted independently and vendor failures land in `failed`.
    #[tracing::instrument(skip(self), fields(%order_id))]
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        user_id: UserId,
        reason: Option<&str>,
    ) -> Result<CancellationOutcome> {
        let order = self
            .orders
            .find(order_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound(format!("order {order_id}")))?;

        if order.user_id != user_id {
            return Err(OrchestrationError::Validation(
                "order does not belong to this user".to_string(),
            ));
        }
        if order.status.forbids_cancellation() {
            return Err(OrchestrationError::Validation(format!(
                "order in status {} cannot be cancelled",
                order.status
            )));
        }

        let requests = self.store.find_by_order(order_id).await?;

        let mut cancelled = Vec::new();
        let mut failed = Vec::new();
        let mut refund_total = Money::zero();

        for request in &requests {
            if !request.status.can_cancel() {
                failed.push(FailedCancellation {
                    request_id: request.id,
                    reason: format!("already {}", request.status),
                });
                continue;
            }

            // A request that never reached the vendor cancels locally.
            let external_id = match (&request.external_id, request.status) {
                (Some(external_id), status) if status != FulfillmentStatus::Pending => external_id,
                _ => {
                    self.store
                        .update_status(request.id, FulfillmentStatus::Cancelled, StatusUpdate::none())
                        .await?;
                    refund_total = refund_total.saturating_add(request.refundable_amount());
                    cancelled.push(request.id);
                    continue;
                }
            };

            let Some(credential) = self.resolver.resolve(request.provider, Some(request.store_id))
            else {
                let message = format!("no credential for {}", request.provider);
                self.store
                    .update_status(
                        request.id,
                        FulfillmentStatus::CancelRequested,
                        StatusUpdate::none().with_error(&message),
                    )
                    .await?;
                failed.push(FailedCancellation {
                    request_id: request.id,
                    reason: message,
                });
                continue;
            };

            let client = self.clients.client_for(request.provider, &credential);
            match client.cancel_order(external_id).await {
                Ok(()) => {
                    self.store
                        .update_status(request.id, FulfillmentStatus::Cancelled, StatusUpdate::none())
                        .await?;
                    refund_total = refund_total.saturating_add(request.refundable_amount());
                    cancelled.push(request.id);
                    metrics::counter!("fulfillment_cancellations_total").increment(1);
                }
                Err(err) => {
                    tracing::warn!(request_id = %request.id, provider = %request.provider, error = %err, "vendor cancellation failed");
                    // The intent is recorded; a later webhook or poll can
                    // still move this to cancelled.
                    self.store
                        .update_status(
                            request.id,
                            FulfillmentStatus::CancelRequested,
                            StatusUpdate::none().with_error(err.to_string()),
                        )
                        .await?;
                    failed.push(FailedCancellation {
                        request_id: request.id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        // The order flips to cancelled only when nothing remains in
        // flight, judged from the post-attempt state of the full set.
        let after = self.store.find_by_order(order_id).await?;
        let all_cancelled = after
            .iter()
            .all(|r| r.status == FulfillmentStatus::Cancelled);
        if all_cancelled {
            self.orders
                .update_status(order_id, OrderStatus::Cancelled)
                .await?;
        }

        let message = match (cancelled.len(), failed.len()) {
            (0, 0) => "Order has no fulfillment requests".to_string(),
            (n, 0) => format!("All {n} fulfillment requests cancelled"),
            (0, _) => "No fulfillment requests could be cancelled".to_string(),
            (n, m) => format!("{n} fulfillment requests cancelled, {m} could not be cancelled"),
        };

        if let Some(reason) = reason {
            tracing::info!(%order_id, reason, cancelled = cancelled.len(), failed = failed.len(), "cancellation completed");
        }

        Ok(CancellationOutcome {
            success: failed.is_empty(),
            cancelled,
            failed,
            refund_total,
            message,
        })
    }
}
