//! Batch retry of failed fulfillment requests.

use common::RequestId;
use domain::{FulfillmentStatus, Provider};
use store::{FulfillmentStore, StatusUpdate};

use crate::error::Result;
use crate::queue::{MessageSink, RetryMessage};

/// What a retry run did.
#[derive(Debug, Clone, Default)]
pub struct RetryOutcome {
    /// Requests reset to `pending` and re-enqueued, in store order.
    pub retried: Vec<RequestId>,
}

impl RetryOutcome {
    pub fn count(&self) -> usize {
        self.retried.len()
    }
}

/// Resets failed requests to `pending` and hands each one back to the
/// submission workers through the queue.
pub struct RetryOrchestrator<S, Q> {
    store: S,
    queue: Q,
}

impl<S, Q> RetryOrchestrator<S, Q>
where
    S: FulfillmentStore,
    Q: MessageSink,
{
    pub fn new(store: S, queue: Q) -> Self {
        Self { store, queue }
    }

    /// Retries every `failed` request, optionally scoped to one provider.
    ///
    /// Each request is reset with its error message cleared, then gets
    /// exactly one queue message. The reset is written before the
    /// enqueue, so a crash between the two leaves a `pending` request a
    /// later sweep can pick up rather than a `failed` one that was
    /// already dispatched.
    #[tracing::instrument(skip(self))]
    pub async fn retry_failed(&self, provider: Option<Provider>) -> Result<RetryOutcome> {
        let failed = self
            .store
            .list_by_status(FulfillmentStatus::Failed, provider)
            .await?;

        let mut outcome = RetryOutcome::default();
        for request in failed {
            self.store
                .update_status(
                    request.id,
                    FulfillmentStatus::Pending,
                    StatusUpdate::none().clearing_error(),
                )
                .await?;

            let message = serde_json::to_value(RetryMessage::for_request(&request))?;
            self.queue.send(message).await?;

            metrics::counter!("fulfillment_retries_total").increment(1);
            tracing::info!(request_id = %request.id, provider = %request.provider, "failed request re-queued");
            outcome.retried.push(request.id);
        }

        Ok(outcome)
    }
}
