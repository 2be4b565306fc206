//! The single entry point for inbound provider events.

use domain::{FulfillmentStatus, InboundEvent};
use store::{FulfillmentStore, NewProviderEvent, NewShipment, OrderRepository, StatusUpdate};

use crate::aggregator::OrderAggregator;
use crate::error::Result;

/// What processing an inbound event did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutcome {
    /// The event was already recorded; nothing was done.
    pub duplicate: bool,
    /// A fulfillment request matched the event's external order id.
    pub request_found: bool,
    /// The status transition that was applied, if any.
    pub status_applied: Option<FulfillmentStatus>,
    /// A shipment row was recorded.
    pub shipment_recorded: bool,
}

/// Routes inbound provider events into status transitions, shipment
/// records, and order aggregation.
///
/// Used identically for real webhooks and synthesized poll events. The
/// dedup insert in step one makes the whole pipeline safe to call from
/// both ingestion paths concurrently without locks: side effects happen
/// at most once per `(provider, external event id)`.
#[derive(Clone)]
pub struct WebhookRouter<S, O> {
    store: S,
    aggregator: OrderAggregator<S, O>,
}

impl<S, O> WebhookRouter<S, O>
where
    S: FulfillmentStore + Clone,
    O: OrderRepository,
{
    pub fn new(store: S, orders: O) -> Self {
        let aggregator = OrderAggregator::new(store.clone(), orders);
        Self { store, aggregator }
    }

    /// Processes one inbound event.
    ///
    /// Never fails on a duplicate event or an event for an unknown
    /// order; both are expected steady-state conditions.
    #[tracing::instrument(
        skip(self, event),
        fields(
            provider = %event.provider,
            external_order_id = %event.external_order_id,
            event_type = %event.event_type,
        )
    )]
    pub async fn process_event(&self, event: InboundEvent) -> Result<ProcessOutcome> {
        metrics::counter!("provider_events_received_total").increment(1);

        // 1. Record the event; a dedup conflict means another delivery
        //    of the same event already ran (or is running) this pipeline.
        let recorded = self
            .store
            .insert_provider_event(NewProviderEvent {
                provider: event.provider,
                external_event_id: event.external_event_id.clone(),
                external_order_id: event.external_order_id.clone(),
                event_type: event.event_type.clone(),
                payload: event.payload.clone(),
            })
            .await?;

        let Some(recorded) = recorded else {
            metrics::counter!("provider_events_duplicate_total").increment(1);
            tracing::debug!("duplicate event, skipping");
            return Ok(ProcessOutcome {
                duplicate: true,
                ..Default::default()
            });
        };

        // 2. Match the event to a request. An unmatched event is not an
        //    error; delivery can outrun local request creation.
        let request = self
            .store
            .find_by_external_id(event.provider, &event.external_order_id)
            .await?;

        let Some(request) = request else {
            tracing::info!("event does not match any fulfillment request");
            self.store.mark_event_processed(recorded.id).await?;
            return Ok(ProcessOutcome::default());
        };

        let mut outcome = ProcessOutcome {
            request_found: true,
            ..Default::default()
        };

        // 3. Apply the mapped status transition, if the table allows it.
        if let Some(target) = event.mapped_status
            && target != request.status
        {
            if request.status.can_transition(target) {
                self.store
                    .update_status(request.id, target, StatusUpdate::none())
                    .await?;
                outcome.status_applied = Some(target);
                metrics::counter!("fulfillment_status_transitions_total").increment(1);
                tracing::info!(request_id = %request.id, from = %request.status, to = %target, "status applied");
            } else {
                tracing::warn!(
                    request_id = %request.id,
                    from = %request.status,
                    to = %target,
                    "rejected illegal status transition"
                );
            }
        }

        // 4. Record shipment data.
        if let Some(shipment) = event.shipment {
            self.store
                .insert_shipment(NewShipment {
                    request_id: request.id,
                    order_id: request.order_id,
                    carrier: shipment.carrier,
                    tracking_number: shipment.tracking_number,
                    tracking_url: shipment.tracking_url,
                    shipped_at: shipment.shipped_at,
                    raw: shipment.raw,
                })
                .await?;
            outcome.shipment_recorded = true;
        }

        // 5. Re-derive the order status on every event, not only on
        //    interesting transitions, so a previously mis-applied event
        //    self-heals here.
        self.aggregator.recompute(request.order_id).await?;

        // 6. Done.
        self.store.mark_event_processed(recorded.id).await?;
        metrics::counter!("provider_events_processed_total").increment(1);
        Ok(outcome)
    }
}
